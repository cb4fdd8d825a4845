// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/adapter.rs
//
// Bridges the dispatcher to a line-delimited JSON-RPC pool connection. The
// connection itself is a bounded single retry loop (`retries` attempts,
// `retry_pause` seconds apart): reconnect/failover policy beyond that is
// out of scope, left to whatever process supervisor runs this binary.

use crate::config::PoolConfig;
use crate::core::algorithm::Algorithm;
use crate::core::job::{parse_pool_job, PoolJob, Solution};
use crate::dispatcher::Dispatcher;
use crate::error::{MinerError, Result};
use crate::job_source::JobSource;
use crate::pool::client::PoolClient;
use crate::pool::protocol::StratumProtocol;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// The `JobSource` half the dispatcher talks to. Only knows how to hand a
/// solution off to the connection task; it never touches the socket
/// itself, so it can be constructed before the connection exists.
pub struct StratumJobSource {
    outbound: mpsc::UnboundedSender<Solution>,
}

impl StratumJobSource {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Solution>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { outbound: tx }), rx)
    }
}

impl JobSource for StratumJobSource {
    fn submit_solution(&self, solution: Solution) {
        let _ = self.outbound.send(solution);
    }
}

/// Drives the pool connection to completion: bounded reconnect attempts,
/// then login, then a read/write loop until the socket closes or a
/// protocol error occurs. Returns once retries are exhausted or the
/// process should give up; the caller decides whether to restart it.
pub async fn run(
    pool: PoolConfig,
    default_algorithm: Algorithm,
    retries: u32,
    retry_pause_secs: u32,
    dispatcher: Arc<Dispatcher>,
    mut outbound_rx: mpsc::UnboundedReceiver<Solution>,
) -> Result<()> {
    let client = PoolClient::new();
    let mut attempt = 0u32;
    let stream = loop {
        attempt += 1;
        match client.connect(&pool.url).await {
            Ok(stream) => break stream,
            Err(e) if attempt < retries => {
                tracing::warn!(attempt, error = %e, "pool connect failed, retrying");
                sleep(Duration::from_secs(retry_pause_secs as u64)).await;
            }
            Err(e) => return Err(e),
        }
    };

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half).lines();

    let login = StratumProtocol::create_login_request(&pool.user, &pool.pass, &pool.algo);
    write_half
        .write_all(StratumProtocol::to_message(login).as_bytes())
        .await
        .map_err(|e| MinerError::Network(format!("login write failed: {e}")))?;

    let submit_id = AtomicU64::new(2);
    let default_algorithm_str = pool.algo.clone();

    loop {
        tokio::select! {
            line = reader.next_line() => {
                let line = line.map_err(|e| MinerError::Network(format!("read failed: {e}")))?;
                let Some(line) = line else {
                    return Err(MinerError::Network("pool closed connection".into()));
                };
                if line.trim().is_empty() {
                    continue;
                }
                handle_line(&line, &dispatcher, default_algorithm, &default_algorithm_str)?;
            }
            solution = outbound_rx.recv() => {
                let Some(solution) = solution else {
                    return Ok(());
                };
                let id = submit_id.fetch_add(1, Ordering::Relaxed);
                let request = StratumProtocol::create_submit_request(&pool.user, &solution, id);
                write_half
                    .write_all(StratumProtocol::to_message(request).as_bytes())
                    .await
                    .map_err(|e| MinerError::Network(format!("submit write failed: {e}")))?;
            }
        }
    }
}

fn handle_line(
    line: &str,
    dispatcher: &Arc<Dispatcher>,
    default_algorithm: Algorithm,
    _pool_algo: &str,
) -> Result<()> {
    let value: Value = serde_json::from_str(line).map_err(|e| MinerError::JobParse(format!("bad json-rpc line: {e}")))?;

    let pool_id = 0i64; // single-pool adapter, see REDESIGN note on multi-pool failover.
    if let Some(method) = value.get("method").and_then(Value::as_str) {
        if method == "job" {
            if let Some(params) = value.get("params") {
                dispatch_job(params, dispatcher, default_algorithm, pool_id)?;
            }
        }
        return Ok(());
    }

    if let Some(result) = value.get("result") {
        if let Some(job) = result.get("job") {
            dispatch_job(job, dispatcher, default_algorithm, pool_id)?;
        }
    }
    Ok(())
}

fn dispatch_job(raw: &Value, dispatcher: &Arc<Dispatcher>, default_algorithm: Algorithm, pool_id: i64) -> Result<()> {
    let pool_job: PoolJob = serde_json::from_value(raw.clone())
        .map_err(|e| MinerError::JobParse(format!("malformed job notification: {e}")))?;
    let job = parse_pool_job(&pool_job, default_algorithm, pool_id)?;
    dispatcher.set_job(job, false);
    Ok(())
}

// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/main.rs
//
// CLI entry point: parses arguments, builds a single-pool `Config` (or
// loads one from disk), starts the dispatcher and pool adapter, and
// serves the HTTP summary endpoint until interrupted.

use clap::Parser;
use rxcn_miner::config::{Config, CpuConfig, PoolConfig};
use rxcn_miner::core::algorithm::Algorithm;
use rxcn_miner::dispatcher::Dispatcher;
use rxcn_miner::pool::adapter::{self, StratumJobSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// CLI flags, grounded in the teacher's `core::types::Args` (same flag
/// names for wallet/pool/worker/threads) narrowed to the single
/// CryptoNight/RandomX CPU miner this crate builds.
#[derive(Parser, Debug)]
#[command(name = "rxcn-miner", version, about = "CryptoNight/RandomX CPU mining client")]
struct Args {
    /// Path to a JSON config file (see `config.rs`). Overrides the other
    /// pool-related flags when present.
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Mining pool address in format host:port.
    #[arg(short = 'o', long = "pool", value_name = "HOST:PORT")]
    pool: Option<String>,

    /// Wallet address (or login) for the pool.
    #[arg(short = 'u', long = "wallet", value_name = "ADDRESS")]
    wallet: Option<String>,

    /// Pool password, usually 'x' or a worker identifier.
    #[arg(short = 'p', long = "password", default_value = "x", value_name = "PASSWORD")]
    password: String,

    /// Algorithm name, e.g. "cryptonight/2", "cryptonight-lite", "randomx".
    #[arg(long, default_value = "cryptonight/2", value_name = "ALGO")]
    algo: String,

    /// Number of CPU mining threads. 0 = auto-detect.
    #[arg(short, long, default_value = "0", value_name = "COUNT")]
    threads: usize,

    /// Multiway batch size per worker thread (1..=5).
    #[arg(long = "ways", default_value = "1", value_name = "N")]
    ways_per_thread: usize,

    /// Request huge pages for the scratchpad allocation.
    #[arg(long, default_value = "false")]
    huge_pages: bool,

    /// Treat the pool's nonce as nicehash-reserved (high byte untouched).
    #[arg(long, default_value = "false")]
    nicehash: bool,

    /// HTTP introspection port (`GET /1/summary`, `GET /api.json`).
    #[arg(long, default_value = "8080", value_name = "PORT")]
    http_port: u16,

    /// Bounded reconnect attempts before the pool adapter gives up.
    #[arg(long, default_value = "5")]
    retries: u32,

    /// Seconds to wait between reconnect attempts.
    #[arg(long = "retry-pause", default_value = "5")]
    retry_pause: u32,
}

fn load_config(args: &Args) -> rxcn_miner::Result<Config> {
    if let Some(path) = &args.config {
        return Config::load(path);
    }

    let pool = args.pool.clone().ok_or_else(|| {
        rxcn_miner::MinerError::Config("--pool is required without --config".into())
    })?;
    let wallet = args.wallet.clone().ok_or_else(|| {
        rxcn_miner::MinerError::Config("--wallet is required without --config".into())
    })?;

    let config = Config {
        pools: vec![PoolConfig {
            url: pool,
            user: wallet,
            pass: args.password.clone(),
            nicehash: args.nicehash,
            enabled: true,
            keepalive: true,
            rig_id: None,
            algo: args.algo.clone(),
            variant: None,
        }],
        cpu: CpuConfig {
            enabled: true,
            huge_pages: args.huge_pages,
            max_threads_hint: if args.threads == 0 { None } else { Some(args.threads) },
        },
        retries: args.retries,
        retry_pause: args.retry_pause,
        donate_level: 0,
        http_port: args.http_port,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> rxcn_miner::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    let pool = config.primary_pool().clone();
    let algorithm = Algorithm::parse(&pool.algo)?;
    let threads = config.cpu.max_threads_hint.unwrap_or_else(num_cpus::get).max(1);
    let ways_per_thread = args.ways_per_thread.clamp(1, 5);

    info!(
        pool = %pool.url,
        algorithm = ?algorithm,
        threads,
        ways_per_thread,
        "starting rxcn-miner"
    );

    let (source, outbound_rx) = StratumJobSource::new();
    let dispatcher = Dispatcher::start(&config, algorithm, threads, ways_per_thread, source);

    let adapter_dispatcher = Arc::clone(&dispatcher);
    let adapter_pool = pool.clone();
    let retries = config.retries;
    let retry_pause = config.retry_pause;
    let adapter_handle = tokio::spawn(async move {
        if let Err(e) = adapter::run(adapter_pool, algorithm, retries, retry_pause, adapter_dispatcher, outbound_rx).await {
            tracing::error!(error = %e, "pool adapter exited");
        }
    });

    let http_dispatcher = Arc::clone(&dispatcher);
    let http_port = config.http_port;
    tokio::spawn(async move {
        rxcn_miner::api::serve(http_dispatcher, http_port).await;
    });

    let tick_dispatcher = Arc::clone(&dispatcher);
    let tick_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(500));
        loop {
            interval.tick().await;
            tick_dispatcher.drain_results();
            tick_dispatcher.tick_hashrate_sample();
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
        _ = adapter_handle => {
            info!("pool adapter task ended");
        }
    }

    tick_handle.abort();
    dispatcher.stop();
    Ok(())
}

// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/client.rs
//
// TCP transport for the pool connection. Unchanged in spirit from the
// teacher's pool/client.rs: a thin wrapper establishing a low-latency
// connection, with no protocol knowledge of its own.

use crate::error::{MinerError, Result};
use tokio::net::TcpStream;

#[derive(Clone, Default)]
pub struct PoolClient;

impl PoolClient {
    pub fn new() -> Self {
        Self
    }

    pub async fn connect(&self, pool_address: &str) -> Result<TcpStream> {
        let stream = TcpStream::connect(pool_address)
            .await
            .map_err(|e| MinerError::Network(format!("connect to {pool_address} failed: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| MinerError::Network(format!("set_nodelay failed: {e}")))?;
        Ok(stream)
    }
}

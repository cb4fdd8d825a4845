// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/protocol.rs
//
// JSON-RPC message construction for the pool connection, a direct
// generalization of the teacher's StratumProtocol: same login/submit
// request shapes, widened from a single fixed algorithm to whatever the
// configured pool expects.

use crate::core::job::Solution;
use serde_json::{json, Value};

pub struct StratumProtocol;

impl StratumProtocol {
    /// Builds a `login` request. `algo` is the pool-facing algorithm name
    /// (e.g. "cryptonight/2", "randomx"), matching `Algorithm::parse`'s
    /// accepted spellings.
    pub fn create_login_request(wallet_address: &str, worker_name: &str, algo: &str) -> Value {
        json!({
            "id": 1,
            "jsonrpc": "2.0",
            "method": "login",
            "params": {
                "login": wallet_address,
                "pass": worker_name,
                "agent": "rxcn-miner/1.0.0",
                "algo": algo
            }
        })
    }

    /// Builds a `submit` request from an accepted `Solution`.
    pub fn create_submit_request(wallet_address: &str, solution: &Solution, submit_id: u64) -> Value {
        json!({
            "id": submit_id,
            "jsonrpc": "2.0",
            "method": "submit",
            "params": {
                "id": wallet_address,
                "job_id": solution.job_id,
                "nonce": hex::encode(solution.nonce.to_le_bytes()),
                "result": hex::encode(solution.hash)
            }
        })
    }

    pub fn to_message(json: Value) -> String {
        format!("{}\n", json)
    }
}

// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/worker/state.rs
//
// Per-worker state, carried across job changes and donation pauses. Unlike
// original_source's compile-time `MultiWorker<N>` template, `ways` is a
// runtime field (see the DESIGN NOTES on why this crate doesn't need the
// compile-time specialization).

use crate::core::algorithm::{Algorithm, Family, Variant};
use crate::core::job::Job;

#[derive(Clone)]
pub struct WorkerState {
    pub job: Job,
    pub blob: Vec<u8>,
    pub hash: Vec<u8>,
    pub nonce_cursors: Vec<u32>,
}

impl WorkerState {
    pub fn empty(ways: usize) -> Self {
        Self {
            job: Job::default(),
            blob: Vec::new(),
            hash: vec![0u8; ways * 32],
            nonce_cursors: vec![0u32; ways],
        }
    }
}

/// Published to the HTTP API; mutated only by worker startup reporting.
#[derive(Debug, Clone)]
pub struct LaunchStatus {
    pub threads_configured: usize,
    pub threads_started: usize,
    pub huge_pages_granted: usize,
    pub huge_pages_requested: usize,
    pub total_ways: usize,
    pub algorithm: Algorithm,
}

impl Default for LaunchStatus {
    fn default() -> Self {
        Self {
            threads_configured: 0,
            threads_started: 0,
            huge_pages_granted: 0,
            huge_pages_requested: 0,
            total_ways: 0,
            algorithm: Algorithm::new(Family::Cn, Variant::V2).expect("cn/v2 is valid"),
        }
    }
}

// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/mod.rs
//
// Core module entry point: the data model and leaf components of the
// worker pool (Algorithm, Job/Solution, Memory, HashFn registry, HashRate).

pub mod algorithm;
pub mod hashfn;
pub mod hashrate;
pub mod job;
pub mod memory;

pub use algorithm::{Algorithm, Family, Variant};
pub use job::{parse_pool_job, Job, PoolJob, Solution};

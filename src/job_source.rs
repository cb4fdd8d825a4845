// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/job_source.rs
//
// The boundary between the dispatcher and the outside world. The
// dispatcher only knows about this trait; `pool::adapter::StratumJobSource`
// is the concrete implementation bridging it to a real pool connection.

use crate::core::job::Solution;

/// Implemented by whatever feeds jobs into the dispatcher and receives its
/// solutions. The dispatcher's result drain calls `submit_solution` for
/// every accepted share and `on_hashrate_sample` once per tick.
pub trait JobSource: Send + Sync {
    fn submit_solution(&self, solution: Solution);
    fn on_hashrate_sample(&self, _total_hashrate: f64) {}
}

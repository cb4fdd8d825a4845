// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/error.rs
//
// Typed error surface for the library half of the crate. The binary boundary
// (main.rs, the CLI glue) is free to wrap these in anyhow; library code never
// returns a boxed trait object.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("allocation failed: {0}")]
    Alloc(String),

    #[error("self-test failed for {family:?}/{variant:?} (way {way}): reference mismatch")]
    SelfTest {
        family: crate::core::algorithm::Family,
        variant: crate::core::algorithm::Variant,
        way: usize,
    },

    #[error("job parse error: {0}")]
    JobParse(String),

    #[error("network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, MinerError>;

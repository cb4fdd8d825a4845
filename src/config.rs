// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/config.rs
//
// Persisted JSON configuration, shaped after original_source's
// core/config/Config_default.h (`pools[]`, `cpu{}`, `retries`,
// `retry-pause`, `donate-level`). Only the subset the core actually
// consumes is modeled; unknown keys are ignored by serde's default
// behavior so a richer upstream config file still loads.

use crate::core::algorithm::Algorithm;
use crate::error::{MinerError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    pub url: String,
    pub user: String,
    #[serde(default = "default_pass")]
    pub pass: String,
    #[serde(default)]
    pub nicehash: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_keepalive")]
    pub keepalive: bool,
    #[serde(default)]
    pub rig_id: Option<String>,
    pub algo: String,
    #[serde(default)]
    pub variant: Option<String>,
}

fn default_pass() -> String {
    "x".to_string()
}

fn default_true() -> bool {
    true
}

fn default_keepalive() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CpuConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub huge_pages: bool,
    #[serde(default)]
    pub max_threads_hint: Option<usize>,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            huge_pages: true,
            max_threads_hint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub pools: Vec<PoolConfig>,
    #[serde(default)]
    pub cpu: CpuConfig,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_pause")]
    pub retry_pause: u32,
    #[serde(default)]
    pub donate_level: u32,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_retries() -> u32 {
    5
}
fn default_retry_pause() -> u32 {
    5
}
fn default_http_port() -> u16 {
    8080
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MinerError::Config(format!("cannot read {path}: {e}")))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| MinerError::Config(format!("cannot parse {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pools.is_empty() {
            return Err(MinerError::Config("no pools configured".into()));
        }
        for pool in &self.pools {
            Algorithm::parse(&pool.algo)?;
            if !pool.url.contains(':') {
                return Err(MinerError::Config(format!(
                    "pool url {} missing port",
                    pool.url
                )));
            }
        }
        if !(1..=1000).contains(&self.retries) {
            return Err(MinerError::Config("retries must be in 1..=1000".into()));
        }
        if !(1..=3600).contains(&self.retry_pause) {
            return Err(MinerError::Config("retry_pause must be in 1..=3600".into()));
        }
        if self.donate_level > 99 {
            return Err(MinerError::Config("donate_level must be 0..=99".into()));
        }
        Ok(())
    }

    pub fn primary_pool(&self) -> &PoolConfig {
        self.pools
            .iter()
            .find(|p| p.enabled)
            .unwrap_or(&self.pools[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "pools": [{"url":"pool.example:3333","user":"wallet","algo":"cryptonight/2"}],
            "retries": 5,
            "retry_pause": 5,
            "donate_level": 1
        }"#
    }

    #[test]
    fn parses_minimal_config() {
        let config: Config = serde_json::from_str(sample_json()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.pools.len(), 1);
        assert!(config.cpu.enabled);
    }

    #[test]
    fn rejects_empty_pools() {
        let config = Config {
            pools: vec![],
            cpu: CpuConfig::default(),
            retries: 5,
            retry_pause: 5,
            donate_level: 0,
            http_port: 8080,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_donate_level() {
        let mut config: Config = serde_json::from_str(sample_json()).unwrap();
        config.donate_level = 100;
        assert!(config.validate().is_err());
    }
}

// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/job.rs
//
// Job/Solution value types. The blob layout and offsets (nonce at 39, fixed
// byte at 42) are a direct port of original_source's base/net/stratum/Job.h;
// they are part of the wire contract and are never "improved".

use crate::core::algorithm::Algorithm;
use crate::error::{MinerError, Result};
use serde::Deserialize;

pub const MAX_BLOB_SIZE: usize = 128;
pub const NONCE_OFFSET: usize = 39;
pub const FIXED_BYTE_OFFSET: usize = 42;

/// pool_id sentinel values, ported from Job::poolId() conventions.
pub const POOL_ID_UNASSIGNED: i64 = -2;
pub const POOL_ID_DONATION: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub algorithm: Algorithm,
    pub pool_id: i64,
    pub client_id: String,
    pub id: String,
    pub blob: [u8; MAX_BLOB_SIZE],
    pub size: usize,
    pub target: u64,
    pub seed_hash: [u8; 32],
    pub height: u64,
    pub nicehash: bool,
}

impl Job {
    pub fn nonce_bytes(&self) -> &[u8; 4] {
        assert!(self.size >= NONCE_OFFSET + 4, "blob too short for nonce field");
        self.blob[NONCE_OFFSET..NONCE_OFFSET + 4]
            .try_into()
            .expect("slice has exactly 4 bytes")
    }

    pub fn nonce_bytes_mut(&mut self) -> &mut [u8] {
        assert!(self.size >= NONCE_OFFSET + 4, "blob too short for nonce field");
        &mut self.blob[NONCE_OFFSET..NONCE_OFFSET + 4]
    }

    pub fn nonce(&self) -> u32 {
        u32::from_le_bytes(*self.nonce_bytes())
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.nonce_bytes_mut().copy_from_slice(&nonce.to_le_bytes());
    }

    pub fn fixed_byte(&self) -> u8 {
        assert!(self.size > FIXED_BYTE_OFFSET, "blob too short for fixed byte");
        self.blob[FIXED_BYTE_OFFSET]
    }

    pub fn is_valid(&self) -> bool {
        self.size >= 76 && self.size <= MAX_BLOB_SIZE && self.target != 0
    }

    pub fn is_donation(&self) -> bool {
        self.pool_id == POOL_ID_DONATION
    }
}

impl Default for Job {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::new(crate::core::algorithm::Family::Cn, crate::core::algorithm::Variant::V2)
                .expect("cn/v2 is a valid default algorithm"),
            pool_id: POOL_ID_UNASSIGNED,
            client_id: String::new(),
            id: String::new(),
            blob: [0u8; MAX_BLOB_SIZE],
            size: 0,
            target: 0,
            seed_hash: [0u8; 32],
            height: 0,
            nicehash: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub pool_id: i64,
    pub job_id: String,
    pub client_id: String,
    pub nonce: u32,
    pub hash: [u8; 32],
    pub difficulty: u64,
    pub algorithm: Algorithm,
}

/// Wire shape of a pool `job` notification, decoded before it reaches the
/// core (per spec §6). `target` accepts either a short compact-difficulty
/// hex string or a full little-endian u64 hex string.
#[derive(Debug, Deserialize)]
pub struct PoolJob {
    pub job_id: String,
    pub blob: String,
    pub target: String,
    pub algo: Option<String>,
    pub variant: Option<String>,
    pub height: Option<u64>,
    pub seed_hash: Option<String>,
    #[serde(default)]
    pub nicehash: bool,
}

fn parse_target(hex_str: &str) -> Result<u64> {
    if hex_str.is_empty() {
        return Err(MinerError::JobParse("empty target".into()));
    }
    let bytes = hex::decode(hex_str)
        .map_err(|e| MinerError::JobParse(format!("bad target hex: {e}")))?;
    let target = if bytes.len() <= 4 {
        // compact 32-bit difficulty encoding: target64 = 0xFFFFFFFF_FFFFFFFF / (0xFFFFFFFF / diff32)
        let mut padded = [0u8; 4];
        padded[..bytes.len()].copy_from_slice(&bytes);
        let diff32 = u32::from_le_bytes(padded);
        if diff32 == 0 {
            return Err(MinerError::JobParse("zero target".into()));
        }
        u64::MAX / (u32::MAX as u64 / diff32 as u64)
    } else if bytes.len() <= 8 {
        let mut padded = [0u8; 8];
        padded[..bytes.len()].copy_from_slice(&bytes);
        u64::from_le_bytes(padded)
    } else {
        return Err(MinerError::JobParse("target too long".into()));
    };
    if target == 0 {
        return Err(MinerError::JobParse("zero target".into()));
    }
    Ok(target)
}

/// Parses a pool job notification into the core's `Job` type. `default_algorithm`
/// is used when the pool omits `algo`/`variant` (common for single-algo pools).
pub fn parse_pool_job(raw: &PoolJob, default_algorithm: Algorithm, pool_id: i64) -> Result<Job> {
    if raw.blob.len() % 2 != 0 {
        return Err(MinerError::JobParse("blob hex has odd length".into()));
    }
    let blob_bytes =
        hex::decode(&raw.blob).map_err(|e| MinerError::JobParse(format!("bad blob hex: {e}")))?;
    if blob_bytes.len() < 76 || blob_bytes.len() > MAX_BLOB_SIZE {
        return Err(MinerError::JobParse(format!(
            "blob length {} out of range [76, {})",
            blob_bytes.len(),
            MAX_BLOB_SIZE
        )));
    }

    let algorithm = match (&raw.algo, &raw.variant) {
        (Some(name), _) => Algorithm::parse(name)?,
        (None, _) => default_algorithm,
    };

    let mut seed_hash = [0u8; 32];
    if let Some(seed_hex) = &raw.seed_hash {
        let decoded = hex::decode(seed_hex)
            .map_err(|e| MinerError::JobParse(format!("bad seed_hash hex: {e}")))?;
        if decoded.len() != 32 {
            return Err(MinerError::JobParse(format!(
                "seed_hash must be 32 bytes, got {}",
                decoded.len()
            )));
        }
        seed_hash.copy_from_slice(&decoded);
    } else if algorithm.is_randomx() {
        return Err(MinerError::JobParse("randomx job missing seed_hash".into()));
    }

    let target = parse_target(&raw.target)?;

    let mut blob = [0u8; MAX_BLOB_SIZE];
    blob[..blob_bytes.len()].copy_from_slice(&blob_bytes);

    let job = Job {
        algorithm,
        pool_id,
        client_id: String::new(),
        id: raw.job_id.clone(),
        blob,
        size: blob_bytes.len(),
        target,
        seed_hash,
        height: raw.height.unwrap_or(0),
        nicehash: raw.nicehash,
    };

    if !job.is_valid() {
        return Err(MinerError::JobParse("job failed validity check".into()));
    }

    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> String {
        hex::encode([0u8; 84])
    }

    #[test]
    fn parses_minimal_job() {
        let raw = PoolJob {
            job_id: "1".into(),
            blob: sample_blob(),
            target: hex::encode(1u32.to_le_bytes()),
            algo: Some("cryptonight/2".into()),
            variant: None,
            height: Some(100),
            seed_hash: None,
            nicehash: false,
        };
        let default_algo = Algorithm::parse("cryptonight/2").unwrap();
        let job = parse_pool_job(&raw, default_algo, 0).unwrap();
        assert_eq!(job.size, 84);
        assert_eq!(job.height, 100);
        assert!(job.is_valid());
    }

    #[test]
    fn rejects_short_blob() {
        let raw = PoolJob {
            job_id: "1".into(),
            blob: hex::encode([0u8; 10]),
            target: hex::encode(1u32.to_le_bytes()),
            algo: Some("cryptonight/2".into()),
            variant: None,
            height: None,
            seed_hash: None,
            nicehash: false,
        };
        let default_algo = Algorithm::parse("cryptonight/2").unwrap();
        assert!(parse_pool_job(&raw, default_algo, 0).is_err());
    }

    #[test]
    fn nonce_accessor_round_trips_at_offset_39() {
        let mut job = Job {
            size: 84,
            ..Job::default()
        };
        job.set_nonce(0xDEADBEEF);
        assert_eq!(job.blob[NONCE_OFFSET..NONCE_OFFSET + 4], 0xDEADBEEFu32.to_le_bytes());
        assert_eq!(job.nonce(), 0xDEADBEEF);
    }

    #[test]
    fn randomx_requires_seed_hash() {
        let raw = PoolJob {
            job_id: "1".into(),
            blob: sample_blob(),
            target: hex::encode(1u32.to_le_bytes()),
            algo: Some("randomx".into()),
            variant: None,
            height: None,
            seed_hash: None,
            nicehash: false,
        };
        let default_algo = Algorithm::parse("randomx").unwrap();
        assert!(parse_pool_job(&raw, default_algo, 0).is_err());
    }
}

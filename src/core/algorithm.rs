// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/algorithm.rs
//
// Closed (family, variant) algorithm model, grounded in original_source's
// common/crypto/Algorithm.cpp `algorithms[]` name table. Unlike the teacher's
// core::types::Algorithm (a flat Sha3x/Sha256 enum), this crate needs a real
// family/variant pair because the dispatcher's variant auto-selection and
// multiway self-test both key off it.

use crate::error::{MinerError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Cn,
    CnLite,
    CnHeavy,
    CnPico,
    RandomX,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Auto,
    V0,
    V1,
    V2,
    Half,
    Tube,
    Xtl,
    Msr,
    Xhv,
    Xao,
    Rto,
    Trtl,
    Gpu,
    Wow,
    R,
    Rwz,
    Zls,
    Double,
    RxDefyx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Algorithm {
    pub family: Family,
    pub variant: Variant,
}

impl Algorithm {
    pub fn new(family: Family, variant: Variant) -> Result<Self> {
        let algo = Self { family, variant };
        if !algo.is_valid() {
            return Err(MinerError::Config(format!(
                "invalid algorithm pair: {:?}/{:?}",
                family, variant
            )));
        }
        Ok(algo)
    }

    /// Mirrors original_source's `algorithms[]` table: each family only
    /// accepts a known subset of variants (plus `Auto`, resolved later).
    pub fn is_valid(&self) -> bool {
        use Family::*;
        use Variant::*;
        match self.family {
            Cn => matches!(
                self.variant,
                Auto | V0 | V1 | V2 | Half | Xtl | Msr | Xao | Rto | Gpu | Wow | R | Rwz | Zls
                    | Double | RxDefyx
            ),
            CnLite => matches!(self.variant, Auto | V0 | V1),
            CnHeavy => matches!(self.variant, Auto | V0 | Xhv | Tube),
            CnPico => matches!(self.variant, Auto | Trtl),
            RandomX => matches!(self.variant, Auto | RxDefyx),
        }
    }

    /// Parses the `algo`/`variant` strings found in persisted config and
    /// pool job notifications. Names follow original_source's
    /// `algorithms[]` table (e.g. "cryptonight/2", "cryptonight-lite/1",
    /// "cryptonight-heavy/xhv", "cryptonight-pico/trtl", "randomx").
    pub fn parse(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        let (family, variant) = match lower.as_str() {
            "cryptonight" | "cn" => (Family::Cn, Variant::Auto),
            "cryptonight/0" | "cn/0" => (Family::Cn, Variant::V0),
            "cryptonight/1" | "cn/1" => (Family::Cn, Variant::V1),
            "cryptonight/2" | "cn/2" => (Family::Cn, Variant::V2),
            "cryptonight/half" | "cn/half" => (Family::Cn, Variant::Half),
            "cryptonight/xtl" | "cn/xtl" => (Family::Cn, Variant::Xtl),
            "cryptonight/msr" | "cn/msr" | "cryptonight/rto" => (Family::Cn, Variant::Msr),
            "cryptonight/xao" | "cn/xao" => (Family::Cn, Variant::Xao),
            "cryptonight/gpu" | "cn/gpu" => (Family::Cn, Variant::Gpu),
            "cryptonight/wow" | "cn/wow" => (Family::Cn, Variant::Wow),
            "cryptonight/r" | "cn/r" => (Family::Cn, Variant::R),
            "cryptonight/rwz" | "cn/rwz" => (Family::Cn, Variant::Rwz),
            "cryptonight/zls" | "cn/zls" => (Family::Cn, Variant::Zls),
            "cryptonight/double" | "cn/double" => (Family::Cn, Variant::Double),
            "cryptonight-lite" | "cn-lite" => (Family::CnLite, Variant::Auto),
            "cryptonight-lite/0" | "cn-lite/0" => (Family::CnLite, Variant::V0),
            "cryptonight-lite/1" | "cn-lite/1" => (Family::CnLite, Variant::V1),
            "cryptonight-heavy" | "cn-heavy" => (Family::CnHeavy, Variant::Auto),
            "cryptonight-heavy/0" | "cn-heavy/0" => (Family::CnHeavy, Variant::V0),
            "cryptonight-heavy/xhv" | "cn-heavy/xhv" => (Family::CnHeavy, Variant::Xhv),
            "cryptonight-heavy/tube" | "cn-heavy/tube" => (Family::CnHeavy, Variant::Tube),
            "cryptonight-pico" | "cn-pico" | "cryptonight-pico/trtl" | "cn-pico/trtl" => {
                (Family::CnPico, Variant::Trtl)
            }
            "randomx" | "rx" | "rx/defyx" | "randomx/defyx" => (Family::RandomX, Variant::RxDefyx),
            other => return Err(MinerError::Config(format!("unknown algorithm: {other}"))),
        };
        Self::new(family, variant)
    }

    /// Resolves `Variant::Auto` per spec §4.2. `blob0` is the first byte of
    /// the job blob, consulted only for the `Cn` family.
    pub fn resolve_variant(self, blob0: u8) -> Self {
        if self.variant != Variant::Auto {
            return self;
        }
        let variant = match self.family {
            Family::Cn => {
                if blob0 >= 10 {
                    Variant::RxDefyx
                } else {
                    Variant::Half
                }
            }
            Family::CnLite => Variant::V1,
            Family::CnHeavy => Variant::V0,
            Family::CnPico => Variant::Trtl,
            Family::RandomX => Variant::RxDefyx,
        };
        Self {
            family: self.family,
            variant,
        }
    }

    pub fn is_randomx(self) -> bool {
        self.variant == Variant::RxDefyx
    }

    /// Scratchpad size in bytes for one hashing "way" of this family.
    pub fn scratchpad_bytes(self) -> usize {
        match self.family {
            Family::Cn => 2 * 1024 * 1024,
            Family::CnLite => 1024 * 1024,
            Family::CnHeavy => 4 * 1024 * 1024,
            Family::CnPico => 256 * 1024,
            Family::RandomX => 2 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_pairs() {
        assert!(Algorithm::new(Family::CnLite, Variant::Xhv).is_err());
        assert!(Algorithm::new(Family::CnPico, Variant::V0).is_err());
    }

    #[test]
    fn auto_selects_half_below_ten() {
        let algo = Algorithm::new(Family::Cn, Variant::Auto).unwrap();
        assert_eq!(algo.resolve_variant(9).variant, Variant::Half);
        assert_eq!(algo.resolve_variant(10).variant, Variant::RxDefyx);
    }

    #[test]
    fn parses_known_names() {
        assert_eq!(Algorithm::parse("cryptonight/2").unwrap().variant, Variant::V2);
        assert_eq!(Algorithm::parse("randomx").unwrap().family, Family::RandomX);
        assert!(Algorithm::parse("made-up-algo").is_err());
    }
}

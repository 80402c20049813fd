//! Context fingerprinting.
//!
//! A context (ordered tokens) is folded into one arbitrary-precision integer.
//! Each token gets its own running value seeded with the FNV prime; the token
//! position `i` is mixed into the per-character multiplier, so reordering the
//! same tokens usually changes the fingerprint. Running values grow without
//! bound until they pass a fixed ceiling, after which a cheaper update is used
//! for the rest of the token.

use std::fmt;

use num_bigint::BigUint;

use crate::config::{FNV_CEILING_EXP, FNV_OFFSET, FNV_PRIME, HASH_PRIME};

/// Integer digest of an ordered token context.
///
/// Only produced by [`ContextHasher::hash`]; ordering and distance are numeric.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(BigUint);

impl Fingerprint {
    /// Absolute numeric distance `|self - other|`.
    pub fn distance(&self, other: &Fingerprint) -> BigUint {
        if self.0 >= other.0 {
            &self.0 - &other.0
        } else {
            &other.0 - &self.0
        }
    }

    /// Number of significant bits.
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    /// Borrow the underlying integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full digits are unreadable past a few hundred bits.
        write!(
            f,
            "Fingerprint(bits={}, low={:#x})",
            self.0.bits(),
            self.0.iter_u64_digits().next().unwrap_or(0)
        )
    }
}

#[cfg(test)]
impl From<u64> for Fingerprint {
    fn from(v: u64) -> Self {
        Fingerprint(BigUint::from(v))
    }
}

/// Deterministic context hasher. Holds the precomputed ceiling.
#[derive(Clone, Debug)]
pub struct ContextHasher {
    ceiling: BigUint,
}

impl Default for ContextHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextHasher {
    pub fn new() -> Self {
        Self {
            ceiling: BigUint::from(FNV_OFFSET).pow(FNV_CEILING_EXP),
        }
    }

    /// Fingerprint of an ordered context. An empty context hashes to 0.
    pub fn hash<S: AsRef<str>>(&self, context: &[S]) -> Fingerprint {
        let mut acc = BigUint::default();
        for (i, token) in context.iter().enumerate() {
            acc += self.hash_token(token.as_ref(), i as u64);
        }
        Fingerprint(acc)
    }

    /// Running value of one token at position `i`.
    fn hash_token(&self, token: &str, i: u64) -> BigUint {
        let mut running = BigUint::from(FNV_PRIME);
        for c in token.chars() {
            let cp = c as u32;
            if running < self.ceiling {
                running += cp;
                running *= HASH_PRIME;
                let factor = &running * i + 1u32;
                running *= factor;
            } else {
                running *= cp;
                running += u64::from(HASH_PRIME) + i;
            }
        }
        running
    }
}

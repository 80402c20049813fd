//! Nearest-key resolution.
//!
//! A query fingerprint almost never matches a stored one exactly, so every
//! lookup goes through a linear scan for the key with the smallest absolute
//! distance. Ties go to the key seen first in scan order.

use num_bigint::BigUint;
use rayon::prelude::*;

use crate::memory::hasher::Fingerprint;
use crate::{HashedMlError, Result};

/// Key in `keys` minimising `|key - query|`; first one wins on ties.
pub fn nearest_key<'a>(query: &Fingerprint, keys: &'a [Fingerprint]) -> Result<&'a Fingerprint> {
    let mut best: Option<(&Fingerprint, BigUint)> = None;
    for key in keys {
        let d = key.distance(query);
        let closer = match &best {
            Some((_, best_d)) => d < *best_d,
            None => true,
        };
        if closer {
            best = Some((key, d));
        }
    }
    best.map(|(k, _)| k).ok_or(HashedMlError::EmptyMemory)
}

/// Same contract as [`nearest_key`], scanned on the rayon pool.
///
/// Reduces on `(distance, index)` so ties still go to the earliest key.
pub fn nearest_key_parallel<'a>(
    query: &Fingerprint,
    keys: &'a [Fingerprint],
) -> Result<&'a Fingerprint> {
    keys.par_iter()
        .enumerate()
        .map(|(i, key)| (key.distance(query), i))
        .min()
        .map(|(_, i)| &keys[i])
        .ok_or(HashedMlError::EmptyMemory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(values: &[u64]) -> Vec<Fingerprint> {
        values.iter().map(|&v| Fingerprint::from(v)).collect()
    }

    #[test]
    fn test_empty_keys() {
        let err = nearest_key(&Fingerprint::from(3), &[]).unwrap_err();
        assert!(matches!(err, HashedMlError::EmptyMemory));
        let err = nearest_key_parallel(&Fingerprint::from(3), &[]).unwrap_err();
        assert!(matches!(err, HashedMlError::EmptyMemory));
    }

    #[test]
    fn test_exact_match() {
        let keys = fps(&[5, 17, 99]);
        assert_eq!(nearest_key(&Fingerprint::from(17), &keys).unwrap(), &keys[1]);
    }

    #[test]
    fn test_nearest_below_and_above() {
        let keys = fps(&[10, 20, 40]);
        assert_eq!(nearest_key(&Fingerprint::from(14), &keys).unwrap(), &keys[0]);
        assert_eq!(nearest_key(&Fingerprint::from(32), &keys).unwrap(), &keys[2]);
        assert_eq!(nearest_key(&Fingerprint::from(1000), &keys).unwrap(), &keys[2]);
        assert_eq!(nearest_key(&Fingerprint::from(0), &keys).unwrap(), &keys[0]);
    }

    #[test]
    fn test_tie_goes_to_first_in_order() {
        // 15 is equidistant from 10 and 20.
        let keys = fps(&[20, 10]);
        assert_eq!(nearest_key(&Fingerprint::from(15), &keys).unwrap(), &keys[0]);
        assert_eq!(
            nearest_key_parallel(&Fingerprint::from(15), &keys).unwrap(),
            &keys[0]
        );
    }

    #[test]
    fn test_result_minimises_distance() {
        let keys = fps(&[3, 1000, 77, 512, 64, 65, 9000, 8999]);
        for q in [0u64, 4, 70, 64, 600, 8999, 9001, 5000] {
            let q = Fingerprint::from(q);
            let got = nearest_key(&q, &keys).unwrap();
            assert!(keys.contains(got));
            let min = keys.iter().map(|k| k.distance(&q)).min().unwrap();
            assert_eq!(got.distance(&q), min);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let keys: Vec<Fingerprint> = (0..5000u64)
            .map(|i| Fingerprint::from(i.wrapping_mul(2_654_435_761) % 1_000_003))
            .collect();
        for q in [0u64, 17, 500_000, 999_999, 123_456] {
            let q = Fingerprint::from(q);
            assert_eq!(
                nearest_key(&q, &keys).unwrap(),
                nearest_key_parallel(&q, &keys).unwrap()
            );
        }
    }
}

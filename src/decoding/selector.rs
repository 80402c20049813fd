//! Outcome selection from a resolved bucket.
//!
//! Two modes:
//! - **Unconstrained**: draw a ranking depth in `1..=max_candidates`,
//!   truncate the frequency ranking to it and take the head.
//! - **Exclusion**: draw from the top `exclusion_pool` outcomes, retrying
//!   while the draw is in the exclusion list. Best effort: when every attempt
//!   hits the list, one more unconstrained draw from the pool is returned.

use rand::Rng;

use crate::config::{EXCLUSION_ATTEMPTS, EXCLUSION_POOL, MAX_CANDIDATES, TOP_CANDIDATES};
use crate::memory::store::Bucket;

/// Selector settings.
#[derive(Clone, Debug)]
pub struct OutcomeSelector {
    /// Upper bound of the random ranking depth (unconstrained mode).
    pub max_candidates: usize,

    /// Top-ranked outcomes considered in exclusion mode.
    pub exclusion_pool: usize,

    /// Draws before exclusion falls back to an unconstrained draw.
    pub exclusion_attempts: usize,

    /// Outcomes returned by [`OutcomeSelector::candidates`].
    pub top_n: usize,
}

impl Default for OutcomeSelector {
    fn default() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
            exclusion_pool: EXCLUSION_POOL,
            exclusion_attempts: EXCLUSION_ATTEMPTS,
            top_n: TOP_CANDIDATES,
        }
    }
}

impl OutcomeSelector {
    pub fn new(max_candidates: usize) -> Self {
        Self {
            max_candidates,
            ..Default::default()
        }
    }

    /// Pick one outcome. An empty `exclude` list selects unconstrained.
    pub fn select<'b, S, R>(&self, bucket: &'b Bucket, exclude: &[S], rng: &mut R) -> &'b str
    where
        S: AsRef<str>,
        R: Rng,
    {
        // Buckets are never empty, so neither is the ranking.
        let ranked = bucket.ranked();

        if exclude.is_empty() {
            let depth = rng.gen_range(1..=self.max_candidates.max(1));
            let truncated = &ranked[..depth.min(ranked.len())];
            return truncated[0];
        }

        let pool = &ranked[..self.exclusion_pool.max(1).min(ranked.len())];
        for _ in 0..self.exclusion_attempts {
            let pick = pool[rng.gen_range(0..pool.len())];
            if !exclude.iter().any(|e| e.as_ref() == pick) {
                return pick;
            }
        }
        pool[rng.gen_range(0..pool.len())]
    }

    /// Up to `top_n` distinct outcomes by descending frequency.
    pub fn candidates<'b>(&self, bucket: &'b Bucket) -> Vec<&'b str> {
        let mut ranked = bucket.ranked();
        ranked.truncate(self.top_n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::hasher::Fingerprint;
    use crate::memory::store::AssociativeMemory;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bucket_of(outcomes: &[&str]) -> AssociativeMemory {
        let mut mem = AssociativeMemory::new();
        for o in outcomes {
            mem.insert(Fingerprint::from(1), *o);
        }
        mem
    }

    const NONE: [&str; 0] = [];

    #[test]
    fn test_unconstrained_picks_head_of_ranking() {
        let mem = bucket_of(&["first", "second", "third"]);
        let bucket = mem.lookup(&Fingerprint::from(1)).unwrap();
        let sel = OutcomeSelector::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(sel.select(bucket, &NONE, &mut rng), "first");
        }
    }

    #[test]
    fn test_exclusion_avoids_excluded() {
        let mem = bucket_of(&["a", "b", "c"]);
        let bucket = mem.lookup(&Fingerprint::from(1)).unwrap();
        let sel = OutcomeSelector::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let pick = sel.select(bucket, &["a", "b"], &mut rng);
            // 30 misses in a row has probability (2/3)^30.
            assert_eq!(pick, "c");
        }
    }

    #[test]
    fn test_exclusion_is_best_effort() {
        let mem = bucket_of(&["only"]);
        let bucket = mem.lookup(&Fingerprint::from(1)).unwrap();
        let sel = OutcomeSelector::default();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(sel.select(bucket, &["only"], &mut rng), "only");
    }

    #[test]
    fn test_exclusion_pool_limits_draws() {
        let outcomes: Vec<String> = (0..30).map(|i| format!("o{}", i)).collect();
        let refs: Vec<&str> = outcomes.iter().map(String::as_str).collect();
        let mem = bucket_of(&refs);
        let bucket = mem.lookup(&Fingerprint::from(1)).unwrap();
        let sel = OutcomeSelector::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let pick = sel.select(bucket, &["o0"], &mut rng);
            let idx: usize = pick[1..].parse().unwrap();
            assert!(idx < EXCLUSION_POOL);
        }
    }

    #[test]
    fn test_zero_exclusion_pool_draws_head() {
        let mem = bucket_of(&["a", "b", "c"]);
        let bucket = mem.lookup(&Fingerprint::from(1)).unwrap();
        let sel = OutcomeSelector {
            exclusion_pool: 0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(13);
        assert_eq!(sel.select(bucket, &["b"], &mut rng), "a");
    }

    #[test]
    fn test_seeded_replay() {
        let mem = bucket_of(&["a", "b", "c", "d", "e"]);
        let bucket = mem.lookup(&Fingerprint::from(1)).unwrap();
        let sel = OutcomeSelector::default();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| sel.select(bucket, &["a"], &mut rng).to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn test_candidates_top_n() {
        let outcomes: Vec<String> = (0..15).map(|i| format!("c{}", i)).collect();
        let refs: Vec<&str> = outcomes.iter().map(String::as_str).collect();
        let mem = bucket_of(&refs);
        let bucket = mem.lookup(&Fingerprint::from(1)).unwrap();
        let top = OutcomeSelector::default().candidates(bucket);
        assert_eq!(top.len(), TOP_CANDIDATES);
        assert_eq!(top[0], "c0");
        assert_eq!(top[9], "c9");
    }
}

//! Text generation by repeated nearest-neighbour lookup.
//!
//! Each step hashes the sliding context, resolves the nearest bucket and
//! selects one token with the recent outputs as the exclusion list. With STM
//! enabled, long runs through high-diversity buckets trigger an escape: the
//! last context token is swapped for candidates until a calmer bucket turns
//! up. Tokens whose addition would repeat an earlier window of the output are
//! dropped from the visible text but still advance the context.

use serde::Serialize;

use crate::config::{
    CALM_DIVERSITY, ESCAPE_ATTEMPTS, ESCAPE_PATIENCE, LOW_DIVERSITY, REPEAT_WINDOW_FACTOR,
};
use crate::model::hashed_ml::HashedMl;
use crate::text::tokenize::repeats_last_window;
use crate::{HashedMlError, Result};

/// Seed context for [`HashedMl::generate`].
///
/// Only `Flat` is accepted; `Nested` exists so batch-shaped input is rejected
/// with [`HashedMlError::UnsupportedDimension`] instead of being flattened.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextInput {
    Flat(Vec<String>),
    Nested(Vec<Vec<String>>),
}

impl From<Vec<String>> for ContextInput {
    fn from(v: Vec<String>) -> Self {
        ContextInput::Flat(v)
    }
}

impl From<Vec<&str>> for ContextInput {
    fn from(v: Vec<&str>) -> Self {
        ContextInput::Flat(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ContextInput {
    fn from(v: &[&str]) -> Self {
        ContextInput::Flat(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[String]> for ContextInput {
    fn from(v: &[String]) -> Self {
        ContextInput::Flat(v.to_vec())
    }
}

impl From<Vec<Vec<String>>> for ContextInput {
    fn from(v: Vec<Vec<String>>) -> Self {
        ContextInput::Nested(v)
    }
}

impl From<Vec<Vec<&str>>> for ContextInput {
    fn from(v: Vec<Vec<&str>>) -> Self {
        ContextInput::Nested(
            v.into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }
}

/// Generation options.
#[derive(Clone, Debug)]
pub struct GenerateOptions {
    /// Selection steps to run.
    pub nwords: usize,

    /// Enable the STM loop-escape heuristic.
    pub stm: bool,

    /// Appended after every emitted token that does not already contain it.
    pub separator: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            nwords: 100,
            stm: true,
            separator: " ".to_string(),
        }
    }
}

/// Counters accumulated across `generate` calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GenerationStats {
    /// Selection steps run.
    pub steps: u64,

    /// Tokens kept out of the output by the repetition check.
    pub rejected_repetitions: u64,

    /// Escapes attempted.
    pub escapes: u64,

    /// Escapes that found a calm bucket.
    pub calm_escapes: u64,
}

impl HashedMl {
    /// Generate `options.nwords` tokens starting from `seed`.
    ///
    /// STM state carries over between calls on the same model.
    pub fn generate(
        &mut self,
        seed: impl Into<ContextInput>,
        options: &GenerateOptions,
    ) -> Result<String> {
        let mut context = match seed.into() {
            ContextInput::Flat(tokens) => tokens,
            ContextInput::Nested(_) => {
                return Err(HashedMlError::UnsupportedDimension { depth: 2 });
            }
        };
        let nback = self.config.nback;
        let sep = options.separator.as_str();
        let window = REPEAT_WINDOW_FACTOR * nback;

        // The seed prefix is always space-joined; only generated tokens
        // carry the separator.
        let mut output = context.join(" ");
        output.push(' ');

        for _ in 0..options.nwords {
            let token = self.next_token(&context, options.stm)?;
            self.gen_stats.steps += 1;

            context.push(token.clone());
            if context.len() >= nback {
                context.remove(0);
            }

            let mut candidate = output.clone();
            candidate.push_str(&token);
            if !token.contains(sep) {
                candidate.push_str(sep);
            }
            if repeats_last_window(&candidate, window) {
                self.gen_stats.rejected_repetitions += 1;
                tracing::debug!(token = %token, "repetition check dropped token");
            } else {
                output = candidate;
            }

            if token != "\n" && token != " " {
                self.stm.push_recent(token);
            }
            if !output.ends_with(sep) {
                output.push_str(sep);
            }
        }
        Ok(output)
    }

    /// Counters accumulated by [`HashedMl::generate`].
    pub fn generation_stats(&self) -> &GenerationStats {
        &self.gen_stats
    }

    /// One selection step for `context`.
    fn next_token(&mut self, context: &[String], stm: bool) -> Result<String> {
        let fingerprint = self.hasher.hash(context);
        let (nearest, bucket) = self.memory.resolve(&fingerprint)?;
        let recent = self.stm.recent();
        let recent = recent.as_slice();

        if !stm {
            return Ok(self.selector.select(bucket, recent, &mut self.rng).to_string());
        }

        if bucket.diversity() < LOW_DIVERSITY {
            self.stm.record_visit(nearest.clone());
            self.stm.steps_since_escape += 1;
            return Ok(self.selector.select(bucket, recent, &mut self.rng).to_string());
        }

        if self.stm.steps_since_escape <= ESCAPE_PATIENCE {
            self.stm.steps_since_escape += 1;
            return Ok(self.selector.select(bucket, recent, &mut self.rng).to_string());
        }

        // Escape: probe variants of the context's last token for a calm bucket.
        let mut current = bucket;
        let mut calm = false;
        let mut probe = context.to_vec();
        for _ in 0..ESCAPE_ATTEMPTS {
            let candidate = self.selector.select(current, recent, &mut self.rng).to_string();
            match probe.last_mut() {
                Some(last) => *last = candidate,
                None => probe.push(candidate),
            }
            let (_, probed) = self.memory.resolve(&self.hasher.hash(&probe))?;
            current = probed;
            if current.diversity() < CALM_DIVERSITY {
                calm = true;
                break;
            }
        }
        if !calm {
            current = bucket;
        }

        self.gen_stats.escapes += 1;
        if calm {
            self.gen_stats.calm_escapes += 1;
        }
        tracing::debug!(calm, diversity = current.diversity(), "stm escape");
        self.stm.steps_since_escape = 0;
        Ok(self.selector.select(current, recent, &mut self.rng).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cyclic_model(nback: usize, vocab: usize, seed: u64) -> HashedMl {
        let tokens: Vec<String> = (0..vocab * 3).map(|i| format!("w{}", i % vocab)).collect();
        let mut model = HashedMl::seeded(nback, seed).unwrap();
        for window in tokens.windows(nback) {
            let (features, label) = window.split_at(nback - 1);
            model.fit(features, &label[0]);
        }
        model
    }

    fn opts(nwords: usize, stm: bool) -> GenerateOptions {
        GenerateOptions {
            nwords,
            stm,
            ..Default::default()
        }
    }

    #[test]
    fn test_generation_length() {
        let mut model = cyclic_model(3, 20, 7);
        let out = model.generate(vec!["w0", "w1"], &opts(10, true)).unwrap();
        let count = out.split(' ').filter(|t| !t.is_empty()).count();
        assert!(count >= 10, "output = {:?}", out);
        assert_eq!(model.generation_stats().steps, 10);
    }

    #[test]
    fn test_follows_deterministic_chain() {
        let mut model = cyclic_model(3, 20, 7);
        let out = model.generate(vec!["w0", "w1"], &opts(5, false)).unwrap();
        assert_eq!(out, "w0 w1 w2 w3 w4 w5 w6 ");
    }

    #[test]
    fn test_custom_separator() {
        let mut model = cyclic_model(3, 20, 7);
        let options = GenerateOptions {
            nwords: 3,
            stm: true,
            separator: "|".to_string(),
        };
        let out = model.generate(vec!["w0", "w1"], &options).unwrap();
        assert_eq!(out, "w0 w1 w2|w3|w4|");
    }

    #[test]
    fn test_dimension_guard() {
        let mut model = cyclic_model(3, 20, 7);
        let err = model
            .generate(vec![vec!["a"], vec!["b"]], &opts(5, true))
            .unwrap_err();
        assert!(matches!(err, HashedMlError::UnsupportedDimension { depth: 2 }));
    }

    #[test]
    fn test_generate_on_empty_memory() {
        let mut model = HashedMl::seeded(3, 1).unwrap();
        let err = model.generate(vec!["a", "b"], &opts(1, true)).unwrap_err();
        assert!(matches!(err, HashedMlError::EmptyMemory));
    }

    #[test]
    fn test_zero_words_returns_seed() {
        let mut model = HashedMl::seeded(3, 1).unwrap();
        let out = model.generate(vec!["a", "b"], &opts(0, true)).unwrap();
        assert_eq!(out, "a b ");
    }

    #[test]
    fn test_repetition_dropped_from_output() {
        // A two-token cycle repeats every window almost immediately.
        let mut model = cyclic_model(3, 2, 3);
        let out = model.generate(vec!["w0", "w1"], &opts(30, false)).unwrap();
        let stats = model.generation_stats();
        assert!(stats.rejected_repetitions > 0);
        let words = out.split(' ').filter(|t| !t.is_empty()).count();
        assert!(words < 32);
    }

    #[test]
    fn test_recent_outputs_persist_across_calls() {
        let mut model = cyclic_model(3, 20, 7);
        model.generate(vec!["w0", "w1"], &opts(2, true)).unwrap();
        assert_eq!(model.stm().recent(), ["w2", "w3"]);
        model.generate(vec!["w5", "w6"], &opts(1, true)).unwrap();
        assert_eq!(model.stm().recent(), ["w2", "w3", "w7"]);
    }

    #[test]
    fn test_low_diversity_visits_recorded() {
        let mut model = cyclic_model(3, 20, 7);
        model.generate(vec!["w0", "w1"], &opts(4, true)).unwrap();
        assert_eq!(model.stm().visited_len(), 4);
        assert_eq!(model.stm().steps_since_escape, 4);
    }

    #[test]
    fn test_escape_after_patience() {
        // One context with many continuations keeps the model in a
        // high-diversity bucket.
        let mut model = HashedMl::seeded(3, 5).unwrap();
        for i in 0..8 {
            model.fit(&["hub", "hub"], &format!("t{}", i));
        }
        let out = model
            .generate(vec!["hub", "hub"], &opts(ESCAPE_PATIENCE + 2, true))
            .unwrap();
        assert!(!out.is_empty());
        let stats = model.generation_stats();
        assert_eq!(stats.escapes, 1);
        assert_eq!(model.stm().steps_since_escape, 0);
    }

    #[test]
    fn test_escape_stops_at_calm_bucket() {
        let mut model = HashedMl::seeded(3, 5).unwrap();
        for i in 0..8 {
            model.fit(&["hub", "hub"], &format!("t{}", i));
        }
        // The head of the hub ranking leads to a single-outcome bucket.
        model.fit(&["hub", "t0"], "calm");
        model.stm.steps_since_escape = ESCAPE_PATIENCE + 1;

        let out = model.generate(vec!["hub", "hub"], &opts(1, true)).unwrap();
        assert_eq!(out, "hub hub calm ");
        let stats = model.generation_stats();
        assert_eq!(stats.escapes, 1);
        assert_eq!(stats.calm_escapes, 1);
        assert_eq!(model.stm().steps_since_escape, 0);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let run = || {
            let mut model = HashedMl::seeded(3, 42).unwrap();
            for i in 0..6 {
                model.fit(&["x", "y"], &format!("a{}", i));
                let a = format!("a{}", i);
                model.fit(&["y", a.as_str()], "x");
            }
            model.generate(vec!["x", "y"], &opts(25, true)).unwrap()
        };
        assert_eq!(run(), run());
    }
}

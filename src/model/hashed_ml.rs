//! The model value: one memory, one RNG, one STM, one accuracy counter.
//!
//! Nothing here is global. Two `HashedMl` values never share state; combine
//! independently trained models with [`HashedMl::merge`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_NBACK, MAX_CANDIDATES};
use crate::decoding::selector::OutcomeSelector;
use crate::decoding::stm::ShortTermMemory;
use crate::memory::hasher::ContextHasher;
use crate::memory::store::AssociativeMemory;
use crate::model::generator::GenerationStats;
use crate::{HashedMlError, Result};

/// Model configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Context width: generation keeps `nback - 1` context tokens and
    /// remembers the last `nback` emitted tokens.
    pub nback: usize,

    /// Upper bound of the random ranking depth in unconstrained selection.
    pub max_candidates: usize,

    /// RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            nback: DEFAULT_NBACK,
            max_candidates: MAX_CANDIDATES,
            seed: None,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.nback < 2 {
            return Err(HashedMlError::InvalidConfig(format!(
                "nback must be at least 2, got {}",
                self.nback
            )));
        }
        if self.max_candidates == 0 {
            return Err(HashedMlError::InvalidConfig(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rolling test accuracy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTracker {
    pub correct: u64,
    pub total: u64,

    /// `correct / total` rounded to 4 decimals; 0.0 before any test.
    pub accuracy: f64,
}

impl AccuracyTracker {
    pub fn record(&mut self, hit: bool) {
        if hit {
            self.correct += 1;
        }
        self.total += 1;
        self.accuracy = round4(self.correct as f64 / self.total as f64);
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Hash-keyed associative memory model for classification and generation.
pub struct HashedMl {
    pub(crate) config: ModelConfig,
    pub(crate) hasher: ContextHasher,
    pub(crate) memory: AssociativeMemory,
    pub(crate) selector: OutcomeSelector,
    pub(crate) rng: StdRng,
    pub(crate) tests: AccuracyTracker,
    pub(crate) stm: ShortTermMemory,
    pub(crate) gen_stats: GenerationStats,
}

impl HashedMl {
    /// Model with default configuration and an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::build(ModelConfig::default())
    }

    /// Model with a validated configuration.
    pub fn with_config(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Default configuration with a fixed RNG seed.
    pub fn seeded(nback: usize, seed: u64) -> Result<Self> {
        Self::with_config(ModelConfig {
            nback,
            seed: Some(seed),
            ..Default::default()
        })
    }

    fn build(config: ModelConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            hasher: ContextHasher::new(),
            memory: AssociativeMemory::new(),
            selector: OutcomeSelector::new(config.max_candidates),
            rng,
            tests: AccuracyTracker::default(),
            stm: ShortTermMemory::new(config.nback),
            gen_stats: GenerationStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn nback(&self) -> usize {
        self.config.nback
    }

    pub fn memory(&self) -> &AssociativeMemory {
        &self.memory
    }

    pub fn stm(&self) -> &ShortTermMemory {
        &self.stm
    }

    /// Union another model's memory into this one.
    pub fn merge(&mut self, other: HashedMl) {
        self.memory.merge(other.memory);
    }

    /// Human-readable listing of every fingerprint and its bucket.
    pub fn dump_map(&self) -> String {
        self.memory.dump()
    }
}

impl Default for HashedMl {
    fn default() -> Self {
        Self::new()
    }
}

//! Classification: fit / predict / test / accuracy.

use rayon::prelude::*;

use crate::memory::hasher::ContextHasher;
use crate::memory::store::AssociativeMemory;
use crate::model::hashed_ml::{AccuracyTracker, HashedMl};
use crate::Result;

/// Insert one training pair into `memory`.
///
/// One insert per feature position, each keyed on the whole feature list, so
/// every insert lands in the same bucket. An empty feature list stores nothing.
fn fit_into<S: AsRef<str>>(
    hasher: &ContextHasher,
    memory: &mut AssociativeMemory,
    features: &[S],
    label: &str,
) {
    for _ in features {
        let fingerprint = hasher.hash(features);
        memory.insert(fingerprint, label);
    }
}

impl HashedMl {
    /// Train on one `(features, label)` pair.
    pub fn fit<S: AsRef<str>>(&mut self, features: &[S], label: &str) {
        fit_into(&self.hasher, &mut self.memory, features, label);
    }

    /// Train on a batch of pairs, in order.
    pub fn fit_batch<S: AsRef<str>>(&mut self, pairs: &[(Vec<S>, String)]) {
        for (features, label) in pairs {
            self.fit(features, label);
        }
    }

    /// Train `shards` independent memories on the rayon pool, then merge them
    /// in shard order. Produces the same memory as [`HashedMl::fit_batch`].
    pub fn fit_sharded<S>(&mut self, pairs: &[(Vec<S>, String)], shards: usize)
    where
        S: AsRef<str> + Sync,
    {
        if pairs.is_empty() {
            return;
        }
        let chunk = pairs.len().div_ceil(shards.max(1));
        let hasher = &self.hasher;
        let partials: Vec<AssociativeMemory> = pairs
            .par_chunks(chunk)
            .map(|shard| {
                let mut memory = AssociativeMemory::new();
                for (features, label) in shard {
                    fit_into(hasher, &mut memory, features, label);
                }
                memory
            })
            .collect();
        tracing::debug!(shards = partials.len(), pairs = pairs.len(), "merging shards");
        for memory in partials {
            self.memory.merge(memory);
        }
    }

    /// Predict one label: hash, resolve nearest, select.
    pub fn predict<S: AsRef<str>>(&mut self, features: &[S]) -> Result<String> {
        let fingerprint = self.hasher.hash(features);
        let (_, bucket) = self.memory.resolve(&fingerprint)?;
        let none: [&str; 0] = [];
        Ok(self.selector.select(bucket, &none, &mut self.rng).to_string())
    }

    /// Up to ten candidate labels, most frequent first.
    pub fn predict_candidates<S: AsRef<str>>(&self, features: &[S]) -> Result<Vec<String>> {
        let fingerprint = self.hasher.hash(features);
        let (_, bucket) = self.memory.resolve(&fingerprint)?;
        Ok(self
            .selector
            .candidates(bucket)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn predict_batch<S: AsRef<str>>(&mut self, batch: &[Vec<S>]) -> Result<Vec<String>> {
        batch.iter().map(|features| self.predict(features)).collect()
    }

    /// Predict, compare with `expected`, and update the rolling accuracy.
    /// Returns the prediction.
    pub fn test<S: AsRef<str>>(&mut self, features: &[S], expected: &str) -> Result<String> {
        let prediction = self.predict(features)?;
        self.tests.record(prediction == expected);
        Ok(prediction)
    }

    pub fn test_batch<S: AsRef<str>>(&mut self, pairs: &[(Vec<S>, String)]) -> Result<Vec<String>> {
        let predictions = pairs
            .iter()
            .map(|(features, _)| self.predict(features))
            .collect::<Result<Vec<_>>>()?;
        for (prediction, (_, expected)) in predictions.iter().zip(pairs) {
            self.tests.record(prediction == expected);
        }
        Ok(predictions)
    }

    /// Last computed rolling accuracy; 0.0 before any test.
    pub fn accuracy(&self) -> f64 {
        self.tests.accuracy
    }

    /// Correct / total counters behind [`HashedMl::accuracy`].
    pub fn test_report(&self) -> &AccuracyTracker {
        &self.tests
    }
}

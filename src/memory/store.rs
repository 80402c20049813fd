//! Associative memory: fingerprint → bucket of observed outcomes.
//!
//! Buckets keep insertion order and never hold the same outcome twice.
//! The memory only grows; keys are remembered in first-insertion order so
//! nearest-key ties resolve the same way on every run.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::config::PARALLEL_SCAN_THRESHOLD;
use crate::memory::hasher::Fingerprint;
use crate::memory::resolver::{nearest_key, nearest_key_parallel};
use crate::{HashedMlError, Result};

/// Deduplicated, insertion-ordered outcome list of one fingerprint.
///
/// Never empty: a bucket is created together with its first outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    outcomes: Vec<String>,
}

impl Bucket {
    fn new(first: String) -> Self {
        Self {
            outcomes: vec![first],
        }
    }

    /// Append `outcome` unless already present. Returns whether it was added.
    fn push(&mut self, outcome: String) -> bool {
        if self.contains(&outcome) {
            false
        } else {
            self.outcomes.push(outcome);
            true
        }
    }

    /// Exact membership test.
    pub fn contains(&self, outcome: &str) -> bool {
        self.outcomes.iter().any(|o| o == outcome)
    }

    /// Stored outcomes in insertion order.
    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    /// Number of distinct outcomes.
    pub fn diversity(&self) -> usize {
        // Stored outcomes are already unique.
        self.outcomes.len()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the bucket holds no outcomes.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Distinct outcomes ordered by descending frequency in the stored list.
    /// Equal counts keep first-insertion order.
    pub fn ranked(&self) -> Vec<&str> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for outcome in &self.outcomes {
            match counts.iter_mut().find(|(o, _)| *o == outcome.as_str()) {
                Some((_, n)) => *n += 1,
                None => counts.push((outcome.as_str(), 1)),
            }
        }
        // Stable sort keeps insertion order among ties.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.into_iter().map(|(o, _)| o).collect()
    }
}

/// Fingerprint → bucket map with stable key order.
#[derive(Clone, Debug, Default)]
pub struct AssociativeMemory {
    buckets: HashMap<Fingerprint, Bucket>,

    /// Keys in first-insertion order.
    order: Vec<Fingerprint>,

    /// Total `insert` calls, including deduplicated ones.
    inserts: u64,
}

impl AssociativeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `outcome` under `fingerprint`, creating the bucket if needed.
    pub fn insert(&mut self, fingerprint: Fingerprint, outcome: impl Into<String>) {
        self.inserts += 1;
        self.place(fingerprint, outcome.into());
    }

    fn place(&mut self, fingerprint: Fingerprint, outcome: String) {
        if let Some(bucket) = self.buckets.get_mut(&fingerprint) {
            bucket.push(outcome);
            return;
        }
        self.order.push(fingerprint.clone());
        self.buckets.insert(fingerprint, Bucket::new(outcome));
    }

    /// Bucket stored under exactly `fingerprint`.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Result<&Bucket> {
        self.buckets
            .get(fingerprint)
            .ok_or_else(|| HashedMlError::KeyNotFound(fingerprint.clone()))
    }

    /// All stored fingerprints in first-insertion order.
    pub fn keys(&self) -> &[Fingerprint] {
        &self.order
    }

    /// Nearest stored fingerprint to `query` and its bucket.
    pub fn resolve(&self, query: &Fingerprint) -> Result<(&Fingerprint, &Bucket)> {
        let key = if self.order.len() >= PARALLEL_SCAN_THRESHOLD {
            nearest_key_parallel(query, &self.order)?
        } else {
            nearest_key(query, &self.order)?
        };
        Ok((key, self.lookup(key)?))
    }

    /// Union `other` into `self`.
    ///
    /// Keys new to `self` are appended in `other`'s order; outcomes are
    /// appended with the usual dedup rule.
    pub fn merge(&mut self, other: AssociativeMemory) {
        let AssociativeMemory {
            mut buckets,
            order,
            inserts,
        } = other;
        for key in order {
            if let Some(bucket) = buckets.remove(&key) {
                for outcome in bucket.outcomes {
                    self.place(key.clone(), outcome);
                }
            }
        }
        self.inserts += inserts;
    }

    /// Number of distinct fingerprints.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total outcomes stored across all buckets.
    pub fn outcome_count(&self) -> usize {
        self.buckets.values().map(Bucket::len).sum()
    }

    /// Total `insert` calls, including deduplicated ones.
    pub fn total_inserts(&self) -> u64 {
        self.inserts
    }

    /// Iterate `(fingerprint, bucket)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &Bucket)> {
        self.order
            .iter()
            .filter_map(move |k| self.buckets.get(k).map(|b| (k, b)))
    }

    /// Human-readable listing of every bucket.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (key, bucket) in self.iter() {
            let _ = writeln!(out, "{}: {:?}", key, bucket.outcomes());
        }
        out
    }
}

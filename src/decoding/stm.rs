//! Generator short-term memory (STM).
//!
//! Survives across `generate` calls on the same model; only construction
//! resets it.

use std::collections::VecDeque;

use crate::config::STM_VISITED;
use crate::memory::hasher::Fingerprint;

/// STM state owned by one model.
#[derive(Clone, Debug)]
pub struct ShortTermMemory {
    /// Last resolved fingerprints of low-diversity buckets.
    visited: VecDeque<Fingerprint>,
    visited_capacity: usize,

    /// Generation steps since the last escape.
    pub steps_since_escape: usize,

    /// Most recently emitted tokens; the exclusion list for selection.
    recent: VecDeque<String>,
    recent_capacity: usize,
}

impl ShortTermMemory {
    /// STM remembering the last `nback` emitted tokens.
    pub fn new(nback: usize) -> Self {
        Self {
            visited: VecDeque::with_capacity(STM_VISITED),
            visited_capacity: STM_VISITED,
            steps_since_escape: 0,
            recent: VecDeque::with_capacity(nback),
            recent_capacity: nback,
        }
    }

    pub fn record_visit(&mut self, fingerprint: Fingerprint) {
        push_bounded(&mut self.visited, fingerprint, self.visited_capacity);
    }

    pub fn push_recent(&mut self, token: impl Into<String>) {
        push_bounded(&mut self.recent, token.into(), self.recent_capacity);
    }

    /// Snapshot of the recent tokens, oldest first.
    pub fn recent(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    pub fn visited(&self) -> impl Iterator<Item = &Fingerprint> {
        self.visited.iter()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }
}

fn push_bounded<T>(fifo: &mut VecDeque<T>, item: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    if fifo.len() == capacity {
        fifo.pop_front();
    }
    fifo.push_back(item);
}

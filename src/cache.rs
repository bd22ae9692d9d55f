//! Column-state memoisation.
//!
//! Subproblems are keyed by a hash of their uncovered column state: two
//! subproblems with the same column state have the same cover count (rows
//! outside those columns are irrelevant), so the count and the DAG node
//! recorded on first build can be replayed. The cache sits behind a
//! reader-writer lock in the solver; inserts are first-write-wins, which
//! is sound because racing workers compute the same value for the same
//! key.

use hashbrown::HashMap;

use crate::count::Count;
use crate::dag::NodeId;

#[derive(Debug, Default)]
pub struct StateCache {
    entries: HashMap<u64, (Count, NodeId)>,
    hits: u64,
    misses: u64,
}

impl StateCache {
    pub fn new() -> Self {
        StateCache::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn get(&mut self, state: u64) -> Option<(Count, NodeId)> {
        match self.entries.get(&state) {
            Some(&entry) => {
                self.hits += 1;
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Peek without touching the statistics (read-lock paths).
    pub fn peek(&self, state: u64) -> Option<(Count, NodeId)> {
        self.entries.get(&state).copied()
    }

    /// First write wins: a later insert for the same state is dropped.
    pub fn insert(&mut self, state: u64, count: Count, node: NodeId) {
        self.entries.entry(state).or_insert((count, node));
    }
}

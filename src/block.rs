//! Subproblem slices handed into the recursion.

use std::collections::BTreeSet;

use crate::types::{Col, Row};
use crate::utils::{hash_combine, hash_sorted};

/// A slice of the matrix: the still-active rows of one subproblem together
/// with the still-uncovered columns they touch. `cols` holds the columns
/// that must be covered; `sec_cols` holds at-most-once columns, which are
/// never branched on but do constrain row compatibility.
///
/// Ordered sets keep iteration deterministic, which the state hash relies
/// on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub rows: BTreeSet<Row>,
    pub cols: BTreeSet<Col>,
    pub sec_cols: BTreeSet<Col>,
}

impl Block {
    pub fn new(
        rows: impl IntoIterator<Item = Row>,
        cols: impl IntoIterator<Item = Col>,
    ) -> Self {
        Block {
            rows: rows.into_iter().collect(),
            cols: cols.into_iter().collect(),
            sec_cols: BTreeSet::new(),
        }
    }

    pub fn with_secondary(mut self, sec_cols: impl IntoIterator<Item = Col>) -> Self {
        self.sec_cols = sec_cols.into_iter().collect();
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The memoisation key: a hash of the uncovered column state. Two
    /// subproblems with the same column state have the same cover count,
    /// so secondary columns participate too.
    pub fn state_hash(&self) -> u64 {
        let primary = hash_sorted(self.cols.iter().map(|&c| c as u64));
        if self.sec_cols.is_empty() {
            primary
        } else {
            let secondary = hash_sorted(self.sec_cols.iter().map(|&c| c as u64));
            hash_combine(primary, secondary)
        }
    }
}

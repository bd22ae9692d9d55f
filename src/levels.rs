//! Level-bucketed index of non-tree edges.
//!
//! Each component of the row-graph keeps its non-tree edges in
//! `ceil(log2(|V|)) + 1` buckets. A non-tree edge at level `l` certifies
//! connectivity of its endpoints using only edges at levels `<= l`, so the
//! replacement search may demote an edge that fails to reconnect a cut and
//! never look at it again at higher levels.

use hashbrown::{HashMap, HashSet};

use crate::types::EdgeKey;

/// Top level for a component of `n` vertices.
pub fn max_level_for(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (n as f64).log2().ceil() as usize
    }
}

#[derive(Debug, Clone)]
pub struct LayeredEdges {
    buckets: Vec<HashSet<EdgeKey>>,
    level_of: HashMap<EdgeKey, usize>,
    max_level: usize,
}

impl LayeredEdges {
    pub fn new(max_level: usize) -> Self {
        LayeredEdges {
            buckets: vec![HashSet::new(); max_level + 1],
            level_of: HashMap::new(),
            max_level,
        }
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn len(&self) -> usize {
        self.level_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.level_of.is_empty()
    }

    pub fn contains(&self, key: EdgeKey) -> bool {
        self.level_of.contains_key(&key)
    }

    /// Inserts `key` at `level` (clamped into range). Re-adding a tracked
    /// edge leaves it at its current level.
    pub fn add(&mut self, key: EdgeKey, level: usize) {
        if self.level_of.contains_key(&key) {
            return;
        }
        let level = level.min(self.max_level);
        self.buckets[level].insert(key);
        self.level_of.insert(key, level);
    }

    pub fn remove(&mut self, key: EdgeKey) -> bool {
        match self.level_of.remove(&key) {
            Some(level) => {
                self.buckets[level].remove(&key);
                true
            }
            None => false,
        }
    }

    /// Moves `key` one level down. Returns false if untracked or already
    /// at level 0.
    pub fn demote(&mut self, key: EdgeKey) -> bool {
        match self.level_of.get_mut(&key) {
            Some(level) if *level > 0 => {
                let old = *level;
                *level -= 1;
                self.buckets[old].remove(&key);
                self.buckets[old - 1].insert(key);
                true
            }
            _ => false,
        }
    }

    /// Moves `key` one level up. Returns false if untracked or already at
    /// the top.
    pub fn promote(&mut self, key: EdgeKey) -> bool {
        match self.level_of.get_mut(&key) {
            Some(level) if *level < self.max_level => {
                let old = *level;
                *level += 1;
                self.buckets[old].remove(&key);
                self.buckets[old + 1].insert(key);
                true
            }
            _ => false,
        }
    }

    pub fn level_of(&self, key: EdgeKey) -> Option<usize> {
        self.level_of.get(&key).copied()
    }

    pub fn at_level(&self, level: usize) -> impl Iterator<Item = EdgeKey> + '_ {
        self.buckets
            .get(level)
            .into_iter()
            .flat_map(|bucket| bucket.iter().copied())
    }

    /// All tracked edges with their levels.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, usize)> + '_ {
        self.level_of.iter().map(|(&k, &l)| (k, l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(u: usize, v: usize) -> EdgeKey {
        EdgeKey::new(u, v)
    }

    #[test]
    fn test_max_level_for() {
        assert_eq!(max_level_for(0), 0);
        assert_eq!(max_level_for(1), 0);
        assert_eq!(max_level_for(2), 1);
        assert_eq!(max_level_for(5), 3);
        assert_eq!(max_level_for(8), 3);
        assert_eq!(max_level_for(9), 4);
    }

    #[test]
    fn test_add_remove() {
        let mut index = LayeredEdges::new(3);
        index.add(key(1, 2), 3);
        assert_eq!(index.level_of(key(1, 2)), Some(3));
        assert_eq!(index.len(), 1);
        assert!(index.remove(key(1, 2)));
        assert!(!index.remove(key(1, 2)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_add_clamps_level() {
        let mut index = LayeredEdges::new(2);
        index.add(key(1, 2), 9);
        assert_eq!(index.level_of(key(1, 2)), Some(2));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut index = LayeredEdges::new(3);
        index.add(key(1, 2), 1);
        index.add(key(1, 2), 3);
        assert_eq!(index.level_of(key(1, 2)), Some(1));
        assert_eq!(index.len(), 1);
        // Exactly one bucket holds the edge.
        let buckets_holding: usize = (0..=3)
            .filter(|&l| index.at_level(l).any(|k| k == key(1, 2)))
            .count();
        assert_eq!(buckets_holding, 1);
    }

    #[test]
    fn test_demote_promote() {
        let mut index = LayeredEdges::new(2);
        index.add(key(1, 2), 2);
        assert!(index.demote(key(1, 2)));
        assert_eq!(index.level_of(key(1, 2)), Some(1));
        assert!(index.demote(key(1, 2)));
        assert!(!index.demote(key(1, 2)), "level 0 cannot demote");
        assert!(index.promote(key(1, 2)));
        assert!(index.promote(key(1, 2)));
        assert!(!index.promote(key(1, 2)), "top level cannot promote");
        assert_eq!(index.level_of(key(1, 2)), Some(2));
    }

    #[test]
    fn test_one_bucket_per_edge() {
        let mut index = LayeredEdges::new(3);
        index.add(key(1, 2), 3);
        index.add(key(2, 3), 3);
        index.demote(key(1, 2));
        assert_eq!(index.at_level(3).count(), 1);
        assert_eq!(index.at_level(2).count(), 1);
    }
}

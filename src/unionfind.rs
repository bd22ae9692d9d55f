//! Union-find based incremental connectivity over the row-graph.
//!
//! The fallback detector: rows are grouped by the columns they share, and
//! a block decomposition query rebuilds a local union-find over just the
//! queried rows. A row is only ever deactivated as a whole (all of its
//! columns at once, by a cover), so the static row→columns map plus an
//! active flag is the entire state; any column shared by two active rows
//! is necessarily still uncovered.

use hashbrown::HashMap;

use crate::block::Block;
use crate::types::{Col, Row};

/// Plain disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while cur != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn unite(&mut self, x: usize, y: usize) -> bool {
        let (mut x, mut y) = (self.find(x), self.find(y));
        if x == y {
            return false;
        }
        if self.rank[x] < self.rank[y] {
            std::mem::swap(&mut x, &mut y);
        }
        self.parent[y] = x;
        if self.rank[x] == self.rank[y] {
            self.rank[x] += 1;
        }
        true
    }

    pub fn same(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

/// Row-graph connectivity tracked by active flags over the static
/// row→columns map.
pub struct IncrementalRowGraph {
    row_to_cols: Vec<Vec<Col>>,
    primary: usize,
    active: Vec<bool>,
}

impl IncrementalRowGraph {
    /// Builds the graph from each row's static column list. `primary`
    /// splits a block's demanded columns from its at-most-once ones.
    pub fn new(row_to_cols: Vec<Vec<Col>>, primary: usize) -> Self {
        let n = row_to_cols.len();
        IncrementalRowGraph {
            row_to_cols,
            primary,
            active: vec![true; n],
        }
    }

    /// A graph restricted to one block's rows: everything else starts
    /// inactive. Used by parallel workers so nested decomposition keeps
    /// working on their private slices.
    pub fn for_block(row_to_cols: Vec<Vec<Col>>, primary: usize, block: &Block) -> Self {
        let mut graph = Self::new(row_to_cols, primary);
        for flag in graph.active.iter_mut() {
            *flag = false;
        }
        for &r in &block.rows {
            graph.active[r] = true;
        }
        graph
    }

    pub fn deactivate_rows(&mut self, rows: &[Row]) {
        for &r in rows {
            self.active[r] = false;
        }
    }

    pub fn reactivate_rows(&mut self, rows: &[Row]) {
        for &r in rows {
            self.active[r] = true;
        }
    }

    pub fn is_active(&self, r: Row) -> bool {
        self.active[r]
    }

    /// Partitions the active members of `rows` into connected blocks by a
    /// local union-find rebuild. Returns an empty vector when the rows
    /// form at most one component (no decomposition available).
    pub fn blocks_in(&self, rows: impl IntoIterator<Item = Row> + Clone) -> Vec<Block> {
        let mut uf_ids: HashMap<Row, usize> = HashMap::new();
        let mut members: Vec<Row> = Vec::new();
        for r in rows.clone() {
            if self.active[r] {
                uf_ids.insert(r, members.len());
                members.push(r);
            }
        }
        if members.len() <= 1 {
            return Vec::new();
        }

        let mut uf = UnionFind::new(members.len());
        let mut col_seen: HashMap<Col, usize> = HashMap::new();
        for (id, &r) in members.iter().enumerate() {
            for &c in &self.row_to_cols[r] {
                match col_seen.get(&c) {
                    Some(&first) => {
                        uf.unite(first, id);
                    }
                    None => {
                        col_seen.insert(c, id);
                    }
                }
            }
        }

        let mut groups: HashMap<usize, Vec<Row>> = HashMap::new();
        for (id, &r) in members.iter().enumerate() {
            groups.entry(uf.find(id)).or_default().push(r);
        }
        if groups.len() <= 1 {
            return Vec::new();
        }

        let mut blocks: Vec<Block> = groups
            .into_values()
            .map(|rows| self.block_from_rows(rows))
            .collect();
        // Deterministic order for serial recursion and tests.
        blocks.sort_by_key(|b| b.rows.first().copied());
        blocks
    }

    fn block_from_rows(&self, rows: Vec<Row>) -> Block {
        let mut block = Block::default();
        for &r in &rows {
            for &c in &self.row_to_cols[r] {
                if c <= self.primary {
                    block.cols.insert(c);
                } else {
                    block.sec_cols.insert(c);
                }
            }
        }
        block.rows = rows.into_iter().collect();
        block
    }
}

//! Component detection over the row-graph.
//!
//! Two rows are adjacent whenever they share a still-uncovered column; the
//! search covers columns, rows deactivate, and the active row set
//! periodically splits into independent components whose cover counts
//! multiply. This module keeps that row-graph under edge deletions and
//! re-insertions: an Euler-tour forest spans the live subgraph, and each
//! component carries a level-bucketed index of its non-tree edges so a cut
//! tree edge can search for a replacement from the highest level downward
//! (the Holm–Lichtenberg–Thorup discipline).
//!
//! Component records are keyed by the forest's current tour roots.
//! Every mutation that can move a root (cut, link, replacement promotion,
//! merge) re-keys the affected records, a genuine split partitions the
//! record along the two tours, and a merge folds two records into one.
//! A lookup miss is therefore a programming error, not an expected state.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

use crate::block::Block;
use crate::ett::EulerTourForest;
use crate::levels::{max_level_for, LayeredEdges};
use crate::types::{Col, EdgeKey, Row};

struct ComponentRecord {
    vertices: HashSet<Row>,
    non_tree: LayeredEdges,
}

impl ComponentRecord {
    fn new(vertices: HashSet<Row>) -> Self {
        let max_level = max_level_for(vertices.len());
        ComponentRecord {
            vertices,
            non_tree: LayeredEdges::new(max_level),
        }
    }
}

pub struct ComponentDetector {
    row_to_cols: Vec<Vec<Col>>,
    primary: usize,
    adj: Vec<HashSet<Row>>,
    row_active: Vec<bool>,
    ett: EulerTourForest,
    records: HashMap<usize, ComponentRecord>,
}

impl ComponentDetector {
    /// Builds the row-graph from the column→rows incidence (secondary
    /// columns included: rows conflicting only through an at-most-once
    /// column must not be split apart), spans a BFS forest per component,
    /// and files every back-edge at its component's top level.
    pub fn new(
        num_rows: usize,
        primary: usize,
        row_to_cols: Vec<Vec<Col>>,
        col_to_rows: &[Vec<Row>],
    ) -> Self {
        let mut adj: Vec<HashSet<Row>> = vec![HashSet::new(); num_rows];
        for rows in col_to_rows {
            for (i, &u) in rows.iter().enumerate() {
                for &v in &rows[i + 1..] {
                    if u != v {
                        adj[u].insert(v);
                        adj[v].insert(u);
                    }
                }
            }
        }

        let mut detector = ComponentDetector {
            row_to_cols,
            primary,
            adj,
            row_active: vec![true; num_rows],
            ett: EulerTourForest::new(num_rows),
            records: HashMap::new(),
        };
        detector.build_spanning_forest();
        detector
    }

    fn build_spanning_forest(&mut self) {
        let num_rows = self.row_active.len();
        let mut visited = vec![false; num_rows];

        for start in 0..num_rows {
            if visited[start] {
                continue;
            }

            let mut queue = std::collections::VecDeque::new();
            let mut vertices: HashSet<Row> = HashSet::new();
            let mut tree_edges: Vec<(Row, Row)> = Vec::new();
            let mut all_edges: HashSet<EdgeKey> = HashSet::new();

            queue.push_back(start);
            visited[start] = true;
            vertices.insert(start);

            while let Some(u) = queue.pop_front() {
                for &v in &self.adj[u] {
                    all_edges.insert(EdgeKey::new(u, v));
                    if !visited[v] {
                        visited[v] = true;
                        vertices.insert(v);
                        tree_edges.push((u, v));
                        queue.push_back(v);
                    }
                }
            }

            self.ett.batch_link(&tree_edges);

            let mut record = ComponentRecord::new(vertices);
            let top = record.non_tree.max_level();
            for key in all_edges {
                let (u, v) = key.endpoints();
                if !self.ett.has_edge(u, v) {
                    record.non_tree.add(key, top);
                }
            }
            self.records.insert(self.ett.component_id(start), record);
        }
        debug!(
            "detector: spanning forest over {} rows, {} components",
            num_rows,
            self.records.len()
        );
    }

    pub fn is_active(&self, r: Row) -> bool {
        self.row_active[r]
    }

    pub fn connected(&self, u: Row, v: Row) -> bool {
        self.ett.connected(u, v)
    }

    pub fn num_components(&self) -> usize {
        self.records.len()
    }

    fn record_for(&mut self, comp: usize) -> &mut ComponentRecord {
        self.records
            .get_mut(&comp)
            .expect("component record missing: detector bookkeeping violated")
    }

    fn take_record(&mut self, comp: usize) -> ComponentRecord {
        self.records
            .remove(&comp)
            .expect("component record missing: detector bookkeeping violated")
    }

    /// Deactivates `removed` rows and deletes every edge that just went
    /// dead. A deleted tree edge triggers the layered replacement search;
    /// a failed search is a genuine split and partitions the component
    /// record along the two tours.
    pub fn delete_edges(&mut self, removed: &[Row]) {
        if removed.is_empty() {
            return;
        }
        let removed_set: HashSet<Row> = removed.iter().copied().collect();
        for &u in removed {
            self.row_active[u] = false;
        }

        let mut live_edges: Vec<(Row, Row)> = Vec::new();
        let mut dead_pairs: Vec<EdgeKey> = Vec::new();
        let mut seen: HashSet<EdgeKey> = HashSet::new();
        for &u in removed {
            for &v in &self.adj[u] {
                let key = EdgeKey::new(u, v);
                if !seen.insert(key) {
                    continue;
                }
                if removed_set.contains(&v) {
                    // Both endpoints leave in this batch. The tree edge
                    // (if any) stays in the forest and reconnects nothing
                    // live; a tracked non-tree edge must be unindexed so
                    // the index only ever holds live edges.
                    if !self.ett.has_edge(u, v) {
                        dead_pairs.push(key);
                    }
                } else if self.row_active[v] {
                    live_edges.push((u, v));
                }
            }
        }

        for key in dead_pairs {
            let (u, _) = key.endpoints();
            let comp = self.ett.component_id(u);
            self.record_for(comp).non_tree.remove(key);
        }

        for (u, v) in live_edges {
            // `u` is deactivated, `v` stays active.
            let key = EdgeKey::new(u, v);
            if self.ett.has_edge(u, v) {
                self.delete_tree_edge(u, v);
            } else {
                let comp = self.ett.component_id(v);
                self.record_for(comp).non_tree.remove(key);
            }
        }
    }

    fn delete_tree_edge(&mut self, u: Row, v: Row) {
        let comp_before = self.ett.component_id(v);
        let mut record = self.take_record(comp_before);

        self.ett.cut(u, v);
        trace!("detector: cut tree edge ({u},{v})");

        match self.find_replacement(&mut record) {
            Some((ru, rv)) => {
                let linked = self.ett.link(ru, rv);
                debug_assert!(linked, "replacement endpoints were already connected");
                record.non_tree.remove(EdgeKey::new(ru, rv));
                trace!("detector: replacement edge ({ru},{rv})");
                self.records.insert(self.ett.component_id(v), record);
            }
            None => {
                // The component has genuinely split: partition the record
                // along the two tours. Every surviving non-tree edge has
                // both endpoints on one side (a crossing edge would have
                // been the replacement).
                let root_u = self.ett.component_id(u);
                let root_v = self.ett.component_id(v);
                let side_u: HashSet<Row> = self.ett.tour_vertices(root_u).into_iter().collect();

                let mut rec_u = ComponentRecord::new(side_u);
                let remaining: HashSet<Row> = record
                    .vertices
                    .iter()
                    .copied()
                    .filter(|r| !rec_u.vertices.contains(r))
                    .collect();
                let mut rec_v = ComponentRecord::new(remaining);

                for (key, level) in record.non_tree.iter() {
                    let (a, b) = key.endpoints();
                    debug_assert!(self.row_active[a] && self.row_active[b]);
                    if rec_u.vertices.contains(&a) {
                        debug_assert!(rec_u.vertices.contains(&b));
                        rec_u.non_tree.add(key, level);
                    } else {
                        rec_v.non_tree.add(key, level);
                    }
                }

                trace!(
                    "detector: component split into {} + {} vertices",
                    rec_u.vertices.len(),
                    rec_v.vertices.len()
                );
                self.records.insert(root_u, rec_u);
                self.records.insert(root_v, rec_v);
            }
        }
    }

    /// Scans the component's non-tree edges from the highest level down.
    /// Edges with an inactive endpoint are skipped and demoted; an edge
    /// whose endpoints now lie in different tours is the replacement; an
    /// edge still inside one tour certifies connectivity at a lower level
    /// and is demoted.
    fn find_replacement(&self, record: &mut ComponentRecord) -> Option<(Row, Row)> {
        for level in (0..=record.non_tree.max_level()).rev() {
            let at_level: Vec<EdgeKey> = record.non_tree.at_level(level).collect();
            let mut to_demote = Vec::new();

            for key in at_level {
                let (u, v) = key.endpoints();
                if !self.row_active[u] || !self.row_active[v] {
                    to_demote.push(key);
                    continue;
                }
                if self.ett.component_id(u) != self.ett.component_id(v) {
                    return Some((u, v));
                }
                to_demote.push(key);
            }
            for key in to_demote {
                record.non_tree.demote(key);
            }
        }
        None
    }

    /// Reactivates `restored` rows and re-inserts every edge that came
    /// back to life: a link that connects two components makes a tree edge
    /// and merges their records, a link inside one component deposits a
    /// non-tree edge at the top level.
    pub fn add_edges(&mut self, restored: &[Row]) {
        if restored.is_empty() {
            return;
        }
        for &r in restored {
            self.row_active[r] = true;
        }

        let mut edges: Vec<(Row, Row)> = Vec::new();
        let mut seen: HashSet<EdgeKey> = HashSet::new();
        for &u in restored {
            for &v in &self.adj[u] {
                if !self.row_active[v] {
                    continue;
                }
                let key = EdgeKey::new(u, v);
                if seen.insert(key) {
                    edges.push((u, v));
                }
            }
        }

        for (u, v) in edges {
            let key = EdgeKey::new(u, v);
            if self.ett.has_edge(u, v) {
                // Already spanning (its endpoints left and returned in one
                // batch); the forest is already correct.
                continue;
            }
            let comp_u = self.ett.component_id(u);
            let comp_v = self.ett.component_id(v);
            if comp_u != comp_v {
                let mut rec_u = self.take_record(comp_u);
                let rec_v = self.take_record(comp_v);
                let linked = self.ett.link(u, v);
                debug_assert!(linked);

                rec_u.vertices.extend(rec_v.vertices);
                let mut non_tree = LayeredEdges::new(max_level_for(rec_u.vertices.len()));
                for (k, l) in rec_u.non_tree.iter().chain(rec_v.non_tree.iter()) {
                    non_tree.add(k, l);
                }
                debug_assert!(!non_tree.contains(key));
                rec_u.non_tree = non_tree;
                self.records.insert(self.ett.component_id(u), rec_u);
            } else {
                let record = self.record_for(comp_u);
                let top = record.non_tree.max_level();
                record.non_tree.add(key, top);
            }
        }
    }

    /// Partitions the active members of `rows` by component. Returns an
    /// empty vector when they form at most one component. Block columns
    /// come from the static row→cols map, split into demanded and
    /// at-most-once sets.
    pub fn get_blocks(&self, rows: &BTreeSet<Row>) -> Vec<Block> {
        let mut groups: HashMap<usize, Vec<Row>> = HashMap::new();
        for &r in rows {
            if self.row_active[r] {
                groups.entry(self.ett.component_id(r)).or_default().push(r);
            }
        }
        if groups.len() <= 1 {
            return Vec::new();
        }

        let mut blocks: Vec<Block> = groups
            .into_values()
            .map(|rows| {
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
            })
            .collect();
        blocks.sort_by_key(|b| b.rows.first().copied());
        blocks
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn detector(num_rows: usize, cols: Vec<Vec<Row>>) -> ComponentDetector {
        let num_cols = cols.len();
        let mut row_to_cols = vec![Vec::new(); num_rows];
        for (i, rows) in cols.iter().enumerate() {
            for &r in rows {
                row_to_cols[r].push(i + 1);
            }
        }
        ComponentDetector::new(num_rows, num_cols, row_to_cols, &cols)
    }

    fn active_rows(n: usize) -> BTreeSet<Row> {
        (0..n).collect()
    }

    #[test]
    fn test_initial_components() {
        // Two triangles: rows {0,1,2} and {3,4,5}.
        let d = detector(
            6,
            vec![
                vec![0, 2],
                vec![0, 1],
                vec![1, 2],
                vec![3, 5],
                vec![3, 4],
                vec![4, 5],
            ],
        );
        assert!(d.connected(0, 2));
        assert!(d.connected(3, 5));
        assert!(!d.connected(0, 3));

        let blocks = d.get_blocks(&active_rows(6));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].rows, (0..3).collect());
        assert_eq!(blocks[0].cols, (1..=3).collect());
        assert_eq!(blocks[1].rows, (3..6).collect());
        assert_eq!(blocks[1].cols, (4..=6).collect());
    }

    #[test]
    fn test_single_component_yields_no_blocks() {
        let d = detector(3, vec![vec![0, 1], vec![1, 2]]);
        assert!(d.get_blocks(&active_rows(3)).is_empty());
    }

    #[test]
    fn test_replacement_keeps_cycle_connected() {
        // 4-cycle 0-1-2-3-0: one edge is a back edge. Removing row 1
        // cuts up to two tree edges; the others must be promoted so 0, 2
        // and 3 stay connected.
        let d4 = vec![vec![0, 1], vec![1, 2], vec![2, 3], vec![0, 3]];
        let mut d = detector(4, d4);
        d.delete_edges(&[1]);
        assert!(d.connected(0, 2));
        assert!(d.connected(0, 3));
        assert!(d.get_blocks(&active_rows(4)).is_empty(), "still one component");

        d.add_edges(&[1]);
        assert!(d.connected(0, 1));
        assert!(d.get_blocks(&active_rows(4)).is_empty());
    }

    #[test]
    fn test_bridge_split_and_restore() {
        // Path 0-1-2: removing the middle row splits the ends apart.
        let mut d = detector(3, vec![vec![0, 1], vec![1, 2]]);
        d.delete_edges(&[1]);
        assert!(!d.connected(0, 2));
        let blocks = d.get_blocks(&active_rows(3));
        assert_eq!(blocks.len(), 2, "row 1 is inactive, rows 0 and 2 split");

        d.add_edges(&[1]);
        assert!(d.connected(0, 2));
        assert!(d.get_blocks(&active_rows(3)).is_empty());
    }

    #[test]
    fn test_nested_delete_add_restores_components() {
        let cols = vec![
            vec![0, 1],
            vec![1, 2],
            vec![2, 3],
            vec![0, 3],
            vec![4, 5],
        ];
        let mut d = detector(6, cols);

        d.delete_edges(&[0]);
        d.delete_edges(&[2, 3]);
        assert!(!d.connected(1, 3));
        d.add_edges(&[2, 3]);
        d.add_edges(&[0]);

        assert!(d.connected(0, 2));
        assert!(d.connected(1, 3));
        assert!(d.connected(4, 5));
        assert!(!d.connected(0, 4));
        let blocks = d.get_blocks(&active_rows(6));
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_same_batch_pair_removal() {
        // Rows 0 and 1 leave together; their shared edge must not break
        // the rollback.
        let mut d = detector(4, vec![vec![0, 1], vec![1, 2], vec![2, 3]]);
        d.delete_edges(&[0, 1]);
        assert!(d.connected(2, 3));
        let blocks = d.get_blocks(&active_rows(4));
        assert!(blocks.is_empty(), "only rows 2 and 3 are active, one component");

        d.add_edges(&[0, 1]);
        assert!(d.connected(0, 3));
        assert!(d.get_blocks(&active_rows(4)).is_empty());
    }

    #[test]
    fn test_get_blocks_query_subset() {
        let mut d = detector(4, vec![vec![0, 1], vec![2, 3]]);
        let query: BTreeSet<Row> = [0, 2].into_iter().collect();
        let blocks = d.get_blocks(&query);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].rows, [0].into_iter().collect());
        assert_eq!(blocks[1].rows, [2].into_iter().collect());

        d.delete_edges(&[3]);
        let blocks = d.get_blocks(&query);
        assert_eq!(blocks.len(), 2, "inactive rows do not join blocks");
    }

    #[test]
    fn test_secondary_columns_keep_rows_together() {
        // Rows 0 and 1 share only column 2; with primary = 1 that column
        // is at-most-once, but the rows still conflict.
        let row_to_cols = vec![vec![1, 2], vec![2]];
        let cols = vec![vec![0], vec![0, 1]];
        let d = ComponentDetector::new(2, 1, row_to_cols, &cols);
        assert!(d.connected(0, 1));
        assert!(d.get_blocks(&[0, 1].into_iter().collect()).is_empty());
    }

    #[test]
    fn test_dense_component_delete_everything() {
        // A column shared by four rows: a clique. Tear it down row by
        // row, then rebuild in reverse.
        let mut d = detector(4, vec![vec![0, 1, 2, 3]]);
        d.delete_edges(&[0]);
        d.delete_edges(&[1]);
        d.delete_edges(&[2]);
        d.delete_edges(&[3]);
        d.add_edges(&[3]);
        d.add_edges(&[2]);
        d.add_edges(&[1]);
        d.add_edges(&[0]);
        for u in 0..4 {
            for v in (u + 1)..4 {
                assert!(d.connected(u, v), "({u},{v}) must reconnect");
            }
        }
    }
}

//! The table of DAG nodes built during the search.
//!
//! The compiled artefact is a decision DAG: `Terminal` leaves, `Decision`
//! nodes labelled by a row with a low branch (the alternatives chained so
//! far) and a high branch (the sub-DAG reached by taking the row), and
//! `Decomposed` nodes conjoining the sub-DAGs of independent blocks.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Decision nodes
//! are interned through a bucket table with intrusive collision chains,
//! keyed by `(row, lo, hi)`, so structurally equal decisions share one
//! node and the DAG stays reduced; the reduction `hi == FALSE => lo`
//! elides dead branches entirely. Decomposed nodes are built afresh:
//! their children are interned, their child lists are not.
//!
//! Every node carries its cover count (decision: `lo + hi`; decomposed:
//! product of children), so count invariants hold by construction.

use std::fmt;

use log::debug;

use crate::count::Count;
use crate::types::Row;
use crate::utils::pairing3;

/// Handle to a node in the table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The empty DAG: no cover.
    pub const FALSE: NodeId = NodeId(0);
    /// The trivial DAG: exactly one (empty) cover.
    pub const TRUE: NodeId = NodeId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn hashy(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NodeId::FALSE => write!(f, "F"),
            NodeId::TRUE => write!(f, "T"),
            NodeId(i) => write!(f, "@{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DagNode {
    Terminal(bool),
    Decision { row: Row, lo: NodeId, hi: NodeId },
    Decomposed(Vec<NodeId>),
}

const NO_NODE: u32 = u32::MAX;

pub struct NodeTable {
    nodes: Vec<DagNode>,
    counts: Vec<Count>,
    /// Intrusive collision chains, parallel to `nodes`.
    chain: Vec<u32>,
    buckets: Vec<u32>,
    bitmask: u64,
}

impl NodeTable {
    pub const DEFAULT_BUCKET_BITS: usize = 16;

    pub fn new(bucket_bits: usize) -> Self {
        assert!(
            bucket_bits <= 31,
            "bucket bits must be in the range 0..=31"
        );
        let num_buckets = 1usize << bucket_bits;
        let mut table = NodeTable {
            nodes: Vec::new(),
            counts: Vec::new(),
            chain: Vec::new(),
            buckets: vec![NO_NODE; num_buckets],
            bitmask: (num_buckets - 1) as u64,
        };
        let f = table.push(DagNode::Terminal(false), Count::ZERO);
        let t = table.push(DagNode::Terminal(true), Count::ONE);
        debug_assert_eq!(f, NodeId::FALSE);
        debug_assert_eq!(t, NodeId::TRUE);
        table
    }

    fn push(&mut self, node: DagNode, count: Count) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.counts.push(count);
        self.chain.push(NO_NODE);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &DagNode {
        &self.nodes[id.index()]
    }

    pub fn count(&self, id: NodeId) -> Count {
        self.counts[id.index()]
    }

    fn bucket_of(&self, row: Row, lo: NodeId, hi: NodeId) -> usize {
        (pairing3(row as u64, lo.hashy(), hi.hashy()) & self.bitmask) as usize
    }

    /// Interned decision constructor. A dead high branch collapses to the
    /// low child; otherwise the bucket chain is searched and extended.
    pub fn mk_decision(&mut self, row: Row, lo: NodeId, hi: NodeId) -> NodeId {
        if hi == NodeId::FALSE {
            debug!("mk_decision(row = {row}, lo = {lo}, hi = F) -> {lo}");
            return lo;
        }

        let bucket = self.bucket_of(row, lo, hi);
        let mut index = self.buckets[bucket];

        if index == NO_NODE {
            let count = self.count(lo) + self.count(hi);
            let id = self.push(DagNode::Decision { row, lo, hi }, count);
            self.buckets[bucket] = id.0;
            debug!("mk_decision: created {id} in empty bucket {bucket}");
            return id;
        }

        loop {
            if let DagNode::Decision {
                row: r,
                lo: l,
                hi: h,
            } = &self.nodes[index as usize]
            {
                if *r == row && *l == lo && *h == hi {
                    debug!("mk_decision: node @{index} already exists");
                    return NodeId(index);
                }
            }
            let next = self.chain[index as usize];
            if next == NO_NODE {
                let count = self.count(lo) + self.count(hi);
                let id = self.push(DagNode::Decision { row, lo, hi }, count);
                self.chain[index as usize] = id.0;
                debug!("mk_decision: created {id} after @{index}");
                return id;
            }
            index = next;
        }
    }

    /// Conjunction over independent sub-DAGs; not interned.
    pub fn mk_decomposed(&mut self, children: Vec<NodeId>) -> NodeId {
        debug_assert!(children.len() >= 2, "a decomposition has at least two blocks");
        let count = children
            .iter()
            .fold(Count::ONE, |acc, &c| acc * self.count(c));
        self.push(DagNode::Decomposed(children), count)
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        NodeTable::new(Self::DEFAULT_BUCKET_BITS)
    }
}

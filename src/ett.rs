//! Euler-tour forest over splay trees.
//!
//! Each tree of the forest is represented by the splay tree of its Euler
//! tour: in-order traversal yields the tour. Vertex nodes appear once per
//! tour; every tree edge contributes a pair of edge nodes that enclose the
//! tour of the far side, which is what makes `cut` a pair of splits.
//!
//! Nodes live in an index arena: slot 0 is the nil sentinel, slots
//! `1..=n` are the vertex nodes, and edge nodes are allocated from a free
//! list so balanced link/cut sequences do not grow the arena. The tours
//! carry no order-sensitive payload, so rerooting is a tour rotation
//! (split before the vertex, reattach the prefix at the end) and splays
//! are purely structural.

use hashbrown::HashMap;
use log::trace;

use crate::types::{EdgeKey, Row};

const NIL: u32 = 0;

#[derive(Debug, Copy, Clone, Default)]
struct EttNode {
    parent: u32,
    left: u32,
    right: u32,
}

pub struct EulerTourForest {
    nodes: Vec<EttNode>,
    free: Vec<u32>,
    /// Tree edges only: edge key -> its two enclosing edge nodes.
    edges: HashMap<EdgeKey, (u32, u32)>,
    n: usize,
}

impl EulerTourForest {
    /// A forest of `n` isolated vertices.
    pub fn new(n: usize) -> Self {
        EulerTourForest {
            nodes: vec![EttNode::default(); n + 1],
            free: Vec::new(),
            edges: HashMap::new(),
            n,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.n
    }

    fn vertex_node(&self, v: Row) -> u32 {
        debug_assert!(v < self.n, "vertex {v} out of range");
        (v + 1) as u32
    }

    fn alloc(&mut self) -> u32 {
        if let Some(i) = self.free.pop() {
            self.nodes[i as usize] = EttNode::default();
            i
        } else {
            self.nodes.push(EttNode::default());
            (self.nodes.len() - 1) as u32
        }
    }

    fn release(&mut self, i: u32) {
        self.nodes[i as usize] = EttNode::default();
        self.free.push(i);
    }

    fn node(&self, i: u32) -> &EttNode {
        &self.nodes[i as usize]
    }

    fn node_mut(&mut self, i: u32) -> &mut EttNode {
        &mut self.nodes[i as usize]
    }

    fn rotate(&mut self, x: u32) {
        let p = self.node(x).parent;
        let g = self.node(p).parent;

        if self.node(p).left == x {
            let b = self.node(x).right;
            self.node_mut(p).left = b;
            if b != NIL {
                self.node_mut(b).parent = p;
            }
            self.node_mut(x).right = p;
        } else {
            let b = self.node(x).left;
            self.node_mut(p).right = b;
            if b != NIL {
                self.node_mut(b).parent = p;
            }
            self.node_mut(x).left = p;
        }

        self.node_mut(p).parent = x;
        self.node_mut(x).parent = g;
        if g != NIL {
            if self.node(g).left == p {
                self.node_mut(g).left = x;
            } else {
                self.node_mut(g).right = x;
            }
        }
    }

    fn splay(&mut self, x: u32) {
        while self.node(x).parent != NIL {
            let p = self.node(x).parent;
            let g = self.node(p).parent;
            if g == NIL {
                self.rotate(x);
            } else if (self.node(g).left == p) == (self.node(p).left == x) {
                self.rotate(p);
                self.rotate(x);
            } else {
                self.rotate(x);
                self.rotate(x);
            }
        }
    }

    fn root_of(&self, mut x: u32) -> u32 {
        while self.node(x).parent != NIL {
            x = self.node(x).parent;
        }
        x
    }

    /// Concatenates two tours; either may be nil. Returns the new root.
    fn concat(&mut self, a: u32, b: u32) -> u32 {
        if a == NIL {
            return b;
        }
        if b == NIL {
            return a;
        }
        let mut last = a;
        while self.node(last).right != NIL {
            last = self.node(last).right;
        }
        self.splay(last);
        self.node_mut(last).right = b;
        self.node_mut(b).parent = last;
        last
    }

    /// Rotates the tour so it starts at `x`. Returns the new root (`x`).
    fn reroot_at(&mut self, x: u32) -> u32 {
        self.splay(x);
        let prefix = self.node(x).left;
        if prefix != NIL {
            self.node_mut(x).left = NIL;
            self.node_mut(prefix).parent = NIL;
            self.concat(x, prefix);
            self.splay(x);
        }
        x
    }

    /// True iff `x` lies before `anchor` in tour order. `anchor` must be
    /// the splay root and `x` a different node of the same tree.
    fn is_before(&self, anchor: u32, mut x: u32) -> bool {
        let mut child = NIL;
        while x != anchor {
            child = x;
            x = self.node(x).parent;
        }
        self.node(anchor).left == child
    }

    pub fn connected(&self, u: Row, v: Row) -> bool {
        self.root_of(self.vertex_node(u)) == self.root_of(self.vertex_node(v))
    }

    /// A component identifier: the arena index of the tour root. Stable
    /// between mutations, and equal for exactly the vertices of one tree.
    pub fn component_id(&self, u: Row) -> usize {
        self.root_of(self.vertex_node(u)) as usize
    }

    /// Whether `(u, v)` is currently a tree edge of the forest.
    pub fn has_edge(&self, u: Row, v: Row) -> bool {
        u != v && self.edges.contains_key(&EdgeKey::new(u, v))
    }

    /// Links `u` and `v`. Returns false (leaving the forest untouched) if
    /// they are equal, already adjacent, or already connected.
    pub fn link(&mut self, u: Row, v: Row) -> bool {
        if u == v {
            return false;
        }
        let key = EdgeKey::new(u, v);
        if self.edges.contains_key(&key) {
            return false;
        }
        let un = self.vertex_node(u);
        let vn = self.vertex_node(v);
        if self.root_of(un) == self.root_of(vn) {
            return false;
        }
        trace!("ett: link {key}");

        let tu = self.reroot_at(un);
        let tv = self.reroot_at(vn);
        let e1 = self.alloc();
        let e2 = self.alloc();

        // tour(u) ++ (u,v) ++ tour(v) ++ (v,u)
        let t = self.concat(tu, e1);
        let t = self.concat(t, tv);
        self.concat(t, e2);

        self.edges.insert(key, (e1, e2));
        true
    }

    /// Cuts the tree edge `(u, v)`. Returns false if it is not a tree
    /// edge.
    pub fn cut(&mut self, u: Row, v: Row) -> bool {
        if u == v {
            return false;
        }
        let key = EdgeKey::new(u, v);
        let Some(&(e1, e2)) = self.edges.get(&key) else {
            return false;
        };
        trace!("ett: cut {key}");

        // Order the two edge nodes along the tour.
        self.splay(e1);
        let (first, second) = if self.is_before(e1, e2) {
            (e2, e1)
        } else {
            (e1, e2)
        };

        // Detach the prefix strictly before `first`...
        self.splay(first);
        let prefix = self.node(first).left;
        if prefix != NIL {
            self.node_mut(first).left = NIL;
            self.node_mut(prefix).parent = NIL;
        }
        // ...and the suffix strictly after `second`.
        self.splay(second);
        let suffix = self.node(second).right;
        if suffix != NIL {
            self.node_mut(second).right = NIL;
            self.node_mut(suffix).parent = NIL;
        }

        // What remains is [first, enclosed tour, second]; peel both ends.
        self.splay(first);
        debug_assert_eq!(self.node(first).left, NIL);
        let rest = self.node(first).right;
        self.node_mut(first).right = NIL;
        if rest != NIL {
            self.node_mut(rest).parent = NIL;
        }
        self.splay(second);
        debug_assert_eq!(self.node(second).right, NIL);
        let enclosed = self.node(second).left;
        if enclosed != NIL {
            self.node_mut(second).left = NIL;
            self.node_mut(enclosed).parent = NIL;
        }

        // The enclosed tour is one component; prefix ++ suffix the other.
        self.concat(prefix, suffix);

        self.edges.remove(&key);
        self.release(e1);
        self.release(e2);
        true
    }

    /// The vertices of the tree rooted (as a splay tree) at `root`, in
    /// tour order.
    pub fn tour_vertices(&self, root: usize) -> Vec<Row> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        let mut cur = root as u32;
        while cur != NIL || !stack.is_empty() {
            while cur != NIL {
                stack.push(cur);
                cur = self.node(cur).left;
            }
            let x = stack.pop().unwrap();
            if (1..=self.n as u32).contains(&x) {
                out.push((x - 1) as Row);
            }
            cur = self.node(x).right;
        }
        out
    }

    /// Convenience for building the initial spanning forest.
    pub fn batch_link(&mut self, edges: &[(Row, Row)]) {
        for &(u, v) in edges {
            self.link(u, v);
        }
    }
}

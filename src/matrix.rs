//! The dancing matrix: a toroidal doubly-linked sparse 0/1 matrix.
//!
//! All cells live in one arena `Vec` and link to each other by `u32`
//! index. Slot 0 is the root header, slots `1..=cols` are the column
//! headers, and data cells follow in insertion order. Covering a column
//! splices it out of the root list and its rows out of every other
//! column; uncovering replays the splices in reverse, so a balanced
//! cover/uncover sequence restores the arena bit for bit.
//!
//! Columns `1..=primary` must be covered exactly once. Columns above
//! `primary` are at-most-once: their headers stay out of the root list
//! and out of every selectable column set, but their cells participate in
//! row lists, so choosing a row still covers them.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::BTreeSet;

use log::debug;

use crate::block::Block;
use crate::types::{Col, Row};

const ROOT: u32 = 0;
/// Row id carried by header cells.
const HEADER_ROW: u32 = u32::MAX;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Cell {
    up: u32,
    down: u32,
    left: u32,
    right: u32,
    row: u32,
    col: u32,
}

impl Cell {
    fn detached(row: u32, col: u32) -> Self {
        Cell {
            up: 0,
            down: 0,
            left: 0,
            right: 0,
            row,
            col,
        }
    }
}

pub struct DancingMatrix {
    cells: Vec<Cell>,
    sizes: Vec<u32>,
    /// First cell of each row; 0 when the row is empty.
    row_first: Vec<u32>,
    num_rows: usize,
    num_cols: usize,
    primary: usize,
    row_to_cols: Vec<Vec<Col>>,
    col_to_rows: Vec<Vec<Row>>,
    ones: u64,
}

impl DancingMatrix {
    /// An empty matrix with every column primary.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_primary(rows, cols, cols)
    }

    /// An empty matrix whose first `primary` columns must be covered.
    pub fn with_primary(rows: usize, cols: usize, primary: usize) -> Self {
        assert!(primary <= cols, "primary columns exceed column count");

        let mut cells = Vec::with_capacity(cols + 1);
        for c in 0..=cols {
            let mut header = Cell::detached(HEADER_ROW, c as u32);
            header.up = c as u32;
            header.down = c as u32;
            cells.push(header);
        }

        // Circular root list over the primary headers only.
        let mut prev = ROOT;
        for c in 1..=primary as u32 {
            cells[prev as usize].right = c;
            cells[c as usize].left = prev;
            prev = c;
        }
        cells[prev as usize].right = ROOT;
        cells[ROOT as usize].left = prev;

        // Secondary headers are their own horizontal neighbours.
        for c in (primary + 1)..=cols {
            cells[c].left = c as u32;
            cells[c].right = c as u32;
        }

        DancingMatrix {
            cells,
            sizes: vec![0; cols + 1],
            row_first: vec![0; rows],
            num_rows: rows,
            num_cols: cols,
            primary,
            row_to_cols: vec![Vec::new(); rows],
            col_to_rows: vec![Vec::new(); cols + 1],
            ones: 0,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn num_primary(&self) -> usize {
        self.primary
    }

    pub fn is_primary(&self, c: Col) -> bool {
        (1..=self.primary).contains(&c)
    }

    pub fn ones(&self) -> u64 {
        self.ones
    }

    pub fn col_size(&self, c: Col) -> usize {
        self.sizes[c] as usize
    }

    /// Static column list of a row, as inserted.
    pub fn cols_of_row(&self, r: Row) -> &[Col] {
        &self.row_to_cols[r]
    }

    /// Static row list of a column, as inserted.
    pub fn rows_of_col(&self, c: Col) -> &[Row] {
        &self.col_to_rows[c]
    }

    /// Inserts a cell at `(r, c)`, keeping vertical lists sorted by row
    /// and horizontal lists sorted by column. Duplicate insertions are a
    /// programming error.
    pub fn insert(&mut self, r: Row, c: Col) {
        assert!(r < self.num_rows, "row {r} out of range");
        assert!((1..=self.num_cols).contains(&c), "column {c} out of range");

        let idx = self.cells.len() as u32;
        self.cells.push(Cell::detached(r as u32, c as u32));
        self.sizes[c] += 1;
        self.ones += 1;
        self.row_to_cols[r].push(c);
        self.row_to_cols[r].sort_unstable();
        self.col_to_rows[c].push(r);
        self.col_to_rows[c].sort_unstable();

        // Vertical splice below the last cell with a smaller row.
        let header = c as u32;
        let mut cur = header;
        while self.cells[cur as usize].down != header
            && self.cells[self.cells[cur as usize].down as usize].row < r as u32
        {
            cur = self.cells[cur as usize].down;
        }
        let below = self.cells[cur as usize].down;
        self.cells[idx as usize].down = below;
        self.cells[idx as usize].up = cur;
        self.cells[below as usize].up = idx;
        self.cells[cur as usize].down = idx;

        // Horizontal splice into the row's circular list.
        let first = self.row_first[r];
        if first == 0 {
            self.row_first[r] = idx;
            self.cells[idx as usize].left = idx;
            self.cells[idx as usize].right = idx;
        } else {
            let mut cur = first;
            while self.cells[cur as usize].right != first
                && self.cells[self.cells[cur as usize].right as usize].col < c as u32
            {
                cur = self.cells[cur as usize].right;
            }
            let after = self.cells[cur as usize].right;
            self.cells[idx as usize].right = after;
            self.cells[idx as usize].left = cur;
            self.cells[after as usize].left = idx;
            self.cells[cur as usize].right = idx;
        }
    }

    pub(crate) fn down(&self, i: u32) -> u32 {
        self.cells[i as usize].down
    }

    pub(crate) fn right(&self, i: u32) -> u32 {
        self.cells[i as usize].right
    }

    pub(crate) fn left(&self, i: u32) -> u32 {
        self.cells[i as usize].left
    }

    pub(crate) fn cell_row(&self, i: u32) -> Row {
        self.cells[i as usize].row as Row
    }

    pub(crate) fn cell_col(&self, i: u32) -> Col {
        self.cells[i as usize].col as Col
    }

    pub(crate) fn header(&self, c: Col) -> u32 {
        c as u32
    }

    fn splice_out_rows(&mut self, header: u32) {
        let mut i = self.cells[header as usize].down;
        while i != header {
            let mut j = self.cells[i as usize].right;
            while j != i {
                let cell = self.cells[j as usize];
                self.cells[cell.down as usize].up = cell.up;
                self.cells[cell.up as usize].down = cell.down;
                self.sizes[cell.col as usize] -= 1;
                j = cell.right;
            }
            i = self.cells[i as usize].down;
        }
    }

    fn splice_in_rows(&mut self, header: u32) {
        let mut i = self.cells[header as usize].up;
        while i != header {
            let mut j = self.cells[i as usize].left;
            while j != i {
                let cell = self.cells[j as usize];
                self.sizes[cell.col as usize] += 1;
                self.cells[cell.down as usize].up = j;
                self.cells[cell.up as usize].down = j;
                j = cell.left;
            }
            i = self.cells[i as usize].up;
        }
    }

    /// Covers column `c`: removes its header from the root list and every
    /// row it contains from all other columns.
    pub fn cover(&mut self, c: Col) {
        debug!("cover({c})");
        let header = self.header(c);
        let (l, r) = (self.cells[header as usize].left, self.cells[header as usize].right);
        self.cells[l as usize].right = r;
        self.cells[r as usize].left = l;
        self.splice_out_rows(header);
    }

    /// Exactly reverses the most recent `cover(c)`.
    pub fn uncover(&mut self, c: Col) {
        debug!("uncover({c})");
        let header = self.header(c);
        self.splice_in_rows(header);
        let (l, r) = (self.cells[header as usize].left, self.cells[header as usize].right);
        self.cells[l as usize].right = header;
        self.cells[r as usize].left = header;
    }

    /// As `cover`, and keeps `block` in step: `c` leaves the block's
    /// column sets, the rows of `c` leave `block.rows` and are appended
    /// to `removed` so the caller can feed the connectivity detector.
    pub fn cover_in_block(&mut self, c: Col, block: &mut Block, removed: &mut Vec<Row>) {
        let header = self.header(c);
        let (l, r) = (self.cells[header as usize].left, self.cells[header as usize].right);
        self.cells[l as usize].right = r;
        self.cells[r as usize].left = l;

        if self.is_primary(c) {
            block.cols.remove(&c);
        } else {
            block.sec_cols.remove(&c);
        }

        let mut i = self.cells[header as usize].down;
        while i != header {
            let row = self.cells[i as usize].row as Row;
            if block.rows.remove(&row) {
                removed.push(row);
            }
            i = self.cells[i as usize].down;
        }

        self.splice_out_rows(header);
    }

    /// Exactly reverses the most recent `cover_in_block(c, ..)`.
    pub fn uncover_in_block(&mut self, c: Col, block: &mut Block) {
        let header = self.header(c);
        self.splice_in_rows(header);

        let mut i = self.cells[header as usize].up;
        while i != header {
            block.rows.insert(self.cells[i as usize].row as Row);
            i = self.cells[i as usize].up;
        }

        let (l, r) = (self.cells[header as usize].left, self.cells[header as usize].right);
        self.cells[l as usize].right = header;
        self.cells[r as usize].left = header;
        if self.is_primary(c) {
            block.cols.insert(c);
        } else {
            block.sec_cols.insert(c);
        }
    }

    /// Minimum live size among `cols`; the first column encountered wins
    /// ties.
    pub fn select_min_size(&self, cols: &BTreeSet<Col>) -> Option<Col> {
        let mut best: Option<(Col, usize)> = None;
        for &c in cols {
            let size = self.col_size(c);
            match best {
                Some((_, s)) if s <= size => {}
                _ => best = Some((c, size)),
            }
        }
        best.map(|(c, _)| c)
    }

    /// The column whose live size is closest to `target`, found by
    /// draining a min-heap in size order with an early exit once the
    /// distance can only grow.
    pub fn select_near_target(&self, cols: &BTreeSet<Col>, target: usize) -> Option<Col> {
        let mut heap: BinaryHeap<Reverse<(usize, Col)>> = cols
            .iter()
            .map(|&c| Reverse((self.col_size(c), c)))
            .collect();

        let Reverse((first_size, first_col)) = *heap.peek()?;
        let mut best_col = first_col;
        let mut best_dist = first_size.abs_diff(target);

        while let Some(Reverse((size, col))) = heap.pop() {
            let dist = size.abs_diff(target);
            if dist < best_dist {
                best_dist = dist;
                best_col = col;
            }
            if dist == 0 {
                break;
            }
            if size > target && dist > best_dist {
                break;
            }
        }
        Some(best_col)
    }

    /// The whole problem as a block: every occupied row, every declared
    /// primary column (so an uncoverable empty column is still demanded),
    /// and every occupied secondary column.
    pub fn initial_block(&self) -> Block {
        let rows = (0..self.num_rows).filter(|&r| self.row_first[r] != 0);
        let block = Block::new(rows, 1..=self.primary);
        block.with_secondary(
            ((self.primary + 1)..=self.num_cols).filter(|&c| !self.col_to_rows[c].is_empty()),
        )
    }

    /// A fresh matrix holding only the block's rows (and therefore only
    /// its columns), with global row and column ids preserved. Sibling
    /// blocks of a decomposition share no uncovered column, so workers
    /// can cover and uncover their clones independently.
    pub fn submatrix(&self, block: &Block) -> DancingMatrix {
        let mut sub = DancingMatrix::with_primary(self.num_rows, self.num_cols, self.primary);
        for &r in &block.rows {
            for &c in &self.row_to_cols[r] {
                sub.insert(r, c);
            }
        }
        sub
    }

    #[cfg(test)]
    fn snapshot(&self) -> (Vec<Cell>, Vec<u32>) {
        (self.cells.clone(), self.sizes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// rows: {1}, {2,3}, {4}, {2}, {3} over 4 columns.
    fn sample() -> DancingMatrix {
        let mut m = DancingMatrix::new(5, 4);
        for (r, cols) in [(0, vec![1]), (1, vec![2, 3]), (2, vec![4]), (3, vec![2]), (4, vec![3])] {
            for c in cols {
                m.insert(r, c);
            }
        }
        m
    }

    #[test]
    fn test_sizes_after_build() {
        let m = sample();
        assert_eq!(m.col_size(1), 1);
        assert_eq!(m.col_size(2), 2);
        assert_eq!(m.col_size(3), 2);
        assert_eq!(m.col_size(4), 1);
        assert_eq!(m.ones(), 6);
    }

    #[test]
    fn test_cover_uncover_roundtrip() {
        let mut m = sample();
        let before = m.snapshot();
        m.cover(2);
        assert_eq!(m.col_size(3), 1, "row {{2,3}} left column 3");
        m.cover(3);
        m.uncover(3);
        m.uncover(2);
        assert_eq!(m.snapshot(), before, "balanced covers must restore the arena");
    }

    #[test]
    fn test_cover_in_block_reports_rows() {
        let mut m = sample();
        let mut block = m.initial_block();
        let before = m.snapshot();
        let block_before = block.clone();

        let mut removed = Vec::new();
        m.cover_in_block(2, &mut block, &mut removed);
        removed.sort_unstable();
        assert_eq!(removed, vec![1, 3], "rows of column 2");
        assert!(!block.cols.contains(&2));
        assert!(!block.rows.contains(&1));
        assert!(!block.rows.contains(&3));

        m.uncover_in_block(2, &mut block);
        assert_eq!(m.snapshot(), before);
        assert_eq!(block, block_before);
    }

    #[test]
    fn test_select_min_size() {
        let m = sample();
        let cols: BTreeSet<Col> = [1, 2, 3, 4].into_iter().collect();
        // Sizes 1,2,2,1: column 1 is the first minimum.
        assert_eq!(m.select_min_size(&cols), Some(1));
        let cols: BTreeSet<Col> = [2, 3].into_iter().collect();
        assert_eq!(m.select_min_size(&cols), Some(2));
        assert_eq!(m.select_min_size(&BTreeSet::new()), None);
    }

    #[test]
    fn test_select_near_target() {
        let mut m = DancingMatrix::new(6, 3);
        // Column sizes 1, 3, 6.
        m.insert(0, 1);
        for r in 0..3 {
            m.insert(r, 2);
        }
        for r in 0..6 {
            m.insert(r, 3);
        }
        let cols: BTreeSet<Col> = [1, 2, 3].into_iter().collect();
        assert_eq!(m.select_near_target(&cols, 5), Some(3), "|6-5| beats |3-5|");
        assert_eq!(m.select_near_target(&cols, 1), Some(1));
        assert_eq!(m.select_near_target(&cols, 3), Some(2));
        assert_eq!(m.select_near_target(&BTreeSet::new(), 5), None);
    }

    #[test]
    fn test_initial_block() {
        let m = sample();
        let block = m.initial_block();
        assert_eq!(block.rows.len(), 5);
        assert_eq!(block.cols, (1..=4).collect());
        assert!(block.sec_cols.is_empty());
    }

    #[test]
    fn test_initial_block_includes_empty_columns() {
        // Column 3 is declared but never occupied; it must still be
        // demanded by the root block.
        let mut m = DancingMatrix::new(2, 3);
        m.insert(0, 1);
        m.insert(1, 2);
        let block = m.initial_block();
        assert!(block.cols.contains(&3));
    }

    #[test]
    fn test_secondary_columns() {
        let mut m = DancingMatrix::with_primary(3, 4, 2);
        m.insert(0, 1);
        m.insert(0, 3);
        m.insert(1, 2);
        m.insert(1, 3);
        m.insert(2, 2);

        let block = m.initial_block();
        assert_eq!(block.cols, (1..=2).collect());
        assert_eq!(block.sec_cols, [3].into_iter().collect());

        // Covering a secondary column through its row works like any
        // other cover: row 1 loses its cell in column 2.
        let mut block = block;
        let mut removed = Vec::new();
        m.cover_in_block(3, &mut block, &mut removed);
        removed.sort_unstable();
        assert_eq!(removed, vec![0, 1]);
        assert_eq!(m.col_size(2), 1);
        m.uncover_in_block(3, &mut block);
        assert_eq!(m.col_size(2), 2);
    }

    #[test]
    fn test_submatrix() {
        let m = sample();
        let block = Block::new([1, 3, 4], [2, 3]);
        let sub = m.submatrix(&block);
        assert_eq!(sub.col_size(2), 2);
        assert_eq!(sub.col_size(3), 2);
        assert_eq!(sub.col_size(1), 0);
        assert_eq!(sub.col_size(4), 0);
        assert_eq!(sub.cols_of_row(1), &[2, 3]);
        assert!(sub.cols_of_row(0).is_empty());
    }

    #[test]
    fn test_nested_cover_in_block_roundtrip() {
        let mut m = sample();
        let mut block = m.initial_block();
        let before = m.snapshot();
        let block_before = block.clone();

        let mut outer = Vec::new();
        m.cover_in_block(1, &mut block, &mut outer);
        let mut inner = Vec::new();
        m.cover_in_block(2, &mut block, &mut inner);
        m.cover_in_block(3, &mut block, &mut inner);
        m.uncover_in_block(3, &mut block);
        m.uncover_in_block(2, &mut block);
        m.uncover_in_block(1, &mut block);

        assert_eq!(m.snapshot(), before);
        assert_eq!(block, block_before);
    }
}

//! The DXD search engine.
//!
//! A depth-first DLX search over the dancing matrix, extended at every
//! frame with a decomposition attempt: when the connectivity detector
//! reports that the active rows have split into independent blocks, the
//! blocks are solved separately (serially, or fanned out over worker
//! threads) and their counts multiplied. Results are memoised by column
//! state and materialised as a decision DAG in the shared node table.
//!
//! In parallel mode each worker receives a private sub-matrix clone of
//! its block (sibling blocks share no uncovered column, so the clones are
//! genuinely independent) and shares only the lock-guarded memo cache and
//! node table, the stopwatch, and a per-fan-out failure flag. The first
//! successful decomposition under the Euler-tour detector disables
//! graph-sync for all nested work; parallel union-find workers instead
//! keep decomposing on private incremental graphs.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use log::{debug, info};

use crate::block::Block;
use crate::cache::StateCache;
use crate::count::Count;
use crate::dag::{NodeId, NodeTable};
use crate::detector::ComponentDetector;
use crate::error::DxdError;
use crate::matrix::DancingMatrix;
use crate::parse::Problem;
use crate::stopwatch::Stopwatch;
use crate::types::{Col, Row};
use crate::unionfind::IncrementalRowGraph;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Algorithm {
    /// Single-threaded search.
    Dxd,
    /// Parallel fan-out over decomposition blocks.
    Mdxd,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DetectorKind {
    EulerTour,
    UnionFind,
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub algorithm: Algorithm,
    pub detector: DetectorKind,
    pub threads: usize,
    pub time_bound_secs: u64,
    /// Blocks are only sought above this many active rows.
    pub decompose_threshold: usize,
    /// Preferred branching-column size on the single-threaded path.
    pub target_size: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            algorithm: Algorithm::Dxd,
            detector: DetectorKind::UnionFind,
            threads: 16,
            time_bound_secs: Stopwatch::DEFAULT_BOUND_SECS,
            decompose_threshold: 2,
            target_size: 5,
        }
    }
}

/// The connectivity engine behind `get_blocks`: the Euler-tour detector
/// tracks deletions incrementally, the union-find variant recomputes
/// locally on demand.
pub enum Detector {
    EulerTour(ComponentDetector),
    Incremental(IncrementalRowGraph),
}

impl Detector {
    fn delete_rows(&mut self, rows: &[Row]) {
        match self {
            Detector::EulerTour(d) => d.delete_edges(rows),
            Detector::Incremental(g) => g.deactivate_rows(rows),
        }
    }

    fn restore_rows(&mut self, rows: &[Row]) {
        match self {
            Detector::EulerTour(d) => d.add_edges(rows),
            Detector::Incremental(g) => g.reactivate_rows(rows),
        }
    }

    fn blocks_in(&self, rows: &BTreeSet<Row>) -> Vec<Block> {
        match self {
            Detector::EulerTour(d) => d.get_blocks(rows),
            Detector::Incremental(g) => g.blocks_in(rows.iter().copied()),
        }
    }
}

struct Shared {
    config: SolverConfig,
    table: RwLock<NodeTable>,
    memo: RwLock<StateCache>,
    timer: Stopwatch,
    graph_sync: AtomicBool,
    peak_blocks: AtomicUsize,
}

impl Shared {
    fn sync_enabled(&self) -> bool {
        self.graph_sync.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub count: Count,
    pub root: NodeId,
    pub elapsed: f64,
    pub peak_blocks: usize,
    pub dag_size: usize,
    pub memo_entries: usize,
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Complete(Summary),
    Timeout { elapsed: f64 },
}

pub struct DxdSolver {
    matrix: DancingMatrix,
    detector: Detector,
    shared: Shared,
}

impl DxdSolver {
    pub fn new(problem: &Problem, config: SolverConfig) -> Self {
        let matrix = problem.build_matrix();
        let detector = Self::build_detector(&matrix, config.detector);
        let timer = Stopwatch::with_bound_secs(config.time_bound_secs);
        DxdSolver {
            matrix,
            detector,
            shared: Shared {
                config,
                table: RwLock::new(NodeTable::default()),
                memo: RwLock::new(StateCache::new()),
                timer,
                graph_sync: AtomicBool::new(true),
                peak_blocks: AtomicUsize::new(1),
            },
        }
    }

    fn build_detector(matrix: &DancingMatrix, kind: DetectorKind) -> Detector {
        let row_to_cols: Vec<Vec<Col>> = (0..matrix.num_rows())
            .map(|r| matrix.cols_of_row(r).to_vec())
            .collect();
        match kind {
            DetectorKind::EulerTour => {
                let col_to_rows: Vec<Vec<Row>> = (0..=matrix.num_cols())
                    .map(|c| matrix.rows_of_col(c).to_vec())
                    .collect();
                Detector::EulerTour(ComponentDetector::new(
                    matrix.num_rows(),
                    matrix.num_primary(),
                    row_to_cols,
                    &col_to_rows,
                ))
            }
            DetectorKind::UnionFind => Detector::Incremental(IncrementalRowGraph::new(
                row_to_cols,
                matrix.num_primary(),
            )),
        }
    }

    /// Runs the search once. On a broken time budget every frame unwinds
    /// and the outcome reports the timeout; the matrix is not restored in
    /// that case.
    pub fn run(&mut self) -> SearchOutcome {
        let parallel = self.shared.config.algorithm == Algorithm::Mdxd;
        info!(
            "starting {} search ({} rows, {} columns)",
            if parallel { "parallel DXD" } else { "DXD" },
            self.matrix.num_rows(),
            self.matrix.num_cols(),
        );

        let mut block = self.matrix.initial_block();
        self.shared.timer.reset();
        self.shared.timer.start();
        let result = Self::dxd(
            &mut self.matrix,
            &mut self.detector,
            &self.shared,
            &mut block,
            1,
            parallel,
        );
        self.shared.timer.stop();
        let elapsed = self.shared.timer.elapsed();

        match result {
            Ok((count, root)) => SearchOutcome::Complete(Summary {
                count,
                root,
                elapsed,
                peak_blocks: self.shared.peak_blocks.load(Ordering::Relaxed),
                dag_size: self.shared.table.read().expect("node table poisoned").len(),
                memo_entries: self.shared.memo.read().expect("memo cache poisoned").len(),
            }),
            Err(DxdError::Timeout) => SearchOutcome::Timeout { elapsed },
            Err(other) => unreachable!("search only raises timeouts, got {other}"),
        }
    }

    /// Access to the node table after a completed run.
    pub fn table(&self) -> std::sync::RwLockReadGuard<'_, NodeTable> {
        self.shared.table.read().expect("node table poisoned")
    }

    fn dxd(
        matrix: &mut DancingMatrix,
        detector: &mut Detector,
        shared: &Shared,
        block: &mut Block,
        depth: usize,
        allow_parallel: bool,
    ) -> Result<(Count, NodeId), DxdError> {
        if shared.timer.bound_broken() {
            return Err(DxdError::Timeout);
        }
        if block.cols.is_empty() {
            return Ok((Count::ONE, NodeId::TRUE));
        }

        let state = block.state_hash();
        if let Some(hit) = shared.memo.read().expect("memo cache poisoned").peek(state) {
            return Ok(hit);
        }

        if block.rows.len() > shared.config.decompose_threshold && shared.sync_enabled() {
            let blocks = detector.blocks_in(&block.rows);
            if blocks.len() > 1 {
                shared
                    .peak_blocks
                    .fetch_max(blocks.len(), Ordering::Relaxed);
                debug!("depth {depth}: {} independent blocks", blocks.len());

                // A parent column covered by no child has no live row
                // left, so nothing can ever cover it: dead branch.
                let child_cols: usize = blocks.iter().map(|b| b.cols.len()).sum();
                if child_cols < block.cols.len() {
                    Self::memoise(shared, state, Count::ZERO, NodeId::FALSE);
                    return Ok((Count::ZERO, NodeId::FALSE));
                }

                let (count, node) = if allow_parallel {
                    if matches!(detector, Detector::EulerTour(_)) {
                        // Nested calls run without detector updates from
                        // here on; the decomposition overhead is paid once.
                        shared.graph_sync.store(false, Ordering::Release);
                    }
                    Self::parallel_blocks(matrix, shared, blocks, depth)?
                } else {
                    Self::serial_blocks(matrix, detector, shared, blocks, depth)?
                };
                Self::memoise(shared, state, count, node);
                return Ok((count, node));
            }
        }

        let col = match shared.config.algorithm {
            Algorithm::Dxd => matrix.select_near_target(&block.cols, shared.config.target_size),
            Algorithm::Mdxd => matrix.select_min_size(&block.cols),
        }
        .expect("column selection over a non-empty set");

        if matrix.col_size(col) == 0 {
            Self::memoise(shared, state, Count::ZERO, NodeId::FALSE);
            return Ok((Count::ZERO, NodeId::FALSE));
        }
        debug!(
            "depth {depth}: branching on column {col} (size {})",
            matrix.col_size(col)
        );

        let mut total = Count::ZERO;
        let mut chain = NodeId::FALSE;

        let mut removed_by_col = Vec::new();
        matrix.cover_in_block(col, block, &mut removed_by_col);
        if shared.sync_enabled() {
            detector.delete_rows(&removed_by_col);
        }

        let header = matrix.header(col);
        let mut i = matrix.down(header);
        while i != header {
            let row = matrix.cell_row(i);

            let mut removed = Vec::new();
            let mut j = matrix.right(i);
            while j != i {
                matrix.cover_in_block(matrix.cell_col(j), block, &mut removed);
                j = matrix.right(j);
            }
            if shared.sync_enabled() {
                detector.delete_rows(&removed);
            }

            // A timeout propagates without rollback; the run is over.
            let (sub_count, sub_node) =
                Self::dxd(matrix, detector, shared, block, depth + 1, allow_parallel)?;

            if !sub_count.is_zero() {
                chain = shared
                    .table
                    .write()
                    .expect("node table poisoned")
                    .mk_decision(row, chain, sub_node);
                total = total + sub_count;
            }

            let mut j = matrix.left(i);
            while j != i {
                matrix.uncover_in_block(matrix.cell_col(j), block);
                j = matrix.left(j);
            }
            if shared.sync_enabled() {
                detector.restore_rows(&removed);
            }

            i = matrix.down(i);
        }

        matrix.uncover_in_block(col, block);
        if shared.sync_enabled() {
            detector.restore_rows(&removed_by_col);
        }

        Self::memoise(shared, state, total, chain);
        Ok((total, chain))
    }

    fn memoise(shared: &Shared, state: u64, count: Count, node: NodeId) {
        shared
            .memo
            .write()
            .expect("memo cache poisoned")
            .insert(state, count, node);
    }

    fn serial_blocks(
        matrix: &mut DancingMatrix,
        detector: &mut Detector,
        shared: &Shared,
        blocks: Vec<Block>,
        depth: usize,
    ) -> Result<(Count, NodeId), DxdError> {
        let mut total = Count::ONE;
        let mut children = Vec::with_capacity(blocks.len());
        for mut child in blocks {
            let (count, node) =
                Self::dxd(matrix, detector, shared, &mut child, depth + 1, false)?;
            if count.is_zero() {
                return Ok((Count::ZERO, NodeId::FALSE));
            }
            total = total * count;
            children.push(node);
        }
        let node = shared
            .table
            .write()
            .expect("node table poisoned")
            .mk_decomposed(children);
        Ok((total, node))
    }

    fn parallel_blocks(
        matrix: &DancingMatrix,
        shared: &Shared,
        blocks: Vec<Block>,
        depth: usize,
    ) -> Result<(Count, NodeId), DxdError> {
        let n = blocks.len();
        let workers = shared.config.threads.clamp(1, n);
        debug!("depth {depth}: fanning {n} blocks over {workers} workers");

        let mut batches: Vec<Vec<(usize, Block)>> = (0..workers).map(|_| Vec::new()).collect();
        for (index, block) in blocks.into_iter().enumerate() {
            batches[index % workers].push((index, block));
        }

        let failed = AtomicBool::new(false);
        let worker_results: Vec<Result<Vec<(usize, (Count, NodeId))>, DxdError>> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = batches
                    .into_iter()
                    .map(|batch| {
                        let failed = &failed;
                        scope.spawn(move || {
                            let mut out = Vec::with_capacity(batch.len());
                            for (index, mut child) in batch {
                                if failed.load(Ordering::Acquire) {
                                    out.push((index, (Count::ZERO, NodeId::FALSE)));
                                    continue;
                                }
                                let mut sub = matrix.submatrix(&child);
                                let mut det = Self::worker_detector(matrix, &child);
                                let (count, node) = Self::dxd(
                                    &mut sub, &mut det, shared, &mut child, depth + 1, false,
                                )?;
                                if count.is_zero() {
                                    failed.store(true, Ordering::Release);
                                }
                                out.push((index, (count, node)));
                            }
                            Ok(out)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| match handle.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            });

        let mut ordered: Vec<Option<(Count, NodeId)>> = vec![None; n];
        for result in worker_results {
            for (index, entry) in result? {
                ordered[index] = Some(entry);
            }
        }

        let mut total = Count::ONE;
        let mut children = Vec::with_capacity(n);
        for entry in ordered {
            let (count, node) = entry.expect("every block is assigned to a worker");
            if count.is_zero() {
                return Ok((Count::ZERO, NodeId::FALSE));
            }
            total = total * count;
            children.push(node);
        }
        let node = shared
            .table
            .write()
            .expect("node table poisoned")
            .mk_decomposed(children);
        Ok((total, node))
    }

    /// A private incremental graph for one worker's block, so nested
    /// decomposition keeps working while the shared detector is out of
    /// reach. Inert when graph-sync was disabled at the fork.
    fn worker_detector(matrix: &DancingMatrix, block: &Block) -> Detector {
        let mut row_to_cols: Vec<Vec<Col>> = vec![Vec::new(); matrix.num_rows()];
        for &r in &block.rows {
            row_to_cols[r] = matrix.cols_of_row(r).to_vec();
        }
        Detector::Incremental(IncrementalRowGraph::for_block(
            row_to_cols,
            matrix.num_primary(),
            block,
        ))
    }
}

//! # dxd-rs: Exact-Cover Counting with Dynamic Decomposition
//!
//! **`dxd-rs`** counts and compiles the solutions of Exact Cover
//! instances: given a sparse 0/1 matrix, it reports how many row subsets
//! partition the column set, and materialises a compact decision DAG that
//! preserves the count and, by structure, the set of covers.
//!
//! ## How it works
//!
//! The search is Knuth's dancing-links DLX, extended at every recursion
//! step with *decomposition*: rows that share an uncovered column are
//! adjacent in the row-graph, and as columns are covered that graph falls
//! apart. When the active rows split into connected components, the
//! components are independent subproblems whose counts multiply, so the
//! engine solves them separately (optionally on worker threads) instead
//! of interleaving their branches.
//!
//! ## Key Components
//!
//! - **[`matrix`]**: the toroidal dancing matrix with reversible column
//!   covers, in one index arena.
//! - **[`ett`] + [`levels`] + [`detector`]**: dynamic connectivity over
//!   the row-graph: an Euler-tour forest with level-bucketed non-tree
//!   edges and layered replacement search. [`unionfind`] is the simpler
//!   recompute-on-demand variant.
//! - **[`solver`]**: the recursive engine tying cover/uncover, the
//!   detector and the memo cache together.
//! - **[`dag`] + [`cache`]**: the interned decision-node table and the
//!   column-state memoisation that keep the produced DAG reduced.
//! - **[`count`]**: exact 64-bit counts with a transparent
//!   mantissa/exponent fallback past 2^64.
//!
//! ## Quick Start
//!
//! ```rust
//! use dxd_rs::parse::Problem;
//! use dxd_rs::solver::{DxdSolver, SearchOutcome, SolverConfig};
//!
//! // rows {1}, {2,3}, {4}, {2}, {3} over four columns
//! let problem = Problem::new(4, vec![vec![1], vec![2, 3], vec![4], vec![2], vec![3]]);
//! let mut solver = DxdSolver::new(&problem, SolverConfig::default());
//! match solver.run() {
//!     SearchOutcome::Complete(summary) => {
//!         assert_eq!(summary.count.exact(), Some(1)); // the unique cover {1},{2,3},{4}
//!     }
//!     SearchOutcome::Timeout { .. } => unreachable!(),
//! }
//! ```

pub mod block;
pub mod cache;
pub mod count;
pub mod dag;
pub mod detector;
pub mod error;
pub mod ett;
pub mod levels;
pub mod matrix;
pub mod parse;
pub mod runlog;
pub mod solver;
pub mod stopwatch;
pub mod types;
pub mod unionfind;
pub mod utils;

//! Error kinds surfaced by the library.

use std::path::PathBuf;

use thiserror::Error;

/// Hard cap on input size; larger instances are rejected before search.
pub const MAX_ROWS: usize = 250_000;

#[derive(Debug, Error)]
pub enum DxdError {
    #[error("cannot read input file {path}: {source}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed header: {0}")]
    BadHeader(String),

    #[error("column index {col} out of range 1..={cols} on data line {line}")]
    ColumnOutOfRange { col: i64, cols: usize, line: usize },

    #[error("matrix has {rows} rows, more than the supported {MAX_ROWS}")]
    TooManyRows { rows: usize },

    #[error("time bound broken")]
    Timeout,
}

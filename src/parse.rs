//! Readers for the three legacy benchmark formats.
//!
//! All three describe a sparse 0/1 matrix as one line per row listing the
//! row's 1-columns (1-indexed):
//!
//! - **Format 1**: header `c n = <cols>, m = <rows>`, a skipped second
//!   line, then data lines starting with `s`.
//! - **Format 2**: header `<cols> <rows>`, data lines starting with a row
//!   label and a row length.
//! - **Format 3**: header `<cols> <rows>`, data lines starting with a row
//!   length.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::error::{DxdError, MAX_ROWS};
use crate::matrix::DancingMatrix;
use crate::types::Col;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadMode {
    One,
    Two,
    Three,
}

impl ReadMode {
    pub fn from_flag(flag: u8) -> Option<ReadMode> {
        match flag {
            1 => Some(ReadMode::One),
            2 => Some(ReadMode::Two),
            3 => Some(ReadMode::Three),
            _ => None,
        }
    }
}

/// A parsed instance: per-row column lists over `cols` columns, of which
/// the first `primary` must be covered exactly once. The file formats
/// only express all-primary problems; at-most-once tails are built
/// programmatically.
#[derive(Debug, Clone)]
pub struct Problem {
    pub cols: usize,
    pub primary: usize,
    pub rows: Vec<Vec<Col>>,
}

impl Problem {
    pub fn new(cols: usize, rows: Vec<Vec<Col>>) -> Self {
        Problem {
            cols,
            primary: cols,
            rows,
        }
    }

    pub fn with_primary(cols: usize, primary: usize, rows: Vec<Vec<Col>>) -> Self {
        assert!(primary <= cols);
        Problem {
            cols,
            primary,
            rows,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn build_matrix(&self) -> DancingMatrix {
        let mut matrix = DancingMatrix::with_primary(self.rows.len(), self.cols, self.primary);
        for (r, cols) in self.rows.iter().enumerate() {
            for &c in cols {
                matrix.insert(r, c);
            }
        }
        matrix
    }
}

pub fn read_problem(path: &Path, mode: ReadMode) -> Result<Problem, DxdError> {
    let file = File::open(path).map_err(|source| DxdError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })?;
    let problem = read_from(BufReader::new(file), mode)?;
    info!(
        "parsed {}: {} rows, {} columns",
        path.display(),
        problem.num_rows(),
        problem.cols
    );
    Ok(problem)
}

pub fn read_from<R: BufRead>(reader: R, mode: ReadMode) -> Result<Problem, DxdError> {
    let mut lines = reader.lines();
    let mut next_line = |errmsg: &str| -> Result<String, DxdError> {
        match lines.next() {
            Some(Ok(line)) => Ok(line),
            Some(Err(e)) => Err(DxdError::BadHeader(e.to_string())),
            None => Err(DxdError::BadHeader(errmsg.to_string())),
        }
    };

    let header = next_line("empty input")?;
    let (cols, rows) = match mode {
        ReadMode::One => {
            let dims = parse_header_nm(&header)?;
            // The second line is a comment and is skipped.
            next_line("missing comment line after the header")?;
            dims
        }
        ReadMode::Two | ReadMode::Three => parse_header_pair(&header)?,
    };

    if rows > MAX_ROWS {
        return Err(DxdError::TooManyRows { rows });
    }

    let mut row_cols: Vec<Vec<Col>> = Vec::with_capacity(rows);
    let mut line_no = if mode == ReadMode::One { 2 } else { 1 };
    for line in lines {
        if row_cols.len() >= rows {
            break;
        }
        let line = line.map_err(|e| DxdError::BadHeader(e.to_string()))?;
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        match mode {
            ReadMode::One => {
                // Only `s`-lines carry data.
                if tokens.next() != Some("s") {
                    continue;
                }
            }
            ReadMode::Two => {
                // Row label and row length.
                tokens.next();
                tokens.next();
            }
            ReadMode::Three => {
                // Row length.
                tokens.next();
            }
        }

        let mut entry = Vec::new();
        for token in tokens {
            let col: i64 = token
                .parse()
                .map_err(|_| DxdError::BadHeader(format!("bad column index `{token}`")))?;
            if col < 1 || col as usize > cols {
                return Err(DxdError::ColumnOutOfRange {
                    col,
                    cols,
                    line: line_no,
                });
            }
            entry.push(col as Col);
        }
        row_cols.push(entry);
    }

    // Rows the file never listed stay empty.
    row_cols.resize(rows, Vec::new());
    Ok(Problem::new(cols, row_cols))
}

/// `c n = <cols>, m = <rows>`
fn parse_header_nm(line: &str) -> Result<(usize, usize), DxdError> {
    let cleaned = line.replace([',', '='], " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    match tokens.as_slice() {
        ["c", "n", n, "m", m] => {
            let cols = n
                .parse()
                .map_err(|_| DxdError::BadHeader(format!("bad column count `{n}`")))?;
            let rows = m
                .parse()
                .map_err(|_| DxdError::BadHeader(format!("bad row count `{m}`")))?;
            Ok((cols, rows))
        }
        _ => Err(DxdError::BadHeader(format!(
            "expected `c n = <cols>, m = <rows>`, got `{line}`"
        ))),
    }
}

/// `<cols> <rows>`
fn parse_header_pair(line: &str) -> Result<(usize, usize), DxdError> {
    let mut tokens = line.split_whitespace();
    let cols = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| DxdError::BadHeader(format!("expected `<cols> <rows>`, got `{line}`")))?;
    let rows = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| DxdError::BadHeader(format!("expected `<cols> <rows>`, got `{line}`")))?;
    Ok((cols, rows))
}

//! Cursor over a chunked result set.
//!
//! The cursor only knows the row counts of the chunks, never their contents,
//! so its transitions can be exercised without decoding any payload.

use crate::error::{ResultSetError, StatusCode};

/// Outcome of advancing to the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// The cursor is positioned on a new row.
    Row,
    /// The last row has already been consumed.
    EndOfResultSet,
}

impl RowStatus {
    /// Polling API status code for this outcome.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RowStatus::Row => StatusCode::Success,
            RowStatus::EndOfResultSet => StatusCode::EndOfResultSet,
        }
    }

    /// Whether the cursor moved onto a row.
    pub fn is_row(&self) -> bool {
        matches!(self, RowStatus::Row)
    }
}

/// Current (chunk, row, column) position.
///
/// Row and column start before-first (`None`). Advancing a row resets the
/// column to before-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    chunk_idx: usize,
    chunk_row_idx: Option<usize>,
    column_idx: Option<usize>,
    row_idx: Option<usize>,
    exhausted: bool,
}

impl Cursor {
    /// A cursor before the first row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move back before the first row.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance to the next row, crossing into later chunks (skipping empty
    /// ones) as needed.
    ///
    /// # Arguments
    /// * `chunk_rows` - Row count of every chunk, in order
    pub fn advance_row(&mut self, chunk_rows: &[usize]) -> RowStatus {
        if self.exhausted {
            return RowStatus::EndOfResultSet;
        }

        let mut chunk = self.chunk_idx;
        let mut next_row = self.chunk_row_idx.map_or(0, |r| r + 1);

        while let Some(&rows) = chunk_rows.get(chunk) {
            if next_row < rows {
                self.chunk_idx = chunk;
                self.chunk_row_idx = Some(next_row);
                self.column_idx = None;
                self.row_idx = Some(self.row_idx.map_or(0, |r| r + 1));
                return RowStatus::Row;
            }
            chunk += 1;
            next_row = 0;
        }

        self.exhausted = true;
        self.chunk_row_idx = None;
        self.column_idx = None;
        RowStatus::EndOfResultSet
    }

    /// Advance to the next column of the current row.
    ///
    /// # Errors
    /// Returns `ResultSetError::OutOfRange` if no row is active or the cursor
    /// is already on the last column; the cursor is left unchanged.
    pub fn advance_column(&mut self, column_count: usize) -> Result<usize, ResultSetError> {
        if self.chunk_row_idx.is_none() {
            return Err(ResultSetError::OutOfRange(
                "no current row to advance the column on".to_string(),
            ));
        }

        let next = self.column_idx.map_or(0, |c| c + 1);
        if next >= column_count {
            return Err(ResultSetError::OutOfRange(format!(
                "column {} is past the last column ({} columns)",
                next, column_count
            )));
        }

        self.column_idx = Some(next);
        Ok(next)
    }

    /// `(chunk, row within chunk, column)` of the current cell, if any.
    pub fn position(&self) -> Option<(usize, usize, usize)> {
        match (self.chunk_row_idx, self.column_idx) {
            (Some(row), Some(column)) => Some((self.chunk_idx, row, column)),
            _ => None,
        }
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk_idx
    }

    pub fn chunk_row_index(&self) -> Option<usize> {
        self.chunk_row_idx
    }

    pub fn column_index(&self) -> Option<usize> {
        self.column_idx
    }

    /// Global row index across all chunks.
    pub fn row_index(&self) -> Option<usize> {
        self.row_idx
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

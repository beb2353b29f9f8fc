//! Result set consumption engine.
//!
//! A [`ResultSet`] owns the decoded chunks of one query result and exposes
//! them as a grid of cells addressed by a cursor. Its lifecycle is
//!
//! ```text
//! Building --finish_result_set--> Consuming --next_row past the end--> Exhausted
//! ```
//!
//! Chunks may only be appended while building; the cursor and getters are
//! only usable after the result set has been finished.

mod buffer;
mod builder;
mod cursor;

pub use buffer::{StringBuffer, StringWrite};
pub use builder::ResultSetBuilder;
pub use cursor::{Cursor, RowStatus};

use crate::chunk::{
    ArrowChunk, CellSource, CellValue, Chunk, JsonChunk, QueryResultFormat,
};
use crate::convert::{CellConverter, Timestamp};
use crate::error::{DecodeError, Result, ResultSetError};
use crate::format::{OutputFormatConfig, TimezoneContext};
use crate::types::ColumnMetadata;
use arrow::array::RecordBatch;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, instrument, warn};

/// Lifecycle phase of a [`ResultSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Chunks are being appended
    Building,
    /// Finished; the cursor is usable
    Consuming,
    /// The last row has been consumed
    Exhausted,
}

/// A chunked query result with cursor-based typed access.
///
/// # Example
///
/// ```
/// use chunkset_rs::{ColumnMetadata, ColumnType, QueryResultFormat, ResultSet, RowStatus};
///
/// let mut rs = ResultSet::builder(QueryResultFormat::Json)
///     .column(ColumnMetadata::new("N", ColumnType::Fixed))
///     .build()
///     .unwrap();
/// rs.append_chunk(br#"[["1"], ["2"]]"#).unwrap();
/// rs.finish_result_set().unwrap();
///
/// let mut sum = 0;
/// while rs.next_row().unwrap() == RowStatus::Row {
///     rs.next_column().unwrap();
///     sum += rs.get_curr_cell_as_int64().unwrap().unwrap_or(0);
/// }
/// assert_eq!(sum, 3);
/// ```
#[derive(Debug)]
pub struct ResultSet {
    format: QueryResultFormat,
    columns: Vec<ColumnMetadata>,
    output_formats: OutputFormatConfig,
    timezone: TimezoneContext,
    chunks: Vec<Chunk>,
    chunk_rows: Vec<usize>,
    total_rows: usize,
    expected_rows: Option<usize>,
    phase: Phase,
    cursor: Cursor,
    /// Backing storage for `get_curr_cell_as_const_string`
    scratch: String,
}

impl ResultSet {
    /// Create a result set with default output formats.
    ///
    /// # Arguments
    /// * `format` - Wire format of the chunks that will be appended
    /// * `columns` - Column metadata, one entry per column
    /// * `tz` - Session time zone identifier
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownTimezone` if `tz` cannot be resolved.
    pub fn new(format: QueryResultFormat, columns: Vec<ColumnMetadata>, tz: &str) -> Result<Self> {
        ResultSetBuilder::new(format)
            .columns(columns)
            .timezone(tz)
            .build()
    }

    /// Create a builder.
    pub fn builder(format: QueryResultFormat) -> ResultSetBuilder {
        ResultSetBuilder::new(format)
    }

    pub(crate) fn from_parts(
        format: QueryResultFormat,
        columns: Vec<ColumnMetadata>,
        output_formats: OutputFormatConfig,
        timezone: TimezoneContext,
        expected_rows: Option<usize>,
    ) -> Self {
        Self {
            format,
            columns,
            output_formats,
            timezone,
            chunks: Vec::new(),
            chunk_rows: Vec::new(),
            total_rows: 0,
            expected_rows,
            phase: Phase::Building,
            cursor: Cursor::new(),
            scratch: String::new(),
        }
    }

    // Building ===================================================================================

    /// Decode a raw chunk payload and append it.
    ///
    /// Totals are only updated once the payload decoded successfully; a
    /// rejected payload leaves the result set unchanged.
    ///
    /// # Errors
    /// Returns `ResultSetError::InvalidState` after `finish_result_set`, and
    /// `DecodeError` for malformed payloads or a column count mismatch.
    #[instrument(name = "result_set::append_chunk", level = "debug", skip(self, payload), fields(format = %self.format, bytes = payload.len()))]
    pub fn append_chunk(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_building("append a chunk")?;

        let chunk = self
            .format
            .decoder()
            .decode(payload, &self.columns)
            .map_err(|e| {
                warn!(error = %e, "Rejected chunk payload");
                e
            })?;

        self.push_chunk(chunk);
        Ok(())
    }

    /// Append a base64-encoded chunk payload, as embedded inline in a query
    /// response.
    ///
    /// # Errors
    /// Same as [`ResultSet::append_chunk`], plus `DecodeError` for invalid
    /// base64.
    pub fn append_base64_chunk(&mut self, encoded: &str) -> Result<()> {
        self.ensure_building("append a chunk")?;
        let payload = STANDARD
            .decode(encoded.trim())
            .map_err(DecodeError::from)?;
        self.append_chunk(&payload)
    }

    /// Append a rowset that was already parsed as part of a JSON response.
    ///
    /// # Errors
    /// Returns `ResultSetError::InvalidState` after `finish_result_set` or if
    /// this is not a JSON result set, and `DecodeError` for a malformed
    /// rowset.
    #[instrument(name = "result_set::append_json_rowset", level = "debug", skip(self, rowset))]
    pub fn append_json_rowset(&mut self, rowset: serde_json::Value) -> Result<()> {
        self.ensure_building("append a chunk")?;
        self.ensure_format(QueryResultFormat::Json)?;

        let chunk = JsonChunk::from_value(rowset, self.columns.len()).map_err(|e| {
            warn!(error = %e, "Rejected JSON rowset");
            e
        })?;

        self.push_chunk(Chunk::Json(chunk));
        Ok(())
    }

    /// Append an already materialized Arrow record batch.
    ///
    /// # Errors
    /// Returns `ResultSetError::InvalidState` after `finish_result_set` or if
    /// this is not an Arrow result set, and `DecodeError` if the batch schema
    /// does not match the column metadata.
    #[instrument(name = "result_set::append_record_batch", level = "debug", skip(self, batch))]
    pub fn append_record_batch(&mut self, batch: RecordBatch) -> Result<()> {
        self.ensure_building("append a chunk")?;
        self.ensure_format(QueryResultFormat::Arrow)?;

        let chunk = ArrowChunk::from_batch(batch, &self.columns).map_err(|e| {
            warn!(error = %e, "Rejected record batch");
            e
        })?;

        self.push_chunk(Chunk::Arrow(chunk));
        Ok(())
    }

    /// Record the total row count announced separately by the server;
    /// `finish_result_set` verifies it.
    ///
    /// # Errors
    /// Returns `ResultSetError::InvalidState` after `finish_result_set`.
    pub fn set_expected_row_count(&mut self, rows: usize) -> Result<()> {
        self.ensure_building("set the expected row count")?;
        self.expected_rows = Some(rows);
        Ok(())
    }

    /// Freeze the chunk sequence and position the cursor before the first
    /// row. A result set without rows is immediately exhausted.
    ///
    /// # Errors
    /// Returns `ResultSetError::InvalidState` if already finished, and
    /// `DecodeError::RowCountMismatch` if an expected row count was set and
    /// differs from the rows appended.
    #[instrument(name = "result_set::finish", level = "debug", skip(self))]
    pub fn finish_result_set(&mut self) -> Result<()> {
        self.ensure_building("finish the result set")?;

        if let Some(expected) = self.expected_rows {
            if expected != self.total_rows {
                warn!(
                    expected,
                    actual = self.total_rows,
                    "Row count does not match the announced total"
                );
                return Err(DecodeError::RowCountMismatch {
                    expected,
                    actual: self.total_rows,
                }
                .into());
            }
        }

        self.cursor.reset();
        self.phase = if self.total_rows == 0 {
            Phase::Exhausted
        } else {
            Phase::Consuming
        };

        debug!(
            chunks = self.chunks.len(),
            rows = self.total_rows,
            "Result set finished"
        );
        Ok(())
    }

    fn push_chunk(&mut self, chunk: Chunk) {
        let rows = chunk.row_count();
        self.chunk_rows.push(rows);
        self.total_rows += rows;
        self.chunks.push(chunk);

        debug!(
            rows,
            chunk_count = self.chunks.len(),
            total_rows = self.total_rows,
            "Appended chunk"
        );
    }

    // Cursor =====================================================================================

    /// Advance to the next row, crossing chunk boundaries as needed.
    ///
    /// Reaching the end is reported as `Ok(RowStatus::EndOfResultSet)`, not
    /// as an error, and is reported again on every later call.
    ///
    /// # Errors
    /// Returns `ResultSetError::InvalidState` before `finish_result_set`.
    pub fn next_row(&mut self) -> Result<RowStatus> {
        self.ensure_readable("advance the row")?;

        let status = self.cursor.advance_row(&self.chunk_rows);
        if status == RowStatus::EndOfResultSet {
            self.phase = Phase::Exhausted;
        }
        Ok(status)
    }

    /// Advance to the next column of the current row.
    ///
    /// # Errors
    /// Returns `ResultSetError::InvalidState` before `finish_result_set`, and
    /// `ResultSetError::OutOfRange` if no row is active or the cursor is on
    /// the last column.
    pub fn next_column(&mut self) -> Result<()> {
        self.ensure_readable("advance the column")?;
        self.cursor.advance_column(self.columns.len()).map(|_| ())
    }

    // Getters ====================================================================================

    /// Current cell as a boolean. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_bool(&self) -> Result<Option<bool>> {
        let (cell, metadata) = self.current_cell()?;
        Ok(self.converter().to_bool(&cell, metadata.column_type)?)
    }

    /// Current cell as an `i8`. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_int8(&self) -> Result<Option<i8>> {
        self.integer("int8")
    }

    /// Current cell as an `i32`. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_int32(&self) -> Result<Option<i32>> {
        self.integer("int32")
    }

    /// Current cell as an `i64`. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_int64(&self) -> Result<Option<i64>> {
        self.integer("int64")
    }

    /// Current cell as a `u8`. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_uint8(&self) -> Result<Option<u8>> {
        self.integer("uint8")
    }

    /// Current cell as a `u32`. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_uint32(&self) -> Result<Option<u32>> {
        self.integer("uint32")
    }

    /// Current cell as a `u64`. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_uint64(&self) -> Result<Option<u64>> {
        self.integer("uint64")
    }

    /// Current cell as an `f64`. `Ok(None)` for NULL.
    pub fn get_curr_cell_as_float64(&self) -> Result<Option<f64>> {
        let (cell, metadata) = self.current_cell()?;
        Ok(self.converter().to_f64(&cell, metadata.column_type)?)
    }

    /// Current cell rendered as text in storage owned by the result set.
    ///
    /// The returned reference is valid until the next call that takes the
    /// result set mutably.
    pub fn get_curr_cell_as_const_string(&mut self) -> Result<Option<&str>> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let rendered = self.render_current(&mut scratch);
        self.scratch = scratch;

        Ok(rendered?.then_some(self.scratch.as_str()))
    }

    /// Render the current cell into a caller-owned buffer, growing it when
    /// the value does not fit. The outcome reports the written length and
    /// the buffer's capacity after the write.
    ///
    /// # Errors
    /// Returns `ResultSetError::OutOfRange` if the buffer cannot grow, plus
    /// the errors every getter returns.
    pub fn get_curr_cell_as_string(&self, buffer: &mut StringBuffer) -> Result<StringWrite> {
        let mut rendered = String::new();
        if self.render_current(&mut rendered)? {
            buffer.assign(&rendered)
        } else {
            Ok(buffer.assign_null())
        }
    }

    /// Current date, time or timestamp cell as wall-clock fields. `Ok(None)`
    /// for NULL.
    pub fn get_curr_cell_as_timestamp(&self) -> Result<Option<Timestamp>> {
        let (cell, metadata) = self.current_cell()?;
        Ok(self.converter().to_timestamp(&cell, metadata)?)
    }

    /// Whether the current cell is NULL.
    pub fn is_curr_cell_null(&self) -> Result<bool> {
        let (chunk, row, column) = self.current_position()?;
        Ok(chunk.is_null(row, column))
    }

    /// Length in bytes of the current cell rendered as text. `Ok(None)` for
    /// NULL.
    pub fn get_curr_cell_strlen(&self) -> Result<Option<usize>> {
        let mut rendered = String::new();
        Ok(self
            .render_current(&mut rendered)?
            .then_some(rendered.len()))
    }

    fn integer<T: TryFrom<i128>>(&self, target: &'static str) -> Result<Option<T>> {
        let (cell, metadata) = self.current_cell()?;
        Ok(self
            .converter()
            .to_integer(&cell, metadata.column_type, target)?)
    }

    fn render_current(&self, out: &mut String) -> Result<bool> {
        let (cell, metadata) = self.current_cell()?;
        Ok(self.converter().write_string(&cell, metadata, out)?)
    }

    fn current_position(&self) -> Result<(&Chunk, usize, usize)> {
        self.ensure_readable("read a cell")?;

        let (chunk_idx, row, column) = self
            .cursor
            .position()
            .ok_or_else(|| ResultSetError::InvalidState("no current cell".to_string()))?;
        let chunk = self.chunks.get(chunk_idx).ok_or_else(|| {
            ResultSetError::InvalidState(format!("chunk {} does not exist", chunk_idx))
        })?;
        Ok((chunk, row, column))
    }

    fn current_cell(&self) -> Result<(CellValue<'_>, &ColumnMetadata)> {
        let (chunk, row, column) = self.current_position()?;
        let metadata = self.columns.get(column).ok_or_else(|| {
            ResultSetError::InvalidState(format!("column {} does not exist", column))
        })?;
        Ok((chunk.cell(row, column, metadata)?, metadata))
    }

    fn converter(&self) -> CellConverter<'_> {
        CellConverter::new(&self.output_formats, &self.timezone)
    }

    fn ensure_building(&self, action: &str) -> Result<()> {
        if self.phase == Phase::Building {
            Ok(())
        } else {
            Err(ResultSetError::InvalidState(format!(
                "cannot {} after the result set was finished",
                action
            )))
        }
    }

    fn ensure_readable(&self, action: &str) -> Result<()> {
        if self.phase == Phase::Building {
            Err(ResultSetError::InvalidState(format!(
                "cannot {} before the result set is finished",
                action
            )))
        } else {
            Ok(())
        }
    }

    fn ensure_format(&self, format: QueryResultFormat) -> Result<()> {
        if self.format == format {
            Ok(())
        } else {
            Err(ResultSetError::InvalidState(format!(
                "{} chunk appended to a {} result set",
                format, self.format
            )))
        }
    }

    // Accessors ==================================================================================

    /// Format of a Binary field.
    pub fn binary_output_format(&self) -> &str {
        self.output_formats.binary_output_format()
    }

    /// Format of a Date field.
    pub fn date_output_format(&self) -> &str {
        self.output_formats.date_output_format()
    }

    /// Format of a Time field.
    pub fn time_output_format(&self) -> &str {
        self.output_formats.time_output_format()
    }

    /// Format of a Timestamp field.
    pub fn timestamp_output_format(&self) -> &str {
        self.output_formats.timestamp_output_format()
    }

    /// Format of a Timestamp LTZ field.
    pub fn timestamp_ltz_output_format(&self) -> &str {
        self.output_formats.timestamp_ltz_output_format()
    }

    /// Format of a Timestamp NTZ field.
    pub fn timestamp_ntz_output_format(&self) -> &str {
        self.output_formats.timestamp_ntz_output_format()
    }

    /// Format of a Timestamp TZ field.
    pub fn timestamp_tz_output_format(&self) -> &str {
        self.output_formats.timestamp_tz_output_format()
    }

    pub fn output_formats(&self) -> &OutputFormatConfig {
        &self.output_formats
    }

    /// Wire format of this result set.
    pub fn query_result_format(&self) -> QueryResultFormat {
        self.format
    }

    /// Session time zone identifier.
    pub fn tz_string(&self) -> &str {
        self.timezone.tz_string()
    }

    /// Session time zone offset in minutes, biased by +1440.
    pub fn tz_offset(&self) -> i32 {
        self.timezone.offset()
    }

    pub fn total_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn total_row_count(&self) -> usize {
        self.total_rows
    }

    pub fn column_metadata(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnMetadata> {
        self.columns.get(idx)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }
}

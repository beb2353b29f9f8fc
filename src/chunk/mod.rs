//! Decoded result chunks and their wire-format decoders.
//!
//! A chunk is one memory-bounded unit of rows for all columns. Chunks come in
//! two wire formats: row-oriented JSON and columnar Arrow IPC. The format is
//! chosen once per result set through [`QueryResultFormat`]; both variants
//! expose their cells through the [`CellSource`] capability.

mod arrow;
mod json;

pub use self::arrow::{ArrowChunk, ArrowDecoder};
pub use self::json::{JsonChunk, JsonDecoder};

use crate::error::{ConfigError, ConversionError, DecodeError};
use crate::types::ColumnMetadata;
use chrono::{DateTime, NaiveDateTime};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Wire format of the chunks of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResultFormat {
    /// Columnar Apache Arrow IPC stream
    Arrow,
    /// Row-oriented JSON arrays
    Json,
}

impl QueryResultFormat {
    /// The decoder for this format.
    pub fn decoder(&self) -> &'static dyn ChunkDecoder {
        match self {
            QueryResultFormat::Arrow => &ArrowDecoder,
            QueryResultFormat::Json => &JsonDecoder,
        }
    }
}

impl FromStr for QueryResultFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrow" | "arrow_force" => Ok(QueryResultFormat::Arrow),
            "json" => Ok(QueryResultFormat::Json),
            _ => Err(ConfigError::UnknownResultFormat(s.to_string())),
        }
    }
}

impl fmt::Display for QueryResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResultFormat::Arrow => write!(f, "arrow"),
            QueryResultFormat::Json => write!(f, "json"),
        }
    }
}

/// An instant as whole seconds since the Unix epoch plus nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTime {
    /// Seconds since 1970-01-01T00:00:00Z (floor)
    pub seconds: i64,
    /// Nanoseconds within the second, always in [0, 1e9)
    pub nanos: u32,
}

impl EpochTime {
    /// Build from a total number of nanoseconds since the epoch.
    pub fn from_nanos(total: i128) -> Option<Self> {
        let seconds = i64::try_from(total.div_euclid(NANOS_PER_SECOND)).ok()?;
        let nanos = total.rem_euclid(NANOS_PER_SECOND) as u32;
        Some(Self { seconds, nanos })
    }

    /// Build from an integer holding `10^-scale` second units.
    pub fn from_scaled(value: i128, scale: u32) -> Option<Self> {
        Self::from_nanos(scaled_to_nanos(value, scale)?)
    }

    /// Build from whole seconds and a separate nanosecond fraction.
    pub fn from_parts(seconds: i64, fraction_nanos: i64) -> Option<Self> {
        Self::from_nanos(seconds as i128 * NANOS_PER_SECOND + fraction_nanos as i128)
    }

    /// The instant as a naive UTC date-time, if representable.
    pub fn to_naive_utc(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp(self.seconds, self.nanos).map(|dt| dt.naive_utc())
    }
}

/// Convert an integer in `10^-scale` units to nanoseconds.
pub(crate) fn scaled_to_nanos(value: i128, scale: u32) -> Option<i128> {
    let scale = scale.min(9);
    value.checked_mul(10_i128.pow(9 - scale))
}

/// A decoded cell, normalized per semantic type independent of wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue<'a> {
    /// SQL NULL
    Null,
    /// BOOLEAN
    Boolean(bool),
    /// NUMBER as an unscaled integer and its scale
    Fixed { unscaled: i128, scale: u32 },
    /// FLOAT / DOUBLE
    Real(f64),
    /// Text, also used for semi-structured values
    Text(Cow<'a, str>),
    /// BINARY
    Binary(Cow<'a, [u8]>),
    /// DATE as days since the epoch
    Date { days: i32 },
    /// TIME as nanoseconds since midnight
    Time { nanos: i64 },
    /// Any timestamp; `tz_offset` is the biased per-value offset of
    /// TIMESTAMP_TZ values
    Timestamp {
        epoch: EpochTime,
        tz_offset: Option<i32>,
    },
}

impl CellValue<'_> {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Read access to the cells of a decoded chunk.
pub trait CellSource {
    /// Number of rows in the chunk.
    fn row_count(&self) -> usize;

    /// Number of columns in the chunk.
    fn column_count(&self) -> usize;

    /// Decode the cell at (`row`, `column`) according to `metadata`.
    ///
    /// Callers guarantee `row < row_count()` and `column < column_count()`.
    fn cell(
        &self,
        row: usize,
        column: usize,
        metadata: &ColumnMetadata,
    ) -> Result<CellValue<'_>, ConversionError>;

    /// Whether the cell at (`row`, `column`) is NULL.
    fn is_null(&self, row: usize, column: usize) -> bool;
}

/// Decodes a raw payload into a chunk.
pub trait ChunkDecoder {
    /// Decode `payload` for a result set described by `columns`.
    ///
    /// # Errors
    /// Returns `DecodeError` for malformed payloads and payloads whose column
    /// count differs from `columns.len()`.
    fn decode(&self, payload: &[u8], columns: &[ColumnMetadata]) -> Result<Chunk, DecodeError>;
}

/// A decoded chunk in one of the supported wire formats.
#[derive(Debug)]
pub enum Chunk {
    /// Row-oriented chunk
    Json(JsonChunk),
    /// Columnar chunk
    Arrow(ArrowChunk),
}

impl Chunk {
    /// Wire format this chunk was decoded from.
    pub fn format(&self) -> QueryResultFormat {
        match self {
            Chunk::Json(_) => QueryResultFormat::Json,
            Chunk::Arrow(_) => QueryResultFormat::Arrow,
        }
    }
}

impl CellSource for Chunk {
    fn row_count(&self) -> usize {
        match self {
            Chunk::Json(chunk) => chunk.row_count(),
            Chunk::Arrow(chunk) => chunk.row_count(),
        }
    }

    fn column_count(&self) -> usize {
        match self {
            Chunk::Json(chunk) => chunk.column_count(),
            Chunk::Arrow(chunk) => chunk.column_count(),
        }
    }

    fn cell(
        &self,
        row: usize,
        column: usize,
        metadata: &ColumnMetadata,
    ) -> Result<CellValue<'_>, ConversionError> {
        match self {
            Chunk::Json(chunk) => chunk.cell(row, column, metadata),
            Chunk::Arrow(chunk) => chunk.cell(row, column, metadata),
        }
    }

    fn is_null(&self, row: usize, column: usize) -> bool {
        match self {
            Chunk::Json(chunk) => chunk.is_null(row, column),
            Chunk::Arrow(chunk) => chunk.is_null(row, column),
        }
    }
}

//! Row-oriented JSON chunks.
//!
//! A JSON chunk is an array of rows, each row an array of cells. Scalar cells
//! arrive as strings in the server's canonical text encoding (e.g. `"12.50"`
//! for NUMBER(10,2), `"1700000000.123000000"` for timestamps,
//! `"1700000000.000000000 960"` for TIMESTAMP_TZ) and are parsed lazily on
//! access. `null` marks SQL NULL.
//!
//! ```json
//! [["1", "alice", null], ["2", "bob", "2024-01-01"]]
//! ```

use super::{CellSource, CellValue, Chunk, ChunkDecoder, EpochTime};
use crate::error::{ConversionError, DecodeError};
use crate::format::MAX_BIASED_OFFSET;
use crate::types::{ColumnMetadata, ColumnType};
use chrono::NaiveDate;
use serde::de::{self, DeserializeSeed, Deserializer, SeqAccess, Visitor};
use serde_json::Value;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;

/// Decoder for row-oriented JSON payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ChunkDecoder for JsonDecoder {
    fn decode(&self, payload: &[u8], columns: &[ColumnMetadata]) -> Result<Chunk, DecodeError> {
        JsonChunk::from_slice(payload, columns.len()).map(Chunk::Json)
    }
}

/// A decoded JSON chunk, stored row-major.
#[derive(Debug, Clone)]
pub struct JsonChunk {
    rows: Vec<Vec<Value>>,
    column_count: usize,
}

impl JsonChunk {
    /// Parse a raw JSON rowset.
    ///
    /// # Errors
    /// Returns `DecodeError::ColumnCountMismatch` if any row's width differs
    /// from `column_count`, and `DecodeError::JsonError` for malformed JSON.
    pub fn from_slice(payload: &[u8], column_count: usize) -> Result<Self, DecodeError> {
        let mismatch = Cell::new(None);
        let mut deserializer = serde_json::Deserializer::from_slice(payload);
        let rows = RowsetSeed {
            column_count,
            mismatch: &mismatch,
        }
        .deserialize(&mut deserializer)
        .and_then(|rows| deserializer.end().map(|_| rows));

        Self::finish(rows, column_count, &mismatch)
    }

    /// Build a chunk from a rowset already parsed into a JSON value, as
    /// embedded inline in a query response.
    ///
    /// # Errors
    /// Same as [`JsonChunk::from_slice`].
    pub fn from_value(rowset: Value, column_count: usize) -> Result<Self, DecodeError> {
        let mismatch = Cell::new(None);
        let rows = RowsetSeed {
            column_count,
            mismatch: &mismatch,
        }
        .deserialize(rowset);

        Self::finish(rows, column_count, &mismatch)
    }

    fn finish(
        rows: Result<Vec<Vec<Value>>, serde_json::Error>,
        column_count: usize,
        mismatch: &Cell<Option<usize>>,
    ) -> Result<Self, DecodeError> {
        match (rows, mismatch.get()) {
            (Ok(rows), _) => Ok(Self { rows, column_count }),
            (Err(_), Some(actual)) => Err(DecodeError::ColumnCountMismatch {
                expected: column_count,
                actual,
            }),
            (Err(e), None) => Err(e.into()),
        }
    }

    /// Raw JSON value of a cell.
    pub fn raw(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

impl CellSource for JsonChunk {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn cell(
        &self,
        row: usize,
        column: usize,
        metadata: &ColumnMetadata,
    ) -> Result<CellValue<'_>, ConversionError> {
        match self.raw(row, column) {
            Some(value) => decode_cell(value, metadata),
            None => Ok(CellValue::Null),
        }
    }

    fn is_null(&self, row: usize, column: usize) -> bool {
        self.raw(row, column).map_or(true, Value::is_null)
    }
}

/// Seed for the outer rowset array. Records the width of the first row that
/// disagrees with `column_count` so the caller can report it precisely.
struct RowsetSeed<'a> {
    column_count: usize,
    mismatch: &'a Cell<Option<usize>>,
}

impl<'de, 'a> DeserializeSeed<'de> for RowsetSeed<'a> {
    type Value = Vec<Vec<Value>>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(RowsetVisitor {
            column_count: self.column_count,
            mismatch: self.mismatch,
        })
    }
}

struct RowsetVisitor<'a> {
    column_count: usize,
    mismatch: &'a Cell<Option<usize>>,
}

impl<'de, 'a> Visitor<'de> for RowsetVisitor<'a> {
    type Value = Vec<Vec<Value>>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("array of rows")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut rows = Vec::with_capacity(seq.size_hint().unwrap_or(0));

        while let Some(row) = seq.next_element_seed(RowSeed {
            column_count: self.column_count,
            mismatch: self.mismatch,
        })? {
            rows.push(row);
        }

        Ok(rows)
    }
}

struct RowSeed<'a> {
    column_count: usize,
    mismatch: &'a Cell<Option<usize>>,
}

impl<'de, 'a> DeserializeSeed<'de> for RowSeed<'a> {
    type Value = Vec<Value>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(RowVisitor {
            column_count: self.column_count,
            mismatch: self.mismatch,
        })
    }
}

struct RowVisitor<'a> {
    column_count: usize,
    mismatch: &'a Cell<Option<usize>>,
}

impl<'de, 'a> Visitor<'de> for RowVisitor<'a> {
    type Value = Vec<Value>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "row array of {} cells", self.column_count)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut cells = Vec::with_capacity(self.column_count);

        while let Some(value) = seq.next_element::<Value>()? {
            cells.push(value);
        }

        if cells.len() != self.column_count {
            self.mismatch.set(Some(cells.len()));
            return Err(de::Error::invalid_length(cells.len(), &self));
        }

        Ok(cells)
    }
}

/// Parse a decimal string into an integer holding `10^-scale` units.
///
/// Digits beyond `scale` are truncated; missing digits are zero-filled.
pub(crate) fn parse_decimal(text: &str, scale: u32) -> Option<i128> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut value: i128 = 0;
    for b in int_part.bytes() {
        value = value.checked_mul(10)?.checked_add((b - b'0') as i128)?;
    }

    let mut frac = frac_part.bytes();
    for _ in 0..scale {
        let digit = frac.next().map_or(0, |b| (b - b'0') as i128);
        value = value.checked_mul(10)?.checked_add(digit)?;
    }

    Some(if negative { -value } else { value })
}

fn decode_cell<'a>(
    value: &'a Value,
    metadata: &ColumnMetadata,
) -> Result<CellValue<'a>, ConversionError> {
    let column_type = metadata.column_type;
    let invalid = |message: String| ConversionError::InvalidValue {
        column_type,
        message,
    };

    if value.is_null() {
        return Ok(CellValue::Null);
    }

    match column_type {
        ColumnType::Boolean => {
            let parsed = match value {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Some(false),
                    Some(1) => Some(true),
                    _ => None,
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" => Some(true),
                    "0" | "false" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            parsed
                .map(CellValue::Boolean)
                .ok_or_else(|| invalid(format!("'{}' is not a boolean", value)))
        }

        ColumnType::Fixed => {
            let scale = metadata.fixed_scale();
            let text = scalar_text(value).ok_or_else(|| invalid(value.to_string()))?;
            let unscaled = parse_decimal(&text, scale)
                .ok_or_else(|| invalid(format!("'{}' is not a decimal number", text)))?;
            Ok(CellValue::Fixed { unscaled, scale })
        }

        ColumnType::Real => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .map(CellValue::Real)
                .ok_or_else(|| invalid(format!("'{}' is not a floating point number", value)))
        }

        ColumnType::Text | ColumnType::Variant | ColumnType::Object | ColumnType::Array => {
            Ok(match value {
                Value::String(s) => CellValue::Text(Cow::Borrowed(s.as_str())),
                other => CellValue::Text(Cow::Owned(other.to_string())),
            })
        }

        ColumnType::Binary => {
            let text = value
                .as_str()
                .ok_or_else(|| invalid("binary values must be hex strings".to_string()))?;
            let bytes = hex::decode(text).map_err(|e| invalid(e.to_string()))?;
            Ok(CellValue::Binary(Cow::Owned(bytes)))
        }

        ColumnType::Date => {
            let text = scalar_text(value).ok_or_else(|| invalid(value.to_string()))?;
            parse_date(&text)
                .map(|days| CellValue::Date { days })
                .ok_or_else(|| invalid(format!("'{}' is not a date", text)))
        }

        ColumnType::Time => {
            let text = scalar_text(value).ok_or_else(|| invalid(value.to_string()))?;
            parse_decimal(&text, 9)
                .and_then(|nanos| i64::try_from(nanos).ok())
                .map(|nanos| CellValue::Time { nanos })
                .ok_or_else(|| invalid(format!("'{}' is not a time of day", text)))
        }

        ColumnType::TimestampNtz | ColumnType::TimestampLtz => {
            let text = scalar_text(value).ok_or_else(|| invalid(value.to_string()))?;
            let epoch = parse_decimal(&text, 9)
                .and_then(EpochTime::from_nanos)
                .ok_or_else(|| invalid(format!("'{}' is not an epoch timestamp", text)))?;
            Ok(CellValue::Timestamp {
                epoch,
                tz_offset: None,
            })
        }

        ColumnType::TimestampTz => {
            let text = scalar_text(value).ok_or_else(|| invalid(value.to_string()))?;
            let mut parts = text.split_whitespace();
            let epoch = parts
                .next()
                .and_then(|s| parse_decimal(s, 9))
                .and_then(EpochTime::from_nanos)
                .ok_or_else(|| invalid(format!("'{}' is not an epoch timestamp", text)))?;
            let offset = parts
                .next()
                .and_then(|s| s.parse::<i32>().ok())
                .filter(|o| (0..=MAX_BIASED_OFFSET).contains(o))
                .ok_or_else(|| invalid(format!("'{}' has no valid time zone offset", text)))?;
            Ok(CellValue::Timestamp {
                epoch,
                tz_offset: Some(offset),
            })
        }
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    }
}

/// Days since the epoch, either as an integer or `YYYY-MM-DD`.
fn parse_date(text: &str) -> Option<i32> {
    let text = text.trim();
    if let Ok(days) = text.parse::<i32>() {
        return Some(days);
    }

    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    i32::try_from(date.signed_duration_since(epoch).num_days()).ok()
}

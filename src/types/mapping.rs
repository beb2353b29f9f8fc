//! Semantic column types and their accepted Arrow physical layouts.

use arrow_schema::{DataType, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared logical type of a result column, independent of wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// BOOLEAN
    Boolean,
    /// NUMBER(p, s)
    Fixed,
    /// FLOAT / DOUBLE
    Real,
    /// VARCHAR / CHAR
    Text,
    /// BINARY
    Binary,
    /// DATE
    Date,
    /// TIME(s)
    Time,
    /// TIMESTAMP without time zone
    TimestampNtz,
    /// TIMESTAMP with local (session) time zone
    TimestampLtz,
    /// TIMESTAMP with per-value time zone offset
    TimestampTz,
    /// Semi-structured VARIANT, surfaced as JSON text
    Variant,
    /// Semi-structured OBJECT, surfaced as JSON text
    Object,
    /// Semi-structured ARRAY, surfaced as JSON text
    Array,
}

impl ColumnType {
    /// Whether values of this type are carried as text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            ColumnType::Text | ColumnType::Variant | ColumnType::Object | ColumnType::Array
        )
    }

    /// Whether this is one of the timestamp variants.
    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            ColumnType::TimestampNtz | ColumnType::TimestampLtz | ColumnType::TimestampTz
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Fixed => "FIXED",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Binary => "BINARY",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::TimestampNtz => "TIMESTAMP_NTZ",
            ColumnType::TimestampLtz => "TIMESTAMP_LTZ",
            ColumnType::TimestampTz => "TIMESTAMP_TZ",
            ColumnType::Variant => "VARIANT",
            ColumnType::Object => "OBJECT",
            ColumnType::Array => "ARRAY",
        };
        f.write_str(name)
    }
}

/// Decides which Arrow physical types can carry each semantic type.
pub struct TypeMapper;

impl TypeMapper {
    /// Check whether an Arrow field of `arrow_type` can carry values of
    /// `column_type`.
    ///
    /// Fixed-point, time and timestamp columns may arrive either as native
    /// Arrow types or as scaled integers whose scale comes from the column
    /// metadata. Timestamps with a large scale arrive as an
    /// `{epoch, fraction}` struct, and TIMESTAMP_TZ additionally carries a
    /// biased `timezone` offset field.
    pub fn accepts(column_type: ColumnType, arrow_type: &DataType) -> bool {
        match column_type {
            ColumnType::Boolean => matches!(arrow_type, DataType::Boolean),

            ColumnType::Fixed => matches!(
                arrow_type,
                DataType::Int8
                    | DataType::Int16
                    | DataType::Int32
                    | DataType::Int64
                    | DataType::Decimal128(_, _)
            ),

            ColumnType::Real => matches!(arrow_type, DataType::Float32 | DataType::Float64),

            ColumnType::Text | ColumnType::Variant | ColumnType::Object | ColumnType::Array => {
                matches!(arrow_type, DataType::Utf8 | DataType::LargeUtf8)
            }

            ColumnType::Binary => matches!(
                arrow_type,
                DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_)
            ),

            ColumnType::Date => matches!(arrow_type, DataType::Date32 | DataType::Date64),

            ColumnType::Time => matches!(
                arrow_type,
                DataType::Int32
                    | DataType::Int64
                    | DataType::Time32(_)
                    | DataType::Time64(_)
            ),

            ColumnType::TimestampNtz | ColumnType::TimestampLtz => match arrow_type {
                DataType::Int64 | DataType::Timestamp(_, _) => true,
                DataType::Struct(fields) => {
                    fields.len() == 2
                        && fields.find("epoch").is_some()
                        && fields.find("fraction").is_some()
                }
                _ => false,
            },

            ColumnType::TimestampTz => match arrow_type {
                DataType::Struct(fields) => {
                    (fields.len() == 2 || fields.len() == 3)
                        && fields.find("epoch").is_some()
                        && fields.find("timezone").is_some()
                        && (fields.len() == 2 || fields.find("fraction").is_some())
                }
                _ => false,
            },
        }
    }

    /// Number of digits after the decimal point implied by an Arrow time unit.
    pub fn time_unit_scale(unit: &TimeUnit) -> u32 {
        match unit {
            TimeUnit::Second => 0,
            TimeUnit::Millisecond => 3,
            TimeUnit::Microsecond => 6,
            TimeUnit::Nanosecond => 9,
        }
    }
}

//! Column metadata describing the shape of a result set.

use crate::error::DecodeError;
use crate::types::ColumnType;
use serde::Deserialize;

/// Default fractional-second scale for time and timestamp columns.
pub const DEFAULT_TIME_SCALE: u32 = 9;

/// Column metadata from the server `rowtype` description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Declared semantic type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether the column is nullable
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Precision for fixed-point columns
    #[serde(default)]
    pub precision: Option<u32>,
    /// Scale for fixed-point, time and timestamp columns
    #[serde(default)]
    pub scale: Option<u32>,
    /// Maximum length in characters for text columns
    #[serde(default)]
    pub length: Option<u64>,
    /// Maximum length in bytes for text and binary columns
    #[serde(default)]
    pub byte_length: Option<u64>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMetadata {
    /// Create metadata for a nullable column with no precision/scale.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            precision: None,
            scale: None,
            length: None,
            byte_length: None,
        }
    }

    /// Set precision and scale.
    pub fn with_precision_scale(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Set scale only (time and timestamp columns).
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Scale used for fixed-point values, 0 when unspecified.
    pub fn fixed_scale(&self) -> u32 {
        self.scale.unwrap_or(0)
    }

    /// Fractional-second digits used for time and timestamp values.
    pub fn time_scale(&self) -> u32 {
        self.scale.unwrap_or(DEFAULT_TIME_SCALE).min(DEFAULT_TIME_SCALE)
    }
}

/// Extract column metadata from the `rowtype` array of a query response.
///
/// # Errors
/// Returns `DecodeError::JsonError` if an entry is missing `name` or `type`
/// or names an unknown type.
pub fn columns_from_rowtype(rowtype: &serde_json::Value) -> Result<Vec<ColumnMetadata>, DecodeError> {
    let entries = rowtype
        .as_array()
        .ok_or_else(|| DecodeError::MalformedPayload("rowtype must be an array".to_string()))?;

    entries
        .iter()
        .map(|entry| ColumnMetadata::deserialize(entry).map_err(DecodeError::from))
        .collect()
}

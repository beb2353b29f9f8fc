//! Output format configuration.
//!
//! Holds the session's output format patterns per semantic category. The
//! configuration is immutable once built and shared by every conversion.

use crate::error::ConfigError;
use crate::format::pattern::FormatPattern;
use crate::types::ColumnType;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Default BINARY_OUTPUT_FORMAT
pub const DEFAULT_BINARY_FORMAT: &str = "HEX";
/// Default DATE_OUTPUT_FORMAT
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
/// Default TIME_OUTPUT_FORMAT
pub const DEFAULT_TIME_FORMAT: &str = "HH24:MI:SS";
/// Default TIMESTAMP_OUTPUT_FORMAT
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "YYYY-MM-DD HH24:MI:SS.FF3 TZHTZM";
/// Default TIMESTAMP_NTZ_OUTPUT_FORMAT
pub const DEFAULT_TIMESTAMP_NTZ_FORMAT: &str = "YYYY-MM-DD HH24:MI:SS.FF3";

/// How BINARY values are rendered as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    /// Upper-case hexadecimal
    Hex,
    /// Standard base64 with padding
    Base64,
    /// Bytes interpreted as UTF-8 (invalid sequences replaced)
    Utf8,
}

impl FromStr for BinaryFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HEX" => Ok(BinaryFormat::Hex),
            "BASE64" => Ok(BinaryFormat::Base64),
            "UTF8" | "UTF-8" => Ok(BinaryFormat::Utf8),
            _ => Err(ConfigError::UnsupportedBinaryFormat(s.to_string())),
        }
    }
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryFormat::Hex => write!(f, "HEX"),
            BinaryFormat::Base64 => write!(f, "BASE64"),
            BinaryFormat::Utf8 => write!(f, "UTF8"),
        }
    }
}

/// Output format patterns for every semantic category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormatConfig {
    binary: BinaryFormat,
    binary_source: String,
    date: FormatPattern,
    time: FormatPattern,
    timestamp: FormatPattern,
    timestamp_ltz: FormatPattern,
    timestamp_ntz: FormatPattern,
    timestamp_tz: FormatPattern,
}

impl OutputFormatConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> OutputFormatBuilder {
        OutputFormatBuilder::new()
    }

    /// Build a configuration from the session parameter list of a query
    /// response, e.g. `[{"name": "DATE_OUTPUT_FORMAT", "value": "DD/MM/YYYY"}]`.
    ///
    /// Parameters unrelated to output formatting are ignored; categories that
    /// are not mentioned keep their defaults.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidParameter` for entries that are not
    /// `{name, value}` objects and `ConfigError::UnsupportedBinaryFormat` for
    /// an unknown binary format.
    pub fn from_session_parameters(parameters: &serde_json::Value) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct SessionParameter {
            name: String,
            value: serde_json::Value,
        }

        let entries = parameters.as_array().ok_or_else(|| {
            ConfigError::InvalidParameter("parameters must be an array".to_string())
        })?;

        let mut builder = OutputFormatBuilder::new();
        for entry in entries {
            let param = SessionParameter::deserialize(entry)
                .map_err(|e| ConfigError::InvalidParameter(e.to_string()))?;
            let Some(value) = param.value.as_str() else {
                continue;
            };

            builder = match param.name.to_ascii_uppercase().as_str() {
                "BINARY_OUTPUT_FORMAT" => builder.binary(value),
                "DATE_OUTPUT_FORMAT" => builder.date(value),
                "TIME_OUTPUT_FORMAT" => builder.time(value),
                "TIMESTAMP_OUTPUT_FORMAT" => builder.timestamp(value),
                "TIMESTAMP_LTZ_OUTPUT_FORMAT" => builder.timestamp_ltz(value),
                "TIMESTAMP_NTZ_OUTPUT_FORMAT" => builder.timestamp_ntz(value),
                "TIMESTAMP_TZ_OUTPUT_FORMAT" => builder.timestamp_tz(value),
                _ => builder,
            };
        }

        builder.build()
    }

    /// Format of a Binary field.
    pub fn binary_output_format(&self) -> &str {
        &self.binary_source
    }

    /// Format of a Date field.
    pub fn date_output_format(&self) -> &str {
        self.date.as_str()
    }

    /// Format of a Time field.
    pub fn time_output_format(&self) -> &str {
        self.time.as_str()
    }

    /// Format of a Timestamp field.
    pub fn timestamp_output_format(&self) -> &str {
        self.timestamp.as_str()
    }

    /// Format of a Timestamp LTZ field.
    pub fn timestamp_ltz_output_format(&self) -> &str {
        self.timestamp_ltz.as_str()
    }

    /// Format of a Timestamp NTZ field.
    pub fn timestamp_ntz_output_format(&self) -> &str {
        self.timestamp_ntz.as_str()
    }

    /// Format of a Timestamp TZ field.
    pub fn timestamp_tz_output_format(&self) -> &str {
        self.timestamp_tz.as_str()
    }

    /// Parsed binary format.
    pub fn binary_format(&self) -> BinaryFormat {
        self.binary
    }

    /// Pattern used to render values of `column_type`, or `None` for types
    /// that are not rendered through a pattern.
    ///
    /// An empty type-specific timestamp pattern falls back to the generic
    /// timestamp pattern.
    pub fn pattern_for(&self, column_type: ColumnType) -> Option<&FormatPattern> {
        let specific = match column_type {
            ColumnType::Date => return Some(&self.date),
            ColumnType::Time => return Some(&self.time),
            ColumnType::TimestampLtz => &self.timestamp_ltz,
            ColumnType::TimestampNtz => &self.timestamp_ntz,
            ColumnType::TimestampTz => &self.timestamp_tz,
            _ => return None,
        };

        if specific.is_empty() {
            Some(&self.timestamp)
        } else {
            Some(specific)
        }
    }
}

impl Default for OutputFormatConfig {
    fn default() -> Self {
        Self {
            binary: BinaryFormat::Hex,
            binary_source: DEFAULT_BINARY_FORMAT.to_string(),
            date: FormatPattern::parse(DEFAULT_DATE_FORMAT),
            time: FormatPattern::parse(DEFAULT_TIME_FORMAT),
            timestamp: FormatPattern::parse(DEFAULT_TIMESTAMP_FORMAT),
            timestamp_ltz: FormatPattern::parse(""),
            timestamp_ntz: FormatPattern::parse(DEFAULT_TIMESTAMP_NTZ_FORMAT),
            timestamp_tz: FormatPattern::parse(""),
        }
    }
}

/// Builder for [`OutputFormatConfig`].
#[derive(Debug, Clone)]
pub struct OutputFormatBuilder {
    binary: String,
    date: String,
    time: String,
    timestamp: String,
    timestamp_ltz: String,
    timestamp_ntz: String,
    timestamp_tz: String,
}

impl OutputFormatBuilder {
    /// Create a builder holding the default patterns.
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY_FORMAT.to_string(),
            date: DEFAULT_DATE_FORMAT.to_string(),
            time: DEFAULT_TIME_FORMAT.to_string(),
            timestamp: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            timestamp_ltz: String::new(),
            timestamp_ntz: DEFAULT_TIMESTAMP_NTZ_FORMAT.to_string(),
            timestamp_tz: String::new(),
        }
    }

    /// Set the binary output format (`HEX`, `BASE64` or `UTF8`).
    pub fn binary(mut self, format: impl Into<String>) -> Self {
        self.binary = format.into();
        self
    }

    /// Set the date output pattern.
    pub fn date(mut self, pattern: impl Into<String>) -> Self {
        self.date = pattern.into();
        self
    }

    /// Set the time output pattern.
    pub fn time(mut self, pattern: impl Into<String>) -> Self {
        self.time = pattern.into();
        self
    }

    /// Set the generic timestamp output pattern.
    pub fn timestamp(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp = pattern.into();
        self
    }

    /// Set the TIMESTAMP_LTZ output pattern.
    pub fn timestamp_ltz(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_ltz = pattern.into();
        self
    }

    /// Set the TIMESTAMP_NTZ output pattern.
    pub fn timestamp_ntz(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_ntz = pattern.into();
        self
    }

    /// Set the TIMESTAMP_TZ output pattern.
    pub fn timestamp_tz(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_tz = pattern.into();
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::UnsupportedBinaryFormat` for an unknown binary format.
    pub fn build(self) -> Result<OutputFormatConfig, ConfigError> {
        Ok(OutputFormatConfig {
            binary: self.binary.parse()?,
            binary_source: self.binary,
            date: FormatPattern::parse(&self.date),
            time: FormatPattern::parse(&self.time),
            timestamp: FormatPattern::parse(&self.timestamp),
            timestamp_ltz: FormatPattern::parse(&self.timestamp_ltz),
            timestamp_ntz: FormatPattern::parse(&self.timestamp_ntz),
            timestamp_tz: FormatPattern::parse(&self.timestamp_tz),
        })
    }
}

impl Default for OutputFormatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

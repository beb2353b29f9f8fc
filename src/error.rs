//! Error types for chunkset-rs.
//!
//! Errors are organized by functional area and composed into the top-level
//! [`ResultSetError`]. Every error maps to an [`ErrorKind`] and to a C-style
//! [`StatusCode`] so callers driving the polling API can dispatch on a code.

use crate::types::ColumnType;
use std::fmt;
use thiserror::Error;

/// Top-level error type returned by result set operations.
#[derive(Error, Debug)]
pub enum ResultSetError {
    /// Operation not allowed in the current lifecycle state
    #[error("Invalid result set state: {0}")]
    InvalidState(String),

    /// Cursor advance past the available rows/columns, or an unresolvable
    /// buffer capacity request
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Chunk decoding errors
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Cell conversion errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Time zone or output format configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File transfer metadata errors
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Errors raised while decoding a raw chunk payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload row or batch width disagrees with the column metadata
    #[error("Column count mismatch: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// Payload is not well-formed for its wire format
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Arrow field physical type cannot carry the declared column type
    #[error("Column {column} declared as {column_type} cannot be read from Arrow type {arrow_type}")]
    UnsupportedArrowType {
        column: usize,
        column_type: ColumnType,
        arrow_type: String,
    },

    /// Announced row count disagrees with the rows actually appended
    #[error("Expected {expected} rows but {actual} were appended")]
    RowCountMismatch { expected: usize, actual: usize },

    /// Arrow IPC error
    #[error("Arrow error: {0}")]
    ArrowError(String),

    /// JSON parse error
    #[error("JSON error: {0}")]
    JsonError(String),
}

/// Errors raised while converting a cell to a requested representation.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Requested representation is incompatible with the declared column type
    #[error("Cannot convert {column_type} value to {target}")]
    TypeMismatch {
        column_type: ColumnType,
        target: &'static str,
    },

    /// Value does not fit into the requested representation
    #[error("Value {value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// Stored cell text cannot be parsed as the declared column type
    #[error("Invalid {column_type} value: {message}")]
    InvalidValue {
        column_type: ColumnType,
        message: String,
    },
}

/// Errors in time zone or output format configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Time zone identifier not recognized
    #[error("Unknown time zone '{0}'")]
    UnknownTimezone(String),

    /// Biased offset outside [0, 2880]
    #[error("Time zone offset {0} is outside the valid range [0, 2880]")]
    OffsetOutOfRange(i32),

    /// Unsupported binary output format
    #[error("Unsupported binary output format '{0}'")]
    UnsupportedBinaryFormat(String),

    /// Unknown query result format tag
    #[error("Unknown query result format '{0}'")]
    UnknownResultFormat(String),

    /// Invalid session parameter entry
    #[error("Invalid session parameter: {0}")]
    InvalidParameter(String),
}

/// Errors related to file transfer metadata invariants.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Staged size differs from source size although no compression applies
    #[error("Staged file size {staged} differs from source size {source_size} without compression")]
    StagedSizeMismatch { staged: u64, source_size: u64 },

    /// Digest requested for bytes that are not the staged upload
    #[error("Digest input has {actual} bytes, staged upload has {expected}")]
    DigestInputMismatch { expected: u64, actual: u64 },

    /// Unknown compression type name
    #[error("Unknown compression type '{0}'")]
    UnknownCompression(String),
}

/// Error category as seen by callers of the polling API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation invalid in the current lifecycle state
    State,
    /// Malformed payload or column count mismatch
    Decode,
    /// Cursor or buffer out of range
    OutOfRange,
    /// Incompatible declared type
    TypeMismatch,
    /// Value outside the target range
    Range,
    /// Invalid configuration
    Config,
}

/// C-style status codes for the polling API.
///
/// `EndOfResultSet` is a terminal signal, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Success
    Success = 0,
    /// Row cursor moved past the last row
    EndOfResultSet = 1,
    /// Invalid lifecycle state
    InvalidState = 2,
    /// Decode failure
    DecodeFailure = 3,
    /// Out of range
    OutOfRange = 4,
    /// Type mismatch
    TypeMismatch = 5,
    /// Value out of range for the target type
    RangeFailure = 6,
    /// Invalid configuration
    InvalidConfig = 7,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Success => write!(f, "SUCCESS"),
            StatusCode::EndOfResultSet => write!(f, "EOF"),
            StatusCode::InvalidState => write!(f, "INVALID_STATE"),
            StatusCode::DecodeFailure => write!(f, "DECODE_FAILURE"),
            StatusCode::OutOfRange => write!(f, "OUT_OF_RANGE"),
            StatusCode::TypeMismatch => write!(f, "TYPE_MISMATCH"),
            StatusCode::RangeFailure => write!(f, "RANGE_FAILURE"),
            StatusCode::InvalidConfig => write!(f, "INVALID_CONFIG"),
        }
    }
}

impl From<ErrorKind> for StatusCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::State => StatusCode::InvalidState,
            ErrorKind::Decode => StatusCode::DecodeFailure,
            ErrorKind::OutOfRange => StatusCode::OutOfRange,
            ErrorKind::TypeMismatch => StatusCode::TypeMismatch,
            ErrorKind::Range => StatusCode::RangeFailure,
            ErrorKind::Config => StatusCode::InvalidConfig,
        }
    }
}

impl ResultSetError {
    /// Error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResultSetError::InvalidState(_) => ErrorKind::State,
            ResultSetError::OutOfRange(_) => ErrorKind::OutOfRange,
            ResultSetError::Decode(_) => ErrorKind::Decode,
            ResultSetError::Conversion(e) => e.kind(),
            ResultSetError::Config(_) => ErrorKind::Config,
            ResultSetError::Transfer(_) => ErrorKind::State,
        }
    }

    /// Map to a polling API status code.
    pub fn status_code(&self) -> StatusCode {
        self.kind().into()
    }
}

impl ConversionError {
    /// Error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ConversionError::OutOfRange { .. } => ErrorKind::Range,
            // Malformed cell text is a payload problem surfacing lazily
            ConversionError::InvalidValue { .. } => ErrorKind::Decode,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ResultSetError>;

// Conversions from external error types
impl From<arrow::error::ArrowError> for DecodeError {
    fn from(err: arrow::error::ArrowError) -> Self {
        DecodeError::ArrowError(err.to_string())
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::JsonError(err.to_string())
    }
}

impl From<base64::DecodeError> for DecodeError {
    fn from(err: base64::DecodeError) -> Self {
        DecodeError::MalformedPayload(format!("invalid base64: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ColumnCountMismatch {
            expected: 3,
            actual: 2,
        };
        assert!(err.to_string().contains("expected 3"));
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn test_conversion_error_kinds() {
        let err = ConversionError::TypeMismatch {
            column_type: ColumnType::Date,
            target: "int8",
        };
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.to_string().contains("DATE"));

        let err = ConversionError::OutOfRange {
            value: "200".to_string(),
            target: "int8",
        };
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn test_status_code_mapping() {
        let err = ResultSetError::InvalidState("append after finish".to_string());
        assert_eq!(err.status_code(), StatusCode::InvalidState);

        let err: ResultSetError = DecodeError::MalformedPayload("bad".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.status_code(), StatusCode::DecodeFailure);

        let err: ResultSetError = ConversionError::OutOfRange {
            value: "300".to_string(),
            target: "uint8",
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::RangeFailure);
    }

    #[test]
    fn test_status_code_display() {
        assert_eq!(StatusCode::Success.to_string(), "SUCCESS");
        assert_eq!(StatusCode::EndOfResultSet.to_string(), "EOF");
        assert_eq!(StatusCode::TypeMismatch.to_string(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownTimezone("Mars/Olympus".to_string());
        assert!(err.to_string().contains("Mars/Olympus"));
    }
}

//! # chunkset-rs
//!
//! Chunked query result-set engine for database client drivers.
//!
//! A server streams a query result as a sequence of chunks, each either a
//! JSON rowset or an Apache Arrow IPC stream. This library accumulates the
//! chunks into a [`ResultSet`], then exposes them through a row/column cursor
//! with typed getters that apply the session's output formats and time zone.
//!
//! ## Example
//!
//! ```
//! use chunkset_rs::{ColumnMetadata, ColumnType, QueryResultFormat, ResultSet, RowStatus};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let columns = vec![
//!     ColumnMetadata::new("ID", ColumnType::Fixed),
//!     ColumnMetadata::new("CREATED", ColumnType::TimestampNtz).with_scale(3),
//! ];
//! let mut result_set = ResultSet::new(QueryResultFormat::Json, columns, "UTC")?;
//!
//! // Append chunks as they arrive, then freeze the sequence
//! result_set.append_chunk(br#"[["1", "1700000000.123"]]"#)?;
//! result_set.finish_result_set()?;
//!
//! while result_set.next_row()? == RowStatus::Row {
//!     result_set.next_column()?;
//!     let id = result_set.get_curr_cell_as_int64()?;
//!     result_set.next_column()?;
//!     let created = result_set.get_curr_cell_as_const_string()?.map(str::to_string);
//!     println!("{:?} {:?}", id, created);
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod chunk;
pub mod convert;
pub mod error;
pub mod format;
pub mod result_set;
pub mod transfer;
pub mod types;

// Re-export public API
pub use chunk::{
    ArrowChunk, CellSource, CellValue, Chunk, ChunkDecoder, EpochTime, JsonChunk,
    QueryResultFormat,
};
pub use convert::{CellConverter, Timestamp};
pub use error::{
    ConfigError, ConversionError, DecodeError, ErrorKind, Result, ResultSetError, StatusCode,
    TransferError,
};
pub use format::{BinaryFormat, OutputFormatConfig, TimezoneContext, TZ_OFFSET_BIAS};
pub use result_set::{
    Cursor, Phase, ResultSet, ResultSetBuilder, RowStatus, StringBuffer, StringWrite,
};
pub use transfer::{
    CompressionType, EncryptionMaterial, EncryptionMetadata, FileMetadata, StageInfo,
};
pub use types::{columns_from_rowtype, ColumnMetadata, ColumnType, TypeMapper};

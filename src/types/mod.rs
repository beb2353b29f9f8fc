//! Column types and metadata.

mod mapping;
mod schema;

pub use mapping::{ColumnType, TypeMapper};
pub use schema::{columns_from_rowtype, ColumnMetadata, DEFAULT_TIME_SCALE};

//! Common test utilities for chunkset-rs integration tests.
//!
//! Helpers here build chunk payloads the way a server would send them: JSON
//! rowsets as raw bytes and Arrow record batches serialized as IPC streams.

#![allow(dead_code)]

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{Field, Schema};
use arrow::ipc::writer::StreamWriter;
use chunkset_rs::{ColumnMetadata, ColumnType, QueryResultFormat, ResultSet};
use serde_json::Value;
use std::sync::Arc;

// ============================================================================
// Payload builders
// ============================================================================

/// Serialize a JSON rowset to chunk bytes.
pub fn json_payload(rows: Value) -> Vec<u8> {
    serde_json::to_vec(&rows).expect("rowset must serialize")
}

/// Build a record batch from named columns; every field is nullable.
pub fn record_batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).expect("valid batch")
}

/// Serialize record batches as one Arrow IPC stream.
pub fn arrow_payload(batches: &[RecordBatch]) -> Vec<u8> {
    let schema = batches[0].schema();
    let mut writer = StreamWriter::try_new(Vec::new(), &schema).expect("stream writer");
    for batch in batches {
        writer.write(batch).expect("write batch");
    }
    writer.finish().expect("finish stream");
    writer.into_inner().expect("stream bytes")
}

// ============================================================================
// Result set fixtures
// ============================================================================

/// `ID FIXED, NAME TEXT`
pub fn id_name_columns() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new("ID", ColumnType::Fixed),
        ColumnMetadata::new("NAME", ColumnType::Text),
    ]
}

/// A result set in its building phase with the UTC session time zone.
pub fn result_set(format: QueryResultFormat, columns: Vec<ColumnMetadata>) -> ResultSet {
    ResultSet::new(format, columns, "UTC").expect("UTC is a valid time zone")
}

/// Move to the next row and its first column.
pub fn first_cell_of_next_row(result_set: &mut ResultSet) {
    assert!(result_set.next_row().expect("next row").is_row());
    result_set.next_column().expect("first column");
}

/// Collect every cell as rendered text, row by row.
pub fn drain_as_strings(result_set: &mut ResultSet) -> Vec<Vec<Option<String>>> {
    let mut rows = Vec::new();
    while result_set.next_row().expect("next row").is_row() {
        let mut row = Vec::new();
        for _ in 0..result_set.total_column_count() {
            result_set.next_column().expect("next column");
            row.push(
                result_set
                    .get_curr_cell_as_const_string()
                    .expect("string getter")
                    .map(str::to_string),
            );
        }
        rows.push(row);
    }
    rows
}

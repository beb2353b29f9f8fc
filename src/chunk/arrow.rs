//! Columnar Arrow IPC chunks.
//!
//! The payload is an Arrow IPC stream (schema message followed by record
//! batches). Batches are concatenated into one column-major [`RecordBatch`]
//! and cells are read on demand by downcasting the column array once per
//! access. Fixed-point, time and timestamp columns may be scaled integers
//! whose scale comes from the column metadata rather than the Arrow schema.

use super::{scaled_to_nanos, CellSource, CellValue, Chunk, ChunkDecoder, EpochTime};
use crate::error::{ConversionError, DecodeError};
use crate::format::MAX_BIASED_OFFSET;
use crate::types::{ColumnMetadata, ColumnType, TypeMapper};
use arrow::array::{
    Array, BinaryArray, BooleanArray, Date32Array, Date64Array, Decimal128Array,
    FixedSizeBinaryArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    Int8Array, LargeBinaryArray, LargeStringArray, RecordBatch, StringArray, StructArray,
    Time32MillisecondArray, Time32SecondArray, Time64MicrosecondArray, Time64NanosecondArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Schema, TimeUnit};
use arrow::ipc::reader::StreamReader;
use std::any::Any;
use std::borrow::Cow;
use std::io::Cursor;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Decoder for Arrow IPC stream payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowDecoder;

impl ChunkDecoder for ArrowDecoder {
    fn decode(&self, payload: &[u8], columns: &[ColumnMetadata]) -> Result<Chunk, DecodeError> {
        ArrowChunk::from_ipc(payload, columns).map(Chunk::Arrow)
    }
}

/// A decoded Arrow chunk.
#[derive(Debug, Clone)]
pub struct ArrowChunk {
    batch: RecordBatch,
}

impl ArrowChunk {
    /// Read an Arrow IPC stream.
    ///
    /// # Arguments
    /// * `payload` - Complete IPC stream bytes
    /// * `columns` - Column metadata of the result set
    ///
    /// # Errors
    /// Returns `DecodeError::ColumnCountMismatch` if the schema width differs
    /// from `columns.len()`, `DecodeError::UnsupportedArrowType` if a field
    /// cannot carry its declared column type, and `DecodeError::ArrowError`
    /// for malformed streams.
    pub fn from_ipc(payload: &[u8], columns: &[ColumnMetadata]) -> Result<Self, DecodeError> {
        let reader = StreamReader::try_new(Cursor::new(payload), None)?;
        let schema = reader.schema();
        validate_schema(&schema, columns)?;

        let mut batches = reader.collect::<Result<Vec<_>, _>>()?;
        let batch = if batches.len() == 1 {
            batches.remove(0)
        } else {
            concat_batches(&schema, &batches)?
        };

        Ok(Self { batch })
    }

    /// Wrap an already materialized record batch.
    ///
    /// # Errors
    /// Same schema checks as [`ArrowChunk::from_ipc`].
    pub fn from_batch(batch: RecordBatch, columns: &[ColumnMetadata]) -> Result<Self, DecodeError> {
        validate_schema(&batch.schema(), columns)?;
        Ok(Self { batch })
    }

    /// The underlying record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }
}

fn validate_schema(schema: &Schema, columns: &[ColumnMetadata]) -> Result<(), DecodeError> {
    if schema.fields().len() != columns.len() {
        return Err(DecodeError::ColumnCountMismatch {
            expected: columns.len(),
            actual: schema.fields().len(),
        });
    }

    for (idx, (field, column)) in schema.fields().iter().zip(columns).enumerate() {
        if !TypeMapper::accepts(column.column_type, field.data_type()) {
            return Err(DecodeError::UnsupportedArrowType {
                column: idx,
                column_type: column.column_type,
                arrow_type: field.data_type().to_string(),
            });
        }
    }

    Ok(())
}

impl CellSource for ArrowChunk {
    fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    fn column_count(&self) -> usize {
        self.batch.num_columns()
    }

    fn cell(
        &self,
        row: usize,
        column: usize,
        metadata: &ColumnMetadata,
    ) -> Result<CellValue<'_>, ConversionError> {
        let array = self.batch.column(column).as_ref();
        if array.is_null(row) {
            return Ok(CellValue::Null);
        }

        let column_type = metadata.column_type;
        match column_type {
            ColumnType::Boolean => Ok(CellValue::Boolean(
                downcast::<BooleanArray>(array, column_type)?.value(row),
            )),
            ColumnType::Fixed => read_fixed(array, row, metadata),
            ColumnType::Real => match array.data_type() {
                DataType::Float32 => Ok(CellValue::Real(
                    downcast::<Float32Array>(array, column_type)?.value(row) as f64,
                )),
                DataType::Float64 => Ok(CellValue::Real(
                    downcast::<Float64Array>(array, column_type)?.value(row),
                )),
                other => Err(unexpected(column_type, other)),
            },
            ColumnType::Text | ColumnType::Variant | ColumnType::Object | ColumnType::Array => {
                let text = match array.data_type() {
                    DataType::Utf8 => downcast::<StringArray>(array, column_type)?.value(row),
                    DataType::LargeUtf8 => {
                        downcast::<LargeStringArray>(array, column_type)?.value(row)
                    }
                    other => return Err(unexpected(column_type, other)),
                };
                Ok(CellValue::Text(Cow::Borrowed(text)))
            }
            ColumnType::Binary => {
                let bytes = match array.data_type() {
                    DataType::Binary => downcast::<BinaryArray>(array, column_type)?.value(row),
                    DataType::LargeBinary => {
                        downcast::<LargeBinaryArray>(array, column_type)?.value(row)
                    }
                    DataType::FixedSizeBinary(_) => {
                        downcast::<FixedSizeBinaryArray>(array, column_type)?.value(row)
                    }
                    other => return Err(unexpected(column_type, other)),
                };
                Ok(CellValue::Binary(Cow::Borrowed(bytes)))
            }
            ColumnType::Date => {
                let days = match array.data_type() {
                    DataType::Date32 => downcast::<Date32Array>(array, column_type)?.value(row),
                    DataType::Date64 => {
                        let millis = downcast::<Date64Array>(array, column_type)?.value(row);
                        i32::try_from(millis.div_euclid(MILLIS_PER_DAY))
                            .map_err(|_| overflow(column_type, millis))?
                    }
                    other => return Err(unexpected(column_type, other)),
                };
                Ok(CellValue::Date { days })
            }
            ColumnType::Time => read_time(array, row, metadata),
            ColumnType::TimestampNtz | ColumnType::TimestampLtz => {
                read_timestamp(array, row, metadata)
            }
            ColumnType::TimestampTz => read_timestamp_tz(array, row, metadata),
        }
    }

    fn is_null(&self, row: usize, column: usize) -> bool {
        self.batch.column(column).is_null(row)
    }
}

fn downcast<T: Any>(array: &dyn Array, column_type: ColumnType) -> Result<&T, ConversionError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| unexpected(column_type, array.data_type()))
}

fn unexpected(column_type: ColumnType, arrow_type: &DataType) -> ConversionError {
    ConversionError::InvalidValue {
        column_type,
        message: format!("unexpected Arrow array of type {}", arrow_type),
    }
}

fn overflow(column_type: ColumnType, raw: impl std::fmt::Display) -> ConversionError {
    ConversionError::InvalidValue {
        column_type,
        message: format!("value {} is not representable", raw),
    }
}

fn read_fixed<'a>(
    array: &'a dyn Array,
    row: usize,
    metadata: &ColumnMetadata,
) -> Result<CellValue<'a>, ConversionError> {
    let column_type = metadata.column_type;
    let unscaled = match array.data_type() {
        DataType::Int8 => downcast::<Int8Array>(array, column_type)?.value(row) as i128,
        DataType::Int16 => downcast::<Int16Array>(array, column_type)?.value(row) as i128,
        DataType::Int32 => downcast::<Int32Array>(array, column_type)?.value(row) as i128,
        DataType::Int64 => downcast::<Int64Array>(array, column_type)?.value(row) as i128,
        DataType::Decimal128(_, scale) => {
            let value = downcast::<Decimal128Array>(array, column_type)?.value(row);
            if *scale >= 0 {
                return Ok(CellValue::Fixed {
                    unscaled: value,
                    scale: *scale as u32,
                });
            }
            // Negative decimal scale multiplies the stored integer
            let unscaled = 10_i128
                .checked_pow(scale.unsigned_abs() as u32)
                .and_then(|factor| value.checked_mul(factor))
                .ok_or_else(|| overflow(column_type, value))?;
            return Ok(CellValue::Fixed { unscaled, scale: 0 });
        }
        other => return Err(unexpected(column_type, other)),
    };

    Ok(CellValue::Fixed {
        unscaled,
        scale: metadata.fixed_scale(),
    })
}

fn read_time<'a>(
    array: &'a dyn Array,
    row: usize,
    metadata: &ColumnMetadata,
) -> Result<CellValue<'a>, ConversionError> {
    let column_type = metadata.column_type;
    let (raw, scale) = match array.data_type() {
        DataType::Int32 => (
            downcast::<Int32Array>(array, column_type)?.value(row) as i128,
            metadata.time_scale(),
        ),
        DataType::Int64 => (
            downcast::<Int64Array>(array, column_type)?.value(row) as i128,
            metadata.time_scale(),
        ),
        DataType::Time32(TimeUnit::Second) => (
            downcast::<Time32SecondArray>(array, column_type)?.value(row) as i128,
            0,
        ),
        DataType::Time32(TimeUnit::Millisecond) => (
            downcast::<Time32MillisecondArray>(array, column_type)?.value(row) as i128,
            3,
        ),
        DataType::Time64(TimeUnit::Microsecond) => (
            downcast::<Time64MicrosecondArray>(array, column_type)?.value(row) as i128,
            6,
        ),
        DataType::Time64(TimeUnit::Nanosecond) => (
            downcast::<Time64NanosecondArray>(array, column_type)?.value(row) as i128,
            9,
        ),
        other => return Err(unexpected(column_type, other)),
    };

    scaled_to_nanos(raw, scale)
        .and_then(|nanos| i64::try_from(nanos).ok())
        .map(|nanos| CellValue::Time { nanos })
        .ok_or_else(|| overflow(column_type, raw))
}

fn read_timestamp<'a>(
    array: &'a dyn Array,
    row: usize,
    metadata: &ColumnMetadata,
) -> Result<CellValue<'a>, ConversionError> {
    let column_type = metadata.column_type;
    let epoch = match array.data_type() {
        DataType::Int64 => {
            let raw = downcast::<Int64Array>(array, column_type)?.value(row);
            EpochTime::from_scaled(raw as i128, metadata.time_scale())
        }
        DataType::Timestamp(unit, _) => {
            let raw = native_timestamp(array, unit, row, column_type)?;
            EpochTime::from_scaled(raw as i128, TypeMapper::time_unit_scale(unit))
        }
        DataType::Struct(_) => {
            let parts = downcast::<StructArray>(array, column_type)?;
            let seconds = struct_int(parts, "epoch", row, column_type)?;
            let fraction = struct_int(parts, "fraction", row, column_type)?;
            EpochTime::from_parts(seconds, fraction)
        }
        other => return Err(unexpected(column_type, other)),
    };

    epoch
        .map(|epoch| CellValue::Timestamp {
            epoch,
            tz_offset: None,
        })
        .ok_or_else(|| overflow(column_type, "timestamp"))
}

fn read_timestamp_tz<'a>(
    array: &'a dyn Array,
    row: usize,
    metadata: &ColumnMetadata,
) -> Result<CellValue<'a>, ConversionError> {
    let column_type = metadata.column_type;
    let parts = downcast::<StructArray>(array, column_type)?;
    let raw_epoch = struct_int(parts, "epoch", row, column_type)?;
    let offset = struct_int(parts, "timezone", row, column_type)?;

    // Three-field layout carries whole seconds plus nanos, two-field layout a
    // scaled epoch
    let epoch = if parts.num_columns() == 3 {
        let fraction = struct_int(parts, "fraction", row, column_type)?;
        EpochTime::from_parts(raw_epoch, fraction)
    } else {
        EpochTime::from_scaled(raw_epoch as i128, metadata.time_scale())
    }
    .ok_or_else(|| overflow(column_type, raw_epoch))?;

    let tz_offset = i32::try_from(offset)
        .ok()
        .filter(|o| (0..=MAX_BIASED_OFFSET).contains(o))
        .ok_or_else(|| ConversionError::InvalidValue {
            column_type,
            message: format!("time zone offset {} is outside [0, 2880]", offset),
        })?;

    Ok(CellValue::Timestamp {
        epoch,
        tz_offset: Some(tz_offset),
    })
}

fn native_timestamp(
    array: &dyn Array,
    unit: &TimeUnit,
    row: usize,
    column_type: ColumnType,
) -> Result<i64, ConversionError> {
    Ok(match unit {
        TimeUnit::Second => downcast::<TimestampSecondArray>(array, column_type)?.value(row),
        TimeUnit::Millisecond => {
            downcast::<TimestampMillisecondArray>(array, column_type)?.value(row)
        }
        TimeUnit::Microsecond => {
            downcast::<TimestampMicrosecondArray>(array, column_type)?.value(row)
        }
        TimeUnit::Nanosecond => {
            downcast::<TimestampNanosecondArray>(array, column_type)?.value(row)
        }
    })
}

fn struct_int(
    parts: &StructArray,
    name: &str,
    row: usize,
    column_type: ColumnType,
) -> Result<i64, ConversionError> {
    let child = parts
        .column_by_name(name)
        .ok_or_else(|| ConversionError::InvalidValue {
            column_type,
            message: format!("missing struct field '{}'", name),
        })?
        .as_ref();

    match child.data_type() {
        DataType::Int32 => Ok(downcast::<Int32Array>(child, column_type)?.value(row) as i64),
        DataType::Int64 => Ok(downcast::<Int64Array>(child, column_type)?.value(row)),
        other => Err(unexpected(column_type, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::ArrayRef;
    use arrow::datatypes::Field;
    use arrow::ipc::writer::StreamWriter;
    use std::sync::Arc;

    fn to_ipc(batches: &[RecordBatch]) -> Vec<u8> {
        let schema = batches[0].schema();
        let mut writer = StreamWriter::try_new(Vec::new(), &schema).unwrap();
        for batch in batches {
            writer.write(batch).unwrap();
        }
        writer.finish().unwrap();
        writer.into_inner().unwrap()
    }

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let arrays = columns.into_iter().map(|(_, array)| array).collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    #[test]
    fn test_decode_ipc_stream() {
        let data = batch(vec![
            ("ID", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
            (
                "NAME",
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])) as ArrayRef,
            ),
        ]);
        let columns = vec![
            ColumnMetadata::new("ID", ColumnType::Fixed),
            ColumnMetadata::new("NAME", ColumnType::Text),
        ];

        let chunk = ArrowChunk::from_ipc(&to_ipc(&[data]), &columns).unwrap();
        assert_eq!(chunk.row_count(), 3);
        assert_eq!(chunk.column_count(), 2);
        assert!(chunk.is_null(1, 1));
        assert_eq!(chunk.cell(1, 1, &columns[1]).unwrap(), CellValue::Null);
        assert_eq!(
            chunk.cell(2, 1, &columns[1]).unwrap(),
            CellValue::Text(Cow::Borrowed("c"))
        );
        assert_eq!(
            chunk.cell(0, 0, &columns[0]).unwrap(),
            CellValue::Fixed {
                unscaled: 1,
                scale: 0
            }
        );
    }

    #[test]
    fn test_multiple_batches_are_concatenated() {
        let first = batch(vec![("N", Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef)]);
        let second = batch(vec![("N", Arc::new(Int32Array::from(vec![3])) as ArrayRef)]);
        let columns = vec![ColumnMetadata::new("N", ColumnType::Fixed)];

        let chunk = ArrowChunk::from_ipc(&to_ipc(&[first, second]), &columns).unwrap();
        assert_eq!(chunk.row_count(), 3);
        assert_eq!(
            chunk.cell(2, 0, &columns[0]).unwrap(),
            CellValue::Fixed {
                unscaled: 3,
                scale: 0
            }
        );
    }

    #[test]
    fn test_column_count_mismatch() {
        let data = batch(vec![("N", Arc::new(Int32Array::from(vec![1])) as ArrayRef)]);
        let columns = vec![
            ColumnMetadata::new("N", ColumnType::Fixed),
            ColumnMetadata::new("M", ColumnType::Fixed),
        ];
        let result = ArrowChunk::from_ipc(&to_ipc(&[data]), &columns);
        assert!(matches!(
            result,
            Err(DecodeError::ColumnCountMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_unsupported_physical_type() {
        let data = batch(vec![("N", Arc::new(StringArray::from(vec!["1"])) as ArrayRef)]);
        let columns = vec![ColumnMetadata::new("N", ColumnType::Fixed)];
        let result = ArrowChunk::from_ipc(&to_ipc(&[data]), &columns);
        assert!(matches!(
            result,
            Err(DecodeError::UnsupportedArrowType { column: 0, .. })
        ));
    }

    #[test]
    fn test_garbage_payload() {
        let columns = vec![ColumnMetadata::new("N", ColumnType::Fixed)];
        assert!(ArrowChunk::from_ipc(b"not arrow", &columns).is_err());
        assert!(ArrowChunk::from_ipc(&[], &columns).is_err());
    }

    #[test]
    fn test_scaled_fixed_and_decimal() {
        let decimal = Decimal128Array::from(vec![12345_i128])
            .with_precision_and_scale(10, 3)
            .unwrap();
        let data = batch(vec![
            ("A", Arc::new(Int64Array::from(vec![1250])) as ArrayRef),
            ("B", Arc::new(decimal) as ArrayRef),
        ]);
        let columns = vec![
            ColumnMetadata::new("A", ColumnType::Fixed).with_precision_scale(10, 2),
            ColumnMetadata::new("B", ColumnType::Fixed).with_precision_scale(10, 3),
        ];
        let chunk = ArrowChunk::from_batch(data, &columns).unwrap();
        assert_eq!(
            chunk.cell(0, 0, &columns[0]).unwrap(),
            CellValue::Fixed {
                unscaled: 1250,
                scale: 2
            }
        );
        assert_eq!(
            chunk.cell(0, 1, &columns[1]).unwrap(),
            CellValue::Fixed {
                unscaled: 12345,
                scale: 3
            }
        );
    }

    #[test]
    fn test_scaled_timestamp_and_struct_layouts() {
        let epoch_struct = StructArray::from(vec![
            (
                Arc::new(Field::new("epoch", DataType::Int64, false)),
                Arc::new(Int64Array::from(vec![1_700_000_000])) as ArrayRef,
            ),
            (
                Arc::new(Field::new("fraction", DataType::Int32, false)),
                Arc::new(Int32Array::from(vec![123_456_789])) as ArrayRef,
            ),
        ]);
        let tz_struct = StructArray::from(vec![
            (
                Arc::new(Field::new("epoch", DataType::Int64, false)),
                Arc::new(Int64Array::from(vec![1_700_000_000_000])) as ArrayRef,
            ),
            (
                Arc::new(Field::new("timezone", DataType::Int32, false)),
                Arc::new(Int32Array::from(vec![1770])) as ArrayRef,
            ),
        ]);
        let data = batch(vec![
            ("A", Arc::new(Int64Array::from(vec![1_700_000_000_500])) as ArrayRef),
            ("B", Arc::new(epoch_struct) as ArrayRef),
            ("C", Arc::new(tz_struct) as ArrayRef),
        ]);
        let columns = vec![
            ColumnMetadata::new("A", ColumnType::TimestampNtz).with_scale(3),
            ColumnMetadata::new("B", ColumnType::TimestampLtz).with_scale(9),
            ColumnMetadata::new("C", ColumnType::TimestampTz).with_scale(3),
        ];
        let chunk = ArrowChunk::from_ipc(&to_ipc(&[data]), &columns).unwrap();

        assert_eq!(
            chunk.cell(0, 0, &columns[0]).unwrap(),
            CellValue::Timestamp {
                epoch: EpochTime {
                    seconds: 1_700_000_000,
                    nanos: 500_000_000
                },
                tz_offset: None
            }
        );
        assert_eq!(
            chunk.cell(0, 1, &columns[1]).unwrap(),
            CellValue::Timestamp {
                epoch: EpochTime {
                    seconds: 1_700_000_000,
                    nanos: 123_456_789
                },
                tz_offset: None
            }
        );
        assert_eq!(
            chunk.cell(0, 2, &columns[2]).unwrap(),
            CellValue::Timestamp {
                epoch: EpochTime {
                    seconds: 1_700_000_000,
                    nanos: 0
                },
                tz_offset: Some(1770)
            }
        );
    }

    #[test]
    fn test_dates_and_times() {
        let data = batch(vec![
            ("D", Arc::new(Date32Array::from(vec![19723])) as ArrayRef),
            (
                "T",
                Arc::new(Time64MicrosecondArray::from(vec![3_600_000_001])) as ArrayRef,
            ),
            ("S", Arc::new(Int32Array::from(vec![36005])) as ArrayRef),
        ]);
        let columns = vec![
            ColumnMetadata::new("D", ColumnType::Date),
            ColumnMetadata::new("T", ColumnType::Time),
            ColumnMetadata::new("S", ColumnType::Time).with_scale(1),
        ];
        let chunk = ArrowChunk::from_batch(data, &columns).unwrap();
        assert_eq!(
            chunk.cell(0, 0, &columns[0]).unwrap(),
            CellValue::Date { days: 19723 }
        );
        assert_eq!(
            chunk.cell(0, 1, &columns[1]).unwrap(),
            CellValue::Time {
                nanos: 3_600_000_001_000
            }
        );
        assert_eq!(
            chunk.cell(0, 2, &columns[2]).unwrap(),
            CellValue::Time {
                nanos: 3_600_500_000_000
            }
        );
    }

    #[test]
    fn test_boolean_real_and_binary() {
        let data = batch(vec![
            ("B", Arc::new(BooleanArray::from(vec![Some(false), None])) as ArrayRef),
            ("R", Arc::new(Float64Array::from(vec![1.5, 2.5])) as ArrayRef),
            (
                "X",
                Arc::new(BinaryArray::from(vec![&b"\x01\x02"[..], &b""[..]])) as ArrayRef,
            ),
        ]);
        let columns = vec![
            ColumnMetadata::new("B", ColumnType::Boolean),
            ColumnMetadata::new("R", ColumnType::Real),
            ColumnMetadata::new("X", ColumnType::Binary),
        ];
        let chunk = ArrowChunk::from_batch(data, &columns).unwrap();
        assert_eq!(
            chunk.cell(0, 0, &columns[0]).unwrap(),
            CellValue::Boolean(false)
        );
        assert!(chunk.is_null(1, 0));
        assert_eq!(chunk.cell(1, 1, &columns[1]).unwrap(), CellValue::Real(2.5));
        assert_eq!(
            chunk.cell(0, 2, &columns[2]).unwrap(),
            CellValue::Binary(Cow::Borrowed(&[1u8, 2][..]))
        );
        // Empty binary is distinct from NULL
        assert!(!chunk.is_null(1, 2));
    }
}

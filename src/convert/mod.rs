//! Cell conversion to the getter output representations.
//!
//! The converter is the single place where output formatting rules are
//! applied. It holds no state of its own: every conversion depends only on the
//! decoded cell, the declared column type, the output format configuration and
//! the session time zone, so converting the same cell twice always yields the
//! same result.

mod timestamp;

pub use timestamp::Timestamp;

use crate::chunk::{CellValue, EpochTime};
use crate::error::ConversionError;
use crate::format::{
    decode_tz_offset, BinaryFormat, DateTimeParts, OutputFormatConfig, TimezoneContext,
    TZ_OFFSET_BIAS,
};
use crate::types::{ColumnMetadata, ColumnType};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::fmt::Write;

const SECONDS_PER_DAY: i64 = 86_400;

/// Converts decoded cells using the session's output formats and time zone.
#[derive(Debug, Clone, Copy)]
pub struct CellConverter<'a> {
    formats: &'a OutputFormatConfig,
    timezone: &'a TimezoneContext,
}

impl<'a> CellConverter<'a> {
    /// Create a converter over the given configuration.
    pub fn new(formats: &'a OutputFormatConfig, timezone: &'a TimezoneContext) -> Self {
        Self { formats, timezone }
    }

    /// Convert to a boolean.
    ///
    /// Numbers convert as "non-zero is true"; text accepts `1`/`0` and
    /// `true`/`false`.
    ///
    /// # Errors
    /// `ConversionError::TypeMismatch` for date, time, timestamp and binary
    /// columns and for text that is not a boolean literal.
    pub fn to_bool(
        &self,
        cell: &CellValue<'_>,
        column_type: ColumnType,
    ) -> Result<Option<bool>, ConversionError> {
        let value = match cell {
            CellValue::Null => return Ok(None),
            CellValue::Boolean(b) => *b,
            CellValue::Fixed { unscaled, .. } => *unscaled != 0,
            CellValue::Real(v) => *v != 0.0,
            CellValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => return Err(mismatch(column_type, "bool")),
            },
            _ => return Err(mismatch(column_type, "bool")),
        };
        Ok(Some(value))
    }

    /// Convert to an integer type, failing rather than truncating when the
    /// value does not fit. Fractional digits of fixed-point and floating
    /// point values are discarded.
    ///
    /// # Arguments
    /// * `cell` - Decoded cell
    /// * `column_type` - Declared column type
    /// * `target` - Target type name used in error messages
    ///
    /// # Errors
    /// `ConversionError::OutOfRange` if the value is outside `T`'s range and
    /// `ConversionError::TypeMismatch` for non-numeric columns.
    pub fn to_integer<T>(
        &self,
        cell: &CellValue<'_>,
        column_type: ColumnType,
        target: &'static str,
    ) -> Result<Option<T>, ConversionError>
    where
        T: TryFrom<i128>,
    {
        let wide: i128 = match cell {
            CellValue::Null => return Ok(None),
            CellValue::Boolean(b) => *b as i128,
            CellValue::Fixed { unscaled, scale } => match 10_i128.checked_pow(*scale) {
                Some(divisor) => unscaled / divisor,
                None => 0,
            },
            CellValue::Real(v) => real_to_i128(*v, target)?,
            CellValue::Text(text) => {
                let trimmed = text.trim();
                match trimmed.parse::<i128>() {
                    Ok(v) => v,
                    Err(_) => match trimmed.parse::<f64>() {
                        Ok(v) => real_to_i128(v, target)?,
                        Err(_) => return Err(mismatch(column_type, target)),
                    },
                }
            }
            _ => return Err(mismatch(column_type, target)),
        };

        T::try_from(wide)
            .map(Some)
            .map_err(|_| ConversionError::OutOfRange {
                value: wide.to_string(),
                target,
            })
    }

    /// Convert to a 64-bit float.
    ///
    /// # Errors
    /// `ConversionError::TypeMismatch` for non-numeric columns and text that
    /// is not a number.
    pub fn to_f64(
        &self,
        cell: &CellValue<'_>,
        column_type: ColumnType,
    ) -> Result<Option<f64>, ConversionError> {
        let value = match cell {
            CellValue::Null => return Ok(None),
            CellValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            CellValue::Fixed { unscaled, scale } => format_fixed(*unscaled, *scale)
                .parse::<f64>()
                .map_err(|_| mismatch(column_type, "float64"))?,
            CellValue::Real(v) => *v,
            CellValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| mismatch(column_type, "float64"))?,
            _ => return Err(mismatch(column_type, "float64")),
        };
        Ok(Some(value))
    }

    /// Append the textual rendering of `cell` to `out`.
    ///
    /// Returns `false` without touching `out` if the cell is NULL.
    ///
    /// # Errors
    /// `ConversionError::InvalidValue` if a date, time or timestamp value
    /// cannot be represented as a calendar value.
    pub fn write_string(
        &self,
        cell: &CellValue<'_>,
        metadata: &ColumnMetadata,
        out: &mut String,
    ) -> Result<bool, ConversionError> {
        match cell {
            CellValue::Null => return Ok(false),
            CellValue::Boolean(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Fixed { unscaled, scale } => out.push_str(&format_fixed(*unscaled, *scale)),
            CellValue::Real(v) => {
                let _ = write!(out, "{}", v);
            }
            CellValue::Text(text) => out.push_str(text),
            CellValue::Binary(bytes) => match self.formats.binary_format() {
                BinaryFormat::Hex => out.push_str(&hex::encode_upper(bytes)),
                BinaryFormat::Base64 => STANDARD.encode_string(bytes, out),
                BinaryFormat::Utf8 => out.push_str(&String::from_utf8_lossy(bytes)),
            },
            CellValue::Date { .. } | CellValue::Time { .. } | CellValue::Timestamp { .. } => {
                let timestamp = self.resolve(cell, metadata)?;
                let parts = timestamp.to_parts();
                match self.formats.pattern_for(metadata.column_type) {
                    Some(pattern) => pattern.render(&parts, out),
                    None => render_iso(&parts, out),
                }
            }
        }
        Ok(true)
    }

    /// Render `cell` as a new string.
    ///
    /// # Errors
    /// Same as [`CellConverter::write_string`].
    pub fn to_string(
        &self,
        cell: &CellValue<'_>,
        metadata: &ColumnMetadata,
    ) -> Result<Option<String>, ConversionError> {
        let mut out = String::new();
        let written = self.write_string(cell, metadata, &mut out)?;
        Ok(written.then_some(out))
    }

    /// Resolve a date, time or timestamp cell to wall-clock fields.
    ///
    /// TIMESTAMP_NTZ values are taken as UTC wall-clock time, TIMESTAMP_LTZ
    /// values are shifted into the session time zone, and TIMESTAMP_TZ values
    /// use their own stored offset.
    ///
    /// # Errors
    /// `ConversionError::TypeMismatch` for non-temporal columns.
    pub fn to_timestamp(
        &self,
        cell: &CellValue<'_>,
        metadata: &ColumnMetadata,
    ) -> Result<Option<Timestamp>, ConversionError> {
        match cell {
            CellValue::Null => Ok(None),
            CellValue::Date { .. } | CellValue::Time { .. } | CellValue::Timestamp { .. } => {
                self.resolve(cell, metadata).map(Some)
            }
            _ => Err(mismatch(metadata.column_type, "timestamp")),
        }
    }

    fn resolve(
        &self,
        cell: &CellValue<'_>,
        metadata: &ColumnMetadata,
    ) -> Result<Timestamp, ConversionError> {
        let column_type = metadata.column_type;
        let invalid = |message: &str| ConversionError::InvalidValue {
            column_type,
            message: message.to_string(),
        };

        match cell {
            CellValue::Date { days } => {
                let seconds = *days as i64 * SECONDS_PER_DAY;
                let local = epoch_start()
                    .checked_add_signed(Duration::days(*days as i64))
                    .ok_or_else(|| invalid("date out of range"))?;
                Ok(Timestamp::new(
                    column_type,
                    EpochTime { seconds, nanos: 0 },
                    local,
                    TZ_OFFSET_BIAS,
                    0,
                ))
            }

            CellValue::Time { nanos } => {
                let epoch = EpochTime::from_nanos(*nanos as i128)
                    .filter(|e| (0..SECONDS_PER_DAY).contains(&e.seconds))
                    .ok_or_else(|| invalid("time of day out of range"))?;
                let time = NaiveTime::from_num_seconds_from_midnight_opt(
                    epoch.seconds as u32,
                    epoch.nanos,
                )
                .ok_or_else(|| invalid("time of day out of range"))?;
                Ok(Timestamp::new(
                    column_type,
                    epoch,
                    epoch_start().date().and_time(time),
                    TZ_OFFSET_BIAS,
                    metadata.time_scale(),
                ))
            }

            CellValue::Timestamp { epoch, tz_offset } => {
                let utc = epoch
                    .to_naive_utc()
                    .ok_or_else(|| invalid("timestamp out of range"))?;

                let (local, stored) = match column_type {
                    ColumnType::TimestampLtz => {
                        let (local, minutes) = self
                            .timezone
                            .to_local(&utc)
                            .ok_or_else(|| invalid("timestamp out of range"))?;
                        (local, minutes + TZ_OFFSET_BIAS)
                    }
                    ColumnType::TimestampTz => {
                        let stored = tz_offset.unwrap_or(self.timezone.offset());
                        let minutes =
                            decode_tz_offset(stored).map_err(|e| invalid(&e.to_string()))?;
                        let local = utc
                            .checked_add_signed(Duration::minutes(minutes as i64))
                            .ok_or_else(|| invalid("timestamp out of range"))?;
                        (local, stored)
                    }
                    _ => (utc, TZ_OFFSET_BIAS),
                };

                Ok(Timestamp::new(
                    column_type,
                    *epoch,
                    local,
                    stored,
                    metadata.time_scale(),
                ))
            }

            _ => Err(mismatch(column_type, "timestamp")),
        }
    }
}

fn mismatch(column_type: ColumnType, target: &'static str) -> ConversionError {
    ConversionError::TypeMismatch {
        column_type,
        target,
    }
}

fn real_to_i128(value: f64, target: &'static str) -> Result<i128, ConversionError> {
    let truncated = value.trunc();
    // i128 bounds as f64 are exact powers of two
    if !truncated.is_finite() || truncated < -(2f64.powi(127)) || truncated >= 2f64.powi(127) {
        return Err(ConversionError::OutOfRange {
            value: value.to_string(),
            target,
        });
    }
    Ok(truncated as i128)
}

/// 1970-01-01 00:00:00
fn epoch_start() -> NaiveDateTime {
    NaiveDateTime::default()
}

/// Render a fixed-point value with exactly `scale` fractional digits.
pub(crate) fn format_fixed(unscaled: i128, scale: u32) -> String {
    let digits = unscaled.unsigned_abs().to_string();
    let sign = if unscaled < 0 { "-" } else { "" };
    if scale == 0 {
        return format!("{}{}", sign, digits);
    }

    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{:0>width$}", digits, width = scale + 1)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{}{}.{}", sign, int_part, frac_part)
}

fn render_iso(parts: &DateTimeParts, out: &mut String) {
    let _ = write!(out, "{}", parts.local.format("%Y-%m-%d %H:%M:%S%.f"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn converter_fixture() -> (OutputFormatConfig, TimezoneContext) {
        (OutputFormatConfig::default(), TimezoneContext::utc())
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(1250, 2), "12.50");
        assert_eq!(format_fixed(-5, 1), "-0.5");
        assert_eq!(format_fixed(5, 3), "0.005");
        assert_eq!(format_fixed(42, 0), "42");
        assert_eq!(format_fixed(0, 2), "0.00");
    }

    #[test]
    fn test_integer_narrowing() {
        let (formats, tz) = converter_fixture();
        let conv = CellConverter::new(&formats, &tz);
        let fixed = |v| CellValue::Fixed {
            unscaled: v,
            scale: 0,
        };

        let result = conv.to_integer::<i8>(&fixed(200), ColumnType::Fixed, "int8");
        assert!(matches!(result, Err(ConversionError::OutOfRange { .. })));

        let value = conv
            .to_integer::<i8>(&fixed(100), ColumnType::Fixed, "int8")
            .unwrap();
        assert_eq!(value, Some(100));

        let result = conv.to_integer::<u32>(&fixed(-1), ColumnType::Fixed, "uint32");
        assert!(matches!(result, Err(ConversionError::OutOfRange { .. })));

        let value = conv
            .to_integer::<u64>(&fixed(u64::MAX as i128), ColumnType::Fixed, "uint64")
            .unwrap();
        assert_eq!(value, Some(u64::MAX));
    }

    #[test]
    fn test_integer_from_scaled_real_and_text() {
        let (formats, tz) = converter_fixture();
        let conv = CellConverter::new(&formats, &tz);

        let cell = CellValue::Fixed {
            unscaled: -1299,
            scale: 2,
        };
        assert_eq!(
            conv.to_integer::<i32>(&cell, ColumnType::Fixed, "int32")
                .unwrap(),
            Some(-12)
        );
        assert_eq!(
            conv.to_integer::<i64>(&CellValue::Real(7.9), ColumnType::Real, "int64")
                .unwrap(),
            Some(7)
        );
        assert!(matches!(
            conv.to_integer::<i64>(&CellValue::Real(f64::NAN), ColumnType::Real, "int64"),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert_eq!(
            conv.to_integer::<u8>(&CellValue::Text(Cow::Borrowed(" 42 ")), ColumnType::Text, "uint8")
                .unwrap(),
            Some(42)
        );
        assert!(matches!(
            conv.to_integer::<u8>(&CellValue::Text(Cow::Borrowed("abc")), ColumnType::Text, "uint8"),
            Err(ConversionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            conv.to_integer::<i32>(&CellValue::Date { days: 1 }, ColumnType::Date, "int32"),
            Err(ConversionError::TypeMismatch { .. })
        ));
        assert_eq!(
            conv.to_integer::<i32>(&CellValue::Null, ColumnType::Fixed, "int32")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_bool_and_float() {
        let (formats, tz) = converter_fixture();
        let conv = CellConverter::new(&formats, &tz);

        assert_eq!(
            conv.to_bool(&CellValue::Boolean(true), ColumnType::Boolean)
                .unwrap(),
            Some(true)
        );
        assert_eq!(
            conv.to_bool(&CellValue::Text(Cow::Borrowed("FALSE")), ColumnType::Text)
                .unwrap(),
            Some(false)
        );
        assert!(conv
            .to_bool(&CellValue::Time { nanos: 0 }, ColumnType::Time)
            .is_err());

        let cell = CellValue::Fixed {
            unscaled: 1250,
            scale: 2,
        };
        assert_eq!(conv.to_f64(&cell, ColumnType::Fixed).unwrap(), Some(12.5));
        assert!(conv
            .to_f64(&CellValue::Binary(Cow::Borrowed(b"x")), ColumnType::Binary)
            .is_err());
    }

    #[test]
    fn test_binary_formats() {
        let tz = TimezoneContext::utc();
        let meta = ColumnMetadata::new("B", ColumnType::Binary);
        let cell = CellValue::Binary(Cow::Borrowed(b"hi"));

        let hex = OutputFormatConfig::default();
        let conv = CellConverter::new(&hex, &tz);
        assert_eq!(conv.to_string(&cell, &meta).unwrap().unwrap(), "6869");

        let base64 = OutputFormatConfig::builder().binary("BASE64").build().unwrap();
        let conv = CellConverter::new(&base64, &tz);
        assert_eq!(conv.to_string(&cell, &meta).unwrap().unwrap(), "aGk=");

        let utf8 = OutputFormatConfig::builder().binary("UTF8").build().unwrap();
        let conv = CellConverter::new(&utf8, &tz);
        assert_eq!(conv.to_string(&cell, &meta).unwrap().unwrap(), "hi");
    }

    #[test]
    fn test_date_and_time_strings() {
        let (formats, tz) = converter_fixture();
        let conv = CellConverter::new(&formats, &tz);

        let date = ColumnMetadata::new("D", ColumnType::Date);
        assert_eq!(
            conv.to_string(&CellValue::Date { days: 19723 }, &date)
                .unwrap()
                .unwrap(),
            "2024-01-01"
        );

        let time = ColumnMetadata::new("T", ColumnType::Time).with_scale(3);
        let cell = CellValue::Time {
            nanos: 3_723_456_000_000,
        };
        assert_eq!(conv.to_string(&cell, &time).unwrap().unwrap(), "01:02:03");

        let ts = conv.to_timestamp(&cell, &time).unwrap().unwrap();
        assert_eq!(ts.hour(), 1);
        assert_eq!(ts.nanosecond(), 456_000_000);
    }

    #[test]
    fn test_timestamp_kinds() {
        let formats = OutputFormatConfig::default();
        let tz = TimezoneContext::new("America/Los_Angeles").unwrap();
        let conv = CellConverter::new(&formats, &tz);
        let epoch = EpochTime {
            seconds: 1_700_000_000,
            nanos: 123_000_000,
        };

        let ntz = ColumnMetadata::new("A", ColumnType::TimestampNtz);
        let cell = CellValue::Timestamp {
            epoch,
            tz_offset: None,
        };
        assert_eq!(
            conv.to_string(&cell, &ntz).unwrap().unwrap(),
            "2023-11-14 22:13:20.123"
        );

        let ltz = ColumnMetadata::new("B", ColumnType::TimestampLtz);
        let ts = conv.to_timestamp(&cell, &ltz).unwrap().unwrap();
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.tz_offset(), 960);
        assert_eq!(
            conv.to_string(&cell, &ltz).unwrap().unwrap(),
            "2023-11-14 14:13:20.123 -0800"
        );

        let tz_meta = ColumnMetadata::new("C", ColumnType::TimestampTz);
        let cell = CellValue::Timestamp {
            epoch,
            tz_offset: Some(1770),
        };
        let ts = conv.to_timestamp(&cell, &tz_meta).unwrap().unwrap();
        assert_eq!(ts.offset_minutes(), 330);
        assert_eq!(
            conv.to_string(&cell, &tz_meta).unwrap().unwrap(),
            "2023-11-15 03:43:20.123 +0530"
        );
    }

    #[test]
    fn test_string_rendering_is_idempotent() {
        let (formats, tz) = converter_fixture();
        let conv = CellConverter::new(&formats, &tz);
        let meta = ColumnMetadata::new("N", ColumnType::Fixed).with_precision_scale(10, 3);
        let cell = CellValue::Fixed {
            unscaled: 1,
            scale: 3,
        };
        let first = conv.to_string(&cell, &meta).unwrap();
        let second = conv.to_string(&cell, &meta).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("0.001"));
    }

    #[test]
    fn test_null_and_mismatched_timestamp() {
        let (formats, tz) = converter_fixture();
        let conv = CellConverter::new(&formats, &tz);
        let meta = ColumnMetadata::new("T", ColumnType::Text);

        assert_eq!(conv.to_string(&CellValue::Null, &meta).unwrap(), None);
        assert!(matches!(
            conv.to_timestamp(&CellValue::Text(Cow::Borrowed("x")), &meta),
            Err(ConversionError::TypeMismatch { .. })
        ));
        assert_eq!(
            conv.to_string(&CellValue::Boolean(true), &meta)
                .unwrap()
                .as_deref(),
            Some("TRUE")
        );
    }
}

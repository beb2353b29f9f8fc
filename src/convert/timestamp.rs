//! Broken-down timestamp returned by the timestamp getter.

use crate::chunk::EpochTime;
use crate::format::{DateTimeParts, TZ_OFFSET_BIAS};
use crate::types::ColumnType;
use chrono::{Datelike, NaiveDateTime, Timelike};

/// A date, time or timestamp cell resolved to wall-clock fields.
///
/// `tz_offset` keeps the stored (+1440 biased) representation; use
/// [`Timestamp::offset_minutes`] for the real offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    column_type: ColumnType,
    epoch: EpochTime,
    local: NaiveDateTime,
    tz_offset: i32,
    scale: u32,
}

impl Timestamp {
    pub(crate) fn new(
        column_type: ColumnType,
        epoch: EpochTime,
        local: NaiveDateTime,
        tz_offset: i32,
        scale: u32,
    ) -> Self {
        Self {
            column_type,
            epoch,
            local,
            tz_offset,
            scale,
        }
    }

    /// Declared type of the source column.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// The instant as seconds since the epoch (UTC).
    pub fn epoch_seconds(&self) -> i64 {
        self.epoch.seconds
    }

    /// The instant.
    pub fn epoch(&self) -> EpochTime {
        self.epoch
    }

    /// Local wall-clock date and time.
    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn year(&self) -> i32 {
        self.local.year()
    }

    pub fn month(&self) -> u32 {
        self.local.month()
    }

    pub fn day(&self) -> u32 {
        self.local.day()
    }

    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    pub fn minute(&self) -> u32 {
        self.local.minute()
    }

    pub fn second(&self) -> u32 {
        self.local.second()
    }

    pub fn nanosecond(&self) -> u32 {
        self.local.nanosecond()
    }

    /// Biased offset in minutes, in [0, 2880].
    pub fn tz_offset(&self) -> i32 {
        self.tz_offset
    }

    /// Real offset from UTC in minutes.
    pub fn offset_minutes(&self) -> i32 {
        self.tz_offset - TZ_OFFSET_BIAS
    }

    /// Fractional-second digits of the source column.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Fields handed to an output pattern. Only zoned timestamps carry an
    /// offset.
    pub fn to_parts(&self) -> DateTimeParts {
        let offset_minutes = match self.column_type {
            ColumnType::TimestampLtz | ColumnType::TimestampTz => Some(self.offset_minutes()),
            _ => None,
        };
        DateTimeParts {
            local: self.local,
            offset_minutes,
            scale: self.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_accessors() {
        let local = NaiveDate::from_ymd_opt(2023, 11, 14)
            .unwrap()
            .and_hms_nano_opt(14, 13, 20, 5)
            .unwrap();
        let ts = Timestamp::new(
            ColumnType::TimestampLtz,
            EpochTime {
                seconds: 1_700_000_000,
                nanos: 5,
            },
            local,
            960,
            9,
        );

        assert_eq!(ts.year(), 2023);
        assert_eq!(ts.month(), 11);
        assert_eq!(ts.day(), 14);
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.minute(), 13);
        assert_eq!(ts.second(), 20);
        assert_eq!(ts.nanosecond(), 5);
        assert_eq!(ts.offset_minutes(), -480);
        assert_eq!(ts.to_parts().offset_minutes, Some(-480));
    }

    #[test]
    fn test_ntz_parts_have_no_offset() {
        let local = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let ts = Timestamp::new(
            ColumnType::TimestampNtz,
            EpochTime {
                seconds: 1_704_067_200,
                nanos: 0,
            },
            local,
            TZ_OFFSET_BIAS,
            3,
        );
        assert_eq!(ts.to_parts().offset_minutes, None);
        assert_eq!(ts.to_parts().scale, 3);
    }
}

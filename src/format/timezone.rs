//! Session time zone handling.
//!
//! Offsets are stored with a +1440 minute bias so the stored value is never
//! negative: UTC is 1440, -08:00 is 960, +05:30 is 1770. Valid stored values
//! lie in [0, 2880].

use crate::error::ConfigError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Bias added to real offsets (in minutes) before storing them.
pub const TZ_OFFSET_BIAS: i32 = 24 * 60;

/// Largest valid biased offset.
pub const MAX_BIASED_OFFSET: i32 = 2 * TZ_OFFSET_BIAS;

/// Bias a real offset in minutes.
pub fn encode_tz_offset(real_minutes: i32) -> Result<i32, ConfigError> {
    let stored = real_minutes + TZ_OFFSET_BIAS;
    if (0..=MAX_BIASED_OFFSET).contains(&stored) {
        Ok(stored)
    } else {
        Err(ConfigError::OffsetOutOfRange(stored))
    }
}

/// Remove the bias from a stored offset.
pub fn decode_tz_offset(stored: i32) -> Result<i32, ConfigError> {
    if (0..=MAX_BIASED_OFFSET).contains(&stored) {
        Ok(stored - TZ_OFFSET_BIAS)
    } else {
        Err(ConfigError::OffsetOutOfRange(stored))
    }
}

/// Render a real offset in minutes as `±HH:MM`.
pub fn format_tz_offset(real_minutes: i32) -> String {
    let sign = if real_minutes < 0 { '-' } else { '+' };
    let abs = real_minutes.abs();
    format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
}

#[derive(Debug, Clone, Copy)]
enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

/// Time zone used to render TIMESTAMP_LTZ values.
#[derive(Debug, Clone)]
pub struct TimezoneContext {
    tz_string: String,
    zone: Zone,
    /// Biased offset in minutes
    offset: i32,
}

impl TimezoneContext {
    /// Build a context from a tz identifier.
    ///
    /// Accepts IANA names (`America/Los_Angeles`), `UTC`/`GMT`/`Z`, and fixed
    /// offsets (`+05:30`, `-0800`, `+09`). For named zones the stored offset
    /// is the zone's offset at the current instant; conversions always use
    /// the zone's rules for the instant being converted.
    pub fn new(tz: &str) -> Result<Self, ConfigError> {
        Self::with_reference(tz, Utc::now())
    }

    /// Build a context, computing a named zone's stored offset at `reference`.
    pub fn with_reference(tz: &str, reference: DateTime<Utc>) -> Result<Self, ConfigError> {
        let trimmed = tz.trim();
        let zone = match parse_fixed_offset(trimmed) {
            Some(fixed) => Zone::Fixed(fixed),
            None => Zone::Named(
                trimmed
                    .parse::<Tz>()
                    .map_err(|_| ConfigError::UnknownTimezone(tz.to_string()))?,
            ),
        };

        let real = offset_minutes(zone, &reference.naive_utc());
        Ok(Self {
            tz_string: trimmed.to_string(),
            zone,
            offset: encode_tz_offset(real)?,
        })
    }

    /// UTC context.
    pub fn utc() -> Self {
        Self {
            tz_string: "UTC".to_string(),
            zone: Zone::Fixed(Utc.fix()),
            offset: TZ_OFFSET_BIAS,
        }
    }

    /// Build a fixed-offset context from a biased offset; the tz string
    /// becomes `±HH:MM`.
    pub fn from_biased_offset(stored: i32) -> Result<Self, ConfigError> {
        let real = decode_tz_offset(stored)?;
        let fixed = FixedOffset::east_opt(real * 60).ok_or(ConfigError::OffsetOutOfRange(stored))?;
        Ok(Self {
            tz_string: format_tz_offset(real),
            zone: Zone::Fixed(fixed),
            offset: stored,
        })
    }

    /// The tz identifier as supplied.
    pub fn tz_string(&self) -> &str {
        &self.tz_string
    }

    /// Stored (biased) offset in minutes.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Real offset in minutes in effect at the given UTC instant.
    pub fn offset_minutes_at(&self, utc: &NaiveDateTime) -> i32 {
        offset_minutes(self.zone, utc)
    }

    /// Convert a UTC instant to local wall-clock time, returning the local
    /// time and the real offset applied. `None` if the local time falls
    /// outside the representable range.
    pub fn to_local(&self, utc: &NaiveDateTime) -> Option<(NaiveDateTime, i32)> {
        let minutes = self.offset_minutes_at(utc);
        utc.checked_add_signed(chrono::Duration::minutes(minutes as i64))
            .map(|local| (local, minutes))
    }
}

fn offset_minutes(zone: Zone, utc: &NaiveDateTime) -> i32 {
    match zone {
        Zone::Fixed(fixed) => fixed.local_minus_utc() / 60,
        Zone::Named(tz) => tz.offset_from_utc_datetime(utc).fix().local_minus_utc() / 60,
    }
}

fn parse_fixed_offset(tz: &str) -> Option<FixedOffset> {
    if tz.is_empty()
        || tz.eq_ignore_ascii_case("UTC")
        || tz.eq_ignore_ascii_case("GMT")
        || tz.eq_ignore_ascii_case("Z")
    {
        return Some(Utc.fix());
    }

    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };

    if minutes >= 60 || hours * 60 + minutes > TZ_OFFSET_BIAS {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_round_trip() {
        assert_eq!(encode_tz_offset(0).unwrap(), 1440);
        assert_eq!(encode_tz_offset(-480).unwrap(), 960);
        assert_eq!(encode_tz_offset(330).unwrap(), 1770);

        assert_eq!(decode_tz_offset(1440).unwrap(), 0);
        assert_eq!(decode_tz_offset(960).unwrap(), -480);
        assert_eq!(decode_tz_offset(1770).unwrap(), 330);
    }

    #[test]
    fn test_bias_bounds() {
        assert_eq!(encode_tz_offset(-1440).unwrap(), 0);
        assert_eq!(encode_tz_offset(1440).unwrap(), 2880);
        assert!(encode_tz_offset(1441).is_err());
        assert!(decode_tz_offset(-1).is_err());
        assert!(decode_tz_offset(2881).is_err());
    }

    #[test]
    fn test_fixed_offset_contexts() {
        assert_eq!(TimezoneContext::new("UTC").unwrap().offset(), 1440);
        assert_eq!(TimezoneContext::new("-08:00").unwrap().offset(), 960);
        assert_eq!(TimezoneContext::new("+05:30").unwrap().offset(), 1770);
        assert_eq!(TimezoneContext::new("+0530").unwrap().offset(), 1770);
        assert_eq!(TimezoneContext::new("+09").unwrap().offset(), 1980);
    }

    #[test]
    fn test_named_zone_uses_reference_instant() {
        let winter = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let ctx = TimezoneContext::with_reference("America/Los_Angeles", winter).unwrap();
        assert_eq!(ctx.tz_string(), "America/Los_Angeles");
        assert_eq!(ctx.offset(), 960);

        let summer = DateTime::from_timestamp(1_688_000_000, 0).unwrap();
        let ctx = TimezoneContext::with_reference("America/Los_Angeles", summer).unwrap();
        assert_eq!(ctx.offset(), 1020);
    }

    #[test]
    fn test_named_zone_local_conversion_follows_dst() {
        let ctx = TimezoneContext::new("America/Los_Angeles").unwrap();
        let winter = DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc();
        let (local, minutes) = ctx.to_local(&winter).unwrap();
        assert_eq!(minutes, -480);
        assert_eq!(local.to_string(), "2023-11-14 14:13:20");
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let result = TimezoneContext::new("Mars/Olympus_Mons");
        assert!(matches!(result, Err(ConfigError::UnknownTimezone(_))));
        assert!(TimezoneContext::new("+25:00").is_err());
    }

    #[test]
    fn test_from_biased_offset_builds_tz_string() {
        let ctx = TimezoneContext::from_biased_offset(960).unwrap();
        assert_eq!(ctx.tz_string(), "-08:00");
        assert_eq!(ctx.offset(), 960);

        let ctx = TimezoneContext::from_biased_offset(1440).unwrap();
        assert_eq!(ctx.tz_string(), "+00:00");

        assert!(TimezoneContext::from_biased_offset(3000).is_err());
    }
}

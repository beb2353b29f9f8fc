//! Output formatting configuration: patterns, per-category output formats and
//! the session time zone.

mod output;
mod pattern;
mod timezone;

pub use output::{
    BinaryFormat, OutputFormatBuilder, OutputFormatConfig, DEFAULT_BINARY_FORMAT,
    DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT, DEFAULT_TIMESTAMP_FORMAT,
    DEFAULT_TIMESTAMP_NTZ_FORMAT,
};
pub use pattern::{DateTimeParts, FormatPattern};
pub use timezone::{
    decode_tz_offset, encode_tz_offset, format_tz_offset, TimezoneContext, MAX_BIASED_OFFSET,
    TZ_OFFSET_BIAS,
};

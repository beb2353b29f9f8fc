//! Builder for [`ResultSet`].

use super::ResultSet;
use crate::chunk::QueryResultFormat;
use crate::error::Result;
use crate::format::{OutputFormatConfig, TimezoneContext};
use crate::types::ColumnMetadata;

/// Builder for configuring a [`ResultSet`].
///
/// # Example
///
/// ```
/// use chunkset_rs::{ColumnMetadata, ColumnType, QueryResultFormat, ResultSet};
///
/// let result_set = ResultSet::builder(QueryResultFormat::Json)
///     .column(ColumnMetadata::new("ID", ColumnType::Fixed))
///     .timezone("America/Los_Angeles")
///     .build()
///     .unwrap();
/// assert_eq!(result_set.total_column_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ResultSetBuilder {
    format: QueryResultFormat,
    columns: Vec<ColumnMetadata>,
    timezone: Option<String>,
    timezone_context: Option<TimezoneContext>,
    output_formats: OutputFormatConfig,
    expected_row_count: Option<usize>,
}

impl ResultSetBuilder {
    /// Create a builder for a result set of the given wire format.
    pub fn new(format: QueryResultFormat) -> Self {
        Self {
            format,
            columns: Vec::new(),
            timezone: None,
            timezone_context: None,
            output_formats: OutputFormatConfig::default(),
            expected_row_count: None,
        }
    }

    /// Append one column.
    pub fn column(mut self, column: ColumnMetadata) -> Self {
        self.columns.push(column);
        self
    }

    /// Append several columns.
    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnMetadata>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Set the session time zone identifier (IANA name or fixed offset).
    pub fn timezone(mut self, tz: &str) -> Self {
        self.timezone = Some(tz.to_string());
        self.timezone_context = None;
        self
    }

    /// Use an already resolved time zone context.
    pub fn timezone_context(mut self, context: TimezoneContext) -> Self {
        self.timezone_context = Some(context);
        self.timezone = None;
        self
    }

    /// Set the output format configuration.
    pub fn output_formats(mut self, formats: OutputFormatConfig) -> Self {
        self.output_formats = formats;
        self
    }

    /// Set the total row count announced separately by the server.
    pub fn expected_row_count(mut self, rows: usize) -> Self {
        self.expected_row_count = Some(rows);
        self
    }

    /// Build the result set in its building phase.
    ///
    /// Without a time zone the session defaults to UTC.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownTimezone` if the time zone cannot be
    /// resolved.
    pub fn build(self) -> Result<ResultSet> {
        let timezone = match (self.timezone, self.timezone_context) {
            (Some(tz), _) => TimezoneContext::new(&tz)?,
            (None, Some(context)) => context,
            (None, None) => TimezoneContext::utc(),
        };

        Ok(ResultSet::from_parts(
            self.format,
            self.columns,
            self.output_formats,
            timezone,
            self.expected_row_count,
        ))
    }
}

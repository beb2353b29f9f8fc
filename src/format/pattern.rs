//! Output format patterns such as `YYYY-MM-DD HH24:MI:SS.FF3 TZHTZM`.
//!
//! Elements are matched case-insensitively; anything that is not an element
//! is copied verbatim, and text between double quotes is always literal.

use chrono::{Datelike, NaiveDateTime, Timelike};

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_ABBREVS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Element {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year4,
    Year2,
    Month2,
    MonthAbbrev,
    MonthName,
    Day2,
    DayAbbrev,
    Hour24,
    Hour12,
    Meridiem,
    Minute,
    Second,
    /// `FF` uses the value's scale, `FF0`..`FF9` a fixed number of digits
    Fraction(Option<u32>),
    TzHour,
    TzMinute,
}

/// Wall-clock value handed to a pattern for rendering.
#[derive(Debug, Clone, Copy)]
pub struct DateTimeParts {
    /// Local wall-clock date and time
    pub local: NaiveDateTime,
    /// Real offset from UTC in minutes; `None` renders as `+00`/`00`
    pub offset_minutes: Option<i32>,
    /// Fractional digits used by a bare `FF`
    pub scale: u32,
}

/// A parsed output format pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPattern {
    source: String,
    elements: Vec<Element>,
}

impl FormatPattern {
    /// Parse a pattern. Parsing never fails: unknown text is literal.
    pub fn parse(pattern: &str) -> Self {
        let mut elements = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(c) = rest.chars().next() {
            if c == '"' {
                let body = &rest[1..];
                let end = body.find('"').unwrap_or(body.len());
                literal.push_str(&body[..end]);
                rest = body.get(end + 1..).unwrap_or("");
                continue;
            }

            match match_element(rest) {
                Some((field, consumed)) => {
                    if !literal.is_empty() {
                        elements.push(Element::Literal(std::mem::take(&mut literal)));
                    }
                    elements.push(Element::Field(field));
                    rest = &rest[consumed..];
                }
                None => {
                    literal.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }

        if !literal.is_empty() {
            elements.push(Element::Literal(literal));
        }

        Self {
            source: pattern.to_string(),
            elements,
        }
    }

    /// The pattern text as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Render `parts` into `out`.
    pub fn render(&self, parts: &DateTimeParts, out: &mut String) {
        let local = &parts.local;
        let nanos = local.nanosecond() % 1_000_000_000;
        let offset = parts.offset_minutes.unwrap_or(0);

        for element in &self.elements {
            let field = match element {
                Element::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                Element::Field(field) => *field,
            };

            match field {
                Field::Year4 => out.push_str(&format!("{:04}", local.year())),
                Field::Year2 => out.push_str(&format!("{:02}", local.year().rem_euclid(100))),
                Field::Month2 => out.push_str(&format!("{:02}", local.month())),
                Field::MonthAbbrev => out.push_str(MONTH_ABBREVS[local.month0() as usize]),
                Field::MonthName => out.push_str(MONTH_NAMES[local.month0() as usize]),
                Field::Day2 => out.push_str(&format!("{:02}", local.day())),
                Field::DayAbbrev => {
                    out.push_str(DAY_ABBREVS[local.weekday().num_days_from_monday() as usize])
                }
                Field::Hour24 => out.push_str(&format!("{:02}", local.hour())),
                Field::Hour12 => {
                    let hour = match local.hour() % 12 {
                        0 => 12,
                        h => h,
                    };
                    out.push_str(&format!("{:02}", hour));
                }
                Field::Meridiem => out.push_str(if local.hour() < 12 { "AM" } else { "PM" }),
                Field::Minute => out.push_str(&format!("{:02}", local.minute())),
                Field::Second => out.push_str(&format!("{:02}", local.second())),
                Field::Fraction(digits) => {
                    let digits = digits.unwrap_or(parts.scale).min(9) as usize;
                    if digits > 0 {
                        let all = format!("{:09}", nanos);
                        out.push_str(&all[..digits]);
                    }
                }
                Field::TzHour => {
                    let sign = if offset < 0 { '-' } else { '+' };
                    out.push_str(&format!("{}{:02}", sign, offset.abs() / 60));
                }
                Field::TzMinute => out.push_str(&format!("{:02}", offset.abs() % 60)),
            }
        }
    }

    /// Render `parts` into a new string.
    pub fn format(&self, parts: &DateTimeParts) -> String {
        let mut out = String::with_capacity(self.source.len() + 8);
        self.render(parts, &mut out);
        out
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Match the longest element at the start of `text`.
fn match_element(text: &str) -> Option<(Field, usize)> {
    const FIXED: &[(&str, Field)] = &[
        ("YYYY", Field::Year4),
        ("YY", Field::Year2),
        ("MMMM", Field::MonthName),
        ("MON", Field::MonthAbbrev),
        ("MM", Field::Month2),
        ("MI", Field::Minute),
        ("DD", Field::Day2),
        ("DY", Field::DayAbbrev),
        ("HH24", Field::Hour24),
        ("HH12", Field::Hour12),
        ("HH", Field::Hour24),
        ("AM", Field::Meridiem),
        ("PM", Field::Meridiem),
        ("SS", Field::Second),
        ("TZH", Field::TzHour),
        ("TZM", Field::TzMinute),
    ];

    if starts_with_ignore_case(text, "FF") {
        let digit = text[2..].chars().next().and_then(|c| c.to_digit(10));
        return Some(match digit {
            Some(d) => (Field::Fraction(Some(d)), 3),
            None => (Field::Fraction(None), 2),
        });
    }

    FIXED
        .iter()
        .find(|(name, _)| starts_with_ignore_case(text, name))
        .map(|(name, field)| (*field, name.len()))
}

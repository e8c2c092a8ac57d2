//! Watermarks and wire timestamp parsing.
//!
//! Clients send times either as epoch milliseconds (number or numeric
//! string) or as ISO-8601 text. Everything is normalized to UTC.

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timestamp parsing errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimestampError {
    #[error("timestamp is missing")]
    Missing,

    #[error("unparsable timestamp: {0}")]
    Unparsable(String),
}

/// The "since when" boundary of a sync exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Watermark from epoch milliseconds.
    pub fn from_millis(millis: i64) -> Result<Self, TimestampError> {
        from_millis(millis, || millis.to_string()).map(Self)
    }

    /// Parse the watermark a client supplied. Absent is an error.
    pub fn parse(value: Option<&Value>) -> Result<Self, TimestampError> {
        match value {
            None | Some(Value::Null) => Err(TimestampError::Missing),
            Some(v) => parse_timestamp(v).map(Self),
        }
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Canonical storage text for comparisons in SQL.
    pub fn to_sql(&self) -> String {
        to_sql_timestamp(&self.0)
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl FromStr for Watermark {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_timestamp_str(s).map(Self)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_millis())
    }
}

impl Serialize for Watermark {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_millis())
    }
}

impl<'de> Deserialize<'de> for Watermark {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        parse_timestamp(&value)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Years whose RFC 3339 text is four digits wide. Outside them the stored
/// text no longer sorts with the instant.
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

fn in_range(
    at: DateTime<Utc>,
    raw: impl FnOnce() -> String,
) -> Result<DateTime<Utc>, TimestampError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&at.year()) {
        Ok(at)
    } else {
        Err(TimestampError::Unparsable(raw()))
    }
}

fn from_millis(millis: i64, raw: impl Fn() -> String) -> Result<DateTime<Utc>, TimestampError> {
    let at = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| TimestampError::Unparsable(raw()))?;
    in_range(at, raw)
}

/// Parse a wire timestamp: epoch millis (int, float, numeric string) or
/// ISO-8601 text, within years 0000 to 9999.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, TimestampError> {
    match value {
        Value::Null => Err(TimestampError::Missing),
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .ok_or_else(|| TimestampError::Unparsable(n.to_string()))?;
            from_millis(millis, || n.to_string())
        }
        Value::String(s) => parse_timestamp_str(s),
        other => Err(TimestampError::Unparsable(other.to_string())),
    }
}

fn parse_timestamp_str(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(TimestampError::Missing);
    }
    parse_text(s).and_then(|at| in_range(at, || raw.to_string()))
}

fn parse_text(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    if let Ok(millis) = s.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| TimestampError::Unparsable(s.to_string()));
    }
    if let Ok(millis) = s.parse::<f64>() {
        if millis.is_finite() {
            if let Some(dt) = Utc.timestamp_millis_opt(millis as i64).single() {
                return Ok(dt);
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Naive forms are read as UTC.
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimestampError::Unparsable(s.to_string()))
}

/// Fixed-width UTC text, ordered the same as the instants it encodes.
pub fn to_sql_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Inverse of [`to_sql_timestamp`]; tolerant of other RFC 3339 offsets.
pub fn from_sql_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_timestamp_str(raw).ok())
}

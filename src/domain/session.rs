use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Session status as reported by the backend. Unknown codes are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
    Other(String),
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Other(code) => code,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<&str> for SessionStatus {
    fn from(code: &str) -> Self {
        match code {
            "ACTIVE" => Self::Active,
            "COMPLETED" => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of the `sessionData` array as sent by the backend. Fields are read
/// leniently: a value of an unexpected type becomes `None` instead of failing the
/// whole response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSessionRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub image_url: Option<String>,
    /// Date string, or epoch milliseconds.
    #[serde(rename = "startDate", default)]
    pub start_date: Option<Value>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(rename = "numOfIncidents", default, deserialize_with = "lenient_count")]
    pub num_of_incidents: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(count_from_value))
}

fn count_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|count| count.is_finite() && count.fract() == 0.0)
                .map(|count| count as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp(text),
        Value::Number(number) => number.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDuration {
    pub hours: u64,
    pub minutes: u64,
}

impl fmt::Display for SessionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub image_url: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub num_of_incidents: u32,
    pub duration: Option<SessionDuration>,
    /// Backend fields with no typed counterpart, forwarded to the detail view.
    pub extra: Map<String, Value>,
}

pub fn normalize(raw: &RawSessionRecord) -> SessionRecord {
    let start_date = raw.start_date.as_ref().and_then(timestamp_from_value);
    let end_date = raw.end_date.as_ref().and_then(timestamp_from_value);
    let status = SessionStatus::from(raw.status.as_deref().unwrap_or_default());

    let duration = match (&status, start_date, end_date) {
        (SessionStatus::Completed, Some(start), Some(end)) => Some(compute_duration(start, end)),
        _ => None,
    };

    SessionRecord {
        image_url: raw.image_url.clone().unwrap_or_default(),
        start_date,
        end_date,
        status,
        num_of_incidents: raw
            .num_of_incidents
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0),
        duration,
        extra: raw.extra.clone(),
    }
}

pub fn normalize_all(raw: &[RawSessionRecord]) -> Vec<SessionRecord> {
    raw.iter().map(normalize).collect()
}

/// Elapsed time between two instants, split into whole hours and rounded minutes.
///
/// The minute remainder is derived from the fractional hour and rounded half up, so
/// sub-minute precision in the timestamps can round the remainder to 60; that case is
/// carried into the hour.
pub fn compute_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> SessionDuration {
    let total_minutes = (end - start).num_milliseconds().unsigned_abs() as f64 / 60_000.0;
    let hours = total_minutes / 60.0;
    let whole_hours = hours.floor();
    let remainder = ((hours - whole_hours) * 60.0).round();

    let mut hours = whole_hours as u64;
    let mut minutes = remainder as u64;
    if minutes >= 60 {
        hours += 1;
        minutes -= 60;
    }

    SessionDuration { hours, minutes }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

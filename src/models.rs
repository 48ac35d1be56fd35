use crate::error::{Error, Result};
use crate::orm::field::Field;
use crate::orm::model::Model;
use crate::orm::record::Record;
use crate::orm::value::Value;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A to-do entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Model for Task {
    const NAME: &'static str = "Task";

    fn fields() -> Vec<(&'static str, Field)> {
        vec![
            ("body", Field::text()),
            ("created_at", Field::text().datetime()),
            ("updated_at", Field::text().datetime().nullable()),
            ("expires_at", Field::text().datetime().nullable()),
            ("is_active", Field::integer().default(1)),
        ]
    }
}

impl Task {
    /// Read a task from a record of the `Task` model.
    pub fn from_record(record: &Record) -> Result<Self> {
        let id = record
            .pk()
            .and_then(Value::as_integer)
            .ok_or_else(|| Error::MissingValue("id".to_string()))?;
        let body = record
            .get("body")
            .and_then(Value::as_text)
            .ok_or_else(|| Error::MissingValue("body".to_string()))?
            .to_string();
        let created_at = record
            .get("created_at")
            .and_then(Value::as_text)
            .ok_or_else(|| Error::MissingValue("created_at".to_string()))?;

        Ok(Task {
            id,
            body,
            created_at: parse_datetime(created_at)?,
            updated_at: optional_datetime(record, "updated_at")?,
            expires_at: optional_datetime(record, "expires_at")?,
            is_active: record
                .get("is_active")
                .and_then(Value::as_integer)
                .is_none_or(|flag| flag != 0),
        })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)?;
        if let Some(expires_at) = self.expires_at {
            write!(f, " expires at {}", expires_at.format("%Y-%m-%d %H:%M"))?;
        }
        Ok(())
    }
}

fn optional_datetime(record: &Record, column: &str) -> Result<Option<DateTime<Utc>>> {
    record
        .get(column)
        .and_then(Value::as_text)
        .map(parse_datetime)
        .transpose()
}

/// Storage form of timestamps.
pub fn format_datetime(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp: RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS`
/// taken as UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => {
            let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")?;
            Ok(naive.and_utc())
        }
    }
}

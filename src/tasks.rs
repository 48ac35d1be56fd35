use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Task, format_datetime};
use crate::orm::factory::RowFactory;
use crate::orm::model::Model;
use crate::orm::query::QueryBuilder;
use crate::orm::record::Record;
use crate::orm::statement::{Direction, Predicate};
use crate::orm::value::Value;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::path::Path;
use tracing::debug;

/// Which tasks `list` returns
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub id: Option<i64>,
    /// Substring of the body.
    pub search: Option<String>,
    pub active_only: bool,
    pub limit: Option<i64>,
}

/// Task operations over one database file
pub struct TaskManager {
    db: Database,
}

impl TaskManager {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut db = Database::open(path);
        db.register_model::<Task>()?;
        Ok(TaskManager { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn is_initialized(&self) -> Result<bool> {
        let meta = self.db.registry().resolve_reference(Task::NAME)?;
        self.db.table_exists(meta.table_name())
    }

    pub fn init(&self) -> Result<()> {
        self.db.initialize_schema()
    }

    /// Create a task. `expires` is `+N` days from now or a date.
    pub fn create_task(&self, body: &str, expires: Option<&str>) -> Result<Task> {
        let now = Utc::now();
        let expires_at = expires.map(|e| parse_expiry(e, now)).transpose()?;

        let mut record = self
            .db
            .record(Task::NAME)?
            .with("body", body)
            .with("created_at", format_datetime(now))
            .with("expires_at", expires_at.map(format_datetime));
        record.save(&self.db, false)?;
        debug!(id = ?record.pk(), "created task");

        self.get_task(task_id(&record)?)
    }

    pub fn get_task(&self, id: i64) -> Result<Task> {
        Task::from_record(&self.find_record(id)?)
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.select_records(filter)?
            .iter()
            .map(Task::from_record)
            .collect()
    }

    /// Change the body or expiry; with neither given, flip the active flag.
    pub fn update_task(
        &self,
        id: i64,
        body: Option<&str>,
        expires: Option<&str>,
    ) -> Result<Task> {
        let now = Utc::now();
        let mut record = self.find_record(id)?;

        if body.is_none() && expires.is_none() {
            let active = record
                .get("is_active")
                .and_then(Value::as_integer)
                .is_none_or(|flag| flag != 0);
            record.set("is_active", !active);
        }
        if let Some(body) = body {
            record.set("body", body);
        }
        if let Some(expires) = expires {
            record.set("expires_at", format_datetime(parse_expiry(expires, now)?));
        }
        record.set("updated_at", format_datetime(now));
        record.save(&self.db, false)?;

        self.get_task(id)
    }

    /// Delete one task, or every task when `id` is `None` and `force` is set.
    /// Returns how many tasks were removed.
    pub fn delete_tasks(&self, id: Option<i64>, force: bool) -> Result<usize> {
        let mut records = match id {
            Some(id) => vec![self.find_record(id)?],
            None if force => self.select_records(&TaskFilter::default())?,
            None => return Err(Error::ConfirmationRequired),
        };
        for record in &mut records {
            record.delete(&self.db, true)?;
        }
        Ok(records.len())
    }

    fn find_record(&self, id: i64) -> Result<Record> {
        let filter = TaskFilter {
            id: Some(id),
            ..TaskFilter::default()
        };
        self.select_records(&filter)?
            .into_iter()
            .next()
            .ok_or(Error::TaskNotFound(id))
    }

    fn select_records(&self, filter: &TaskFilter) -> Result<Vec<Record>> {
        let mut conditions: Vec<(&str, Predicate, Value)> = Vec::new();
        if let Some(id) = filter.id {
            conditions.push(("id", Predicate::Eq, Value::from(id)));
        }
        if let Some(search) = &filter.search {
            conditions.push(("body", Predicate::Like, Value::from(search.as_str())));
        }
        if filter.active_only {
            conditions.push(("is_active", Predicate::Eq, Value::from(true)));
        }

        let mut builder = QueryBuilder::new(&self.db, Task::NAME)?.select()?;
        for (i, (column, predicate, value)) in conditions.into_iter().enumerate() {
            builder = if i == 0 {
                builder.where_(column, predicate, value)?
            } else {
                builder.and_where(column, predicate, value)?
            };
        }
        builder = builder.order("id", Direction::Asc)?;
        if let Some(limit) = filter.limit {
            builder = builder.limit(limit);
        }

        let fetched = builder.build()?.execute()?.into_result();
        RowFactory::new(&self.db, Task::NAME, fetched)?.to_instances()
    }
}

fn task_id(record: &Record) -> Result<i64> {
    record
        .pk()
        .and_then(Value::as_integer)
        .ok_or_else(|| Error::MissingValue("id".to_string()))
}

/// Parse an expiry: `+N` is N days after `now` (`+` alone is one day),
/// otherwise an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_expiry(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Some(days) = input.strip_prefix('+') {
        let days: i64 = if days.is_empty() {
            1
        } else {
            days.parse()
                .map_err(|_| Error::InvalidExpiry(input.to_string()))?
        };
        return Duration::try_days(days)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(|| Error::InvalidExpiry(input.to_string()));
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Ok(datetime.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidExpiry(input.to_string()))
}

//! Query builder.
//!
//! A [`QueryBuilder`] is single use: pick one head statement (`select`,
//! `insert`, `update`, `delete` or `create_table`), add filters, ordering and
//! paging, then `build()` and `execute()`. Each step consumes the builder and
//! hands it back, so a builder cannot be reused after execution.
//!
//! ```no_run
//! # use affaire::db::Database;
//! # use affaire::orm::{Predicate, QueryBuilder};
//! # fn demo(db: &Database) -> affaire::Result<()> {
//! let rows = QueryBuilder::new(db, "Book")?
//!     .select()?
//!     .where_("id", Predicate::Eq, 1)?
//!     .or_where("desc", Predicate::Is, None::<String>)?
//!     .build()?
//!     .execute()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```

use crate::db::Database;
use crate::error::{Error, Result};
use crate::orm::model::{Column, ModelMeta};
use crate::orm::record::{Attr, Record};
use crate::orm::statement::{ClauseKind, Condition, Direction, Predicate, Statement};
use crate::orm::value::Value;
use rusqlite::{OptionalExtension, params_from_iter};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// How many rows a query hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Row,
    Rows,
}

/// Raw fetch result
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Fetched {
    #[default]
    None,
    Row(Vec<Value>),
    Rows(Vec<Vec<Value>>),
}

impl Fetched {
    /// Number of rows fetched.
    pub fn len(&self) -> usize {
        match self {
            Fetched::None => 0,
            Fetched::Row(_) => 1,
            Fetched::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A column named either by its declared name, its stored name, or directly
#[derive(Debug, Clone, Copy)]
pub enum ColumnRef<'a> {
    Name(&'a str),
    Column(&'a Column),
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnRef<'a> {
    fn from(name: &'a String) -> Self {
        ColumnRef::Name(name)
    }
}

impl<'a> From<&'a Column> for ColumnRef<'a> {
    fn from(column: &'a Column) -> Self {
        ColumnRef::Column(column)
    }
}

pub struct QueryBuilder<'db> {
    db: &'db Database,
    model: Arc<ModelMeta>,
    head: Option<Statement>,
    filter: Option<Condition>,
    order: Vec<(String, Direction)>,
    limit: Option<i64>,
    offset: Option<i64>,
    shape: Option<ResultShape>,
    sql: String,
    params: Vec<Value>,
    built: bool,
    last_id: Option<i64>,
    result: Fetched,
}

impl<'db> QueryBuilder<'db> {
    pub fn new(db: &'db Database, model: &str) -> Result<Self> {
        let model = db.registry().resolve_reference(model)?;
        Ok(QueryBuilder {
            db,
            model,
            head: None,
            filter: None,
            order: Vec::new(),
            limit: None,
            offset: None,
            shape: None,
            sql: String::new(),
            params: Vec::new(),
            built: false,
            last_id: None,
            result: Fetched::None,
        })
    }

    pub fn model(&self) -> &ModelMeta {
        &self.model
    }

    fn set_head(&mut self, statement: Statement) -> Result<()> {
        if let Some(head) = &self.head {
            return Err(Error::Syntax(format!(
                "{:?} statement already started, cannot add {:?}",
                head.kind(),
                statement.kind()
            )));
        }
        self.head = Some(statement);
        Ok(())
    }

    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.model.table_name())
    }

    fn sql_name(&self, column: &Column) -> Result<String> {
        self.db.registry().sql_column_name(column)
    }

    /// Stored name of a column of this model.
    fn resolve_column(&self, column: ColumnRef<'_>) -> Result<String> {
        let found = match column {
            ColumnRef::Column(c) if c.model == self.model.name() => self.model.column(&c.name),
            ColumnRef::Column(_) => None,
            ColumnRef::Name(name) => match self.model.column(name) {
                Some(c) => Some(c),
                None => self.model.columns().iter().find(|c| {
                    c.field.is_relation()
                        && self.sql_name(c).is_ok_and(|stored| stored == name)
                }),
            },
        };
        match found {
            Some(c) => self.sql_name(c),
            None => {
                let name = match column {
                    ColumnRef::Name(name) => name,
                    ColumnRef::Column(c) => c.name.as_str(),
                };
                Err(Error::unknown_column(self.model.name(), name))
            }
        }
    }

    /// Value bound for a relation column, saving the related record first when
    /// cascading.
    fn relation_value(&self, attr: Option<&mut Attr>, cascade: bool) -> Result<Value> {
        Ok(match attr {
            Some(Attr::Related(related)) => {
                if cascade {
                    related.save(self.db, cascade)?;
                }
                related.pk().cloned().unwrap_or_default()
            }
            Some(Attr::Value(value)) => value.clone(),
            None => Value::Null,
        })
    }

    /// `CREATE TABLE`; `strict` leaves out `IF NOT EXISTS`. Two columns
    /// stored under the same name, such as two relations to one model, are a
    /// schema error.
    pub fn create_table(mut self, strict: bool) -> Result<Self> {
        let registry = self.db.registry();
        let mut stored = HashSet::new();
        let mut columns = Vec::with_capacity(self.model.columns().len());
        for column in self.model.columns() {
            let name = self.sql_name(column)?;
            if !stored.insert(name.clone()) {
                return Err(Error::Schema(format!(
                    "column \"{}\" of {} is stored as \"{name}\", which is already taken",
                    column.name,
                    self.model.name()
                )));
            }
            let definition = column.field.to_column_sql(&column.name, registry)?;
            columns.push(format!("\"{name}\" {definition}"));
        }
        // Unreachable while registration always provides a primary key.
        if columns.is_empty() {
            return Err(Error::Schema(format!(
                "table \"{}\" must contain at least one column",
                self.model.table_name()
            )));
        }

        let guard = if strict { "" } else { "IF NOT EXISTS " };
        let sql = format!(
            "CREATE TABLE {guard}{} ({})",
            self.quoted_table(),
            columns.join(", ")
        );
        self.set_head(Statement::new(ClauseKind::CreateTable, sql, Vec::new()))?;
        Ok(self)
    }

    /// `INSERT` the record. A column with no attribute at all falls back to
    /// its default; an attribute set to NULL is stored as NULL.
    pub fn insert(mut self, record: &mut Record, cascade: bool) -> Result<Self> {
        let model = Arc::clone(&self.model);
        let mut names = Vec::new();
        let mut params = Vec::new();

        for column in model.columns() {
            if column.field.is_autoincrement() {
                continue;
            }
            let name = self.sql_name(column)?;
            if record.attr(&column.name).is_none() && column.field.uses_default() {
                continue;
            }
            let value = if column.field.is_relation() {
                self.relation_value(record.attr_mut(&column.name), cascade)?
            } else {
                record.get(&column.name).cloned().unwrap_or_default()
            };
            if value.is_null() && column.field.is_not_null() {
                return Err(Error::MissingValue(name));
            }
            names.push(format!("\"{name}\""));
            params.push(value);
        }

        let sql = if names.is_empty() {
            // A declared primary key is required, so it is always among the
            // columns when the key is not generated.
            if !model.has_generated_pk() {
                return Err(Error::EmptyStatement(model.table_name().to_string()));
            }
            format!("INSERT INTO {} DEFAULT VALUES", self.quoted_table())
        } else {
            let placeholders = vec!["?"; names.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                self.quoted_table(),
                names.join(", ")
            )
        };
        self.set_head(Statement::new(ClauseKind::Insert, sql, params))?;
        Ok(self)
    }

    /// `UPDATE` every column, keyed by the record's frozen primary key.
    pub fn update(mut self, record: &mut Record, cascade: bool) -> Result<Self> {
        let model = Arc::clone(&self.model);
        let pk_name = self.sql_name(model.primary_key_column())?;
        let pk = record
            .pk()
            .cloned()
            .ok_or_else(|| Error::MissingValue(pk_name.clone()))?;

        let mut sets = Vec::new();
        let mut params = Vec::new();
        for column in model.columns() {
            let name = self.sql_name(column)?;
            let value = if column.field.is_relation() {
                self.relation_value(record.attr_mut(&column.name), cascade)?
            } else {
                record.get(&column.name).cloned().unwrap_or_default()
            };
            sets.push(format!("\"{name}\"=?"));
            params.push(value);
        }
        params.push(pk);

        let sql = format!(
            "UPDATE {} SET {} WHERE \"{pk_name}\"=?",
            self.quoted_table(),
            sets.join(", ")
        );
        self.set_head(Statement::new(ClauseKind::Update, sql, params))?;
        Ok(self)
    }

    /// `DELETE` the record's row. With `cascade`, attached related records
    /// are deleted first.
    pub fn delete(mut self, record: &mut Record, cascade: bool) -> Result<Self> {
        let model = Arc::clone(&self.model);
        let pk_name = self.sql_name(model.primary_key_column())?;
        let pk = record
            .pk()
            .cloned()
            .ok_or_else(|| Error::MissingValue(pk_name.clone()))?;

        if cascade {
            for column in model.columns().iter().filter(|c| c.field.is_relation()) {
                if let Some(related) = record.related_mut(&column.name) {
                    if related.pk().is_some() {
                        related.delete(self.db, cascade)?;
                    }
                }
            }
        }

        let sql = format!("DELETE FROM {} WHERE \"{pk_name}\"=?", self.quoted_table());
        self.set_head(Statement::new(ClauseKind::Delete, sql, vec![pk]))?;
        Ok(self)
    }

    pub fn select(mut self) -> Result<Self> {
        let table = self.model.table_name();
        let columns = self
            .model
            .columns()
            .iter()
            .map(|c| Ok(format!("\"{table}\".\"{}\"", self.sql_name(c)?)))
            .collect::<Result<Vec<_>>>()?;
        let sql = format!("SELECT {} FROM {}", columns.join(", "), self.quoted_table());
        self.set_head(Statement::new(ClauseKind::Select, sql, Vec::new()))?;
        self.shape = Some(ResultShape::Rows);
        Ok(self)
    }

    fn condition<'c>(
        &self,
        column: impl Into<ColumnRef<'c>>,
        predicate: Predicate,
        value: impl Into<Value>,
    ) -> Result<Condition> {
        let column = self.resolve_column(column.into())?;
        Ok(Condition::compare(column, predicate, value.into()))
    }

    /// Start the filter. A second `where_` is an error; chain with
    /// [`and_where`](Self::and_where) or [`or_where`](Self::or_where).
    pub fn where_<'c>(
        mut self,
        column: impl Into<ColumnRef<'c>>,
        predicate: Predicate,
        value: impl Into<Value>,
    ) -> Result<Self> {
        if self.filter.is_some() {
            return Err(Error::Syntax(
                "WHERE already given; use and_where or or_where".to_string(),
            ));
        }
        self.filter = Some(self.condition(column, predicate, value)?);
        Ok(self)
    }

    pub fn and_where<'c>(
        mut self,
        column: impl Into<ColumnRef<'c>>,
        predicate: Predicate,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let condition = self.condition(column, predicate, value)?;
        let filter = self
            .filter
            .take()
            .ok_or_else(|| Error::Syntax("AND without a preceding WHERE".to_string()))?;
        self.filter = Some(filter.and(condition));
        Ok(self)
    }

    pub fn or_where<'c>(
        mut self,
        column: impl Into<ColumnRef<'c>>,
        predicate: Predicate,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let condition = self.condition(column, predicate, value)?;
        self.filter = Some(match self.filter.take() {
            Some(filter) => filter.or(condition),
            None => condition,
        });
        Ok(self)
    }

    pub fn order<'c>(mut self, column: impl Into<ColumnRef<'c>>, direction: Direction) -> Result<Self> {
        let column = self.resolve_column(column.into())?;
        self.order.push((column, direction));
        Ok(self)
    }

    /// `limit(1)` fetches a single row instead of a list.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self.shape = Some(if n == 1 {
            ResultShape::Row
        } else {
            ResultShape::Rows
        });
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self.shape = Some(ResultShape::Rows);
        self
    }

    /// Render the accumulated clauses in the order head, `WHERE`,
    /// `ORDER BY`, `LIMIT`, `OFFSET`.
    pub fn build(mut self) -> Result<Self> {
        let head = self
            .head
            .clone()
            .ok_or_else(|| Error::Syntax("nothing to build".to_string()))?;
        let has_tail = self.filter.is_some()
            || !self.order.is_empty()
            || self.limit.is_some()
            || self.offset.is_some();
        if head.is_final() && has_tail {
            return Err(Error::Syntax(format!(
                "{:?} statement takes no WHERE, ORDER, LIMIT or OFFSET",
                head.kind()
            )));
        }

        let mut clauses = vec![head];
        if let Some(filter) = &self.filter {
            let mut sql = String::from("WHERE ");
            let mut params = Vec::new();
            filter.render(&mut sql, &mut params);
            clauses.push(Statement::new(ClauseKind::Where, sql, params));
        }
        if !self.order.is_empty() {
            let terms: Vec<_> = self
                .order
                .iter()
                .map(|(column, direction)| format!("\"{column}\" {}", direction.as_str()))
                .collect();
            clauses.push(Statement::new(
                ClauseKind::Order,
                format!("ORDER BY {}", terms.join(", ")),
                Vec::new(),
            ));
        }
        match (self.limit, self.offset) {
            (Some(limit), _) => clauses.push(Statement::new(
                ClauseKind::Limit,
                "LIMIT ?",
                vec![Value::Integer(limit)],
            )),
            (None, Some(_)) => clauses.push(Statement::new(
                ClauseKind::Limit,
                "LIMIT ?",
                vec![Value::Integer(-1)],
            )),
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            clauses.push(Statement::new(
                ClauseKind::Offset,
                "OFFSET ?",
                vec![Value::Integer(offset)],
            ));
        }

        self.sql = clauses
            .iter()
            .map(Statement::sql)
            .collect::<Vec<_>>()
            .join(" ");
        self.params = clauses
            .iter()
            .flat_map(|c| c.params().iter().cloned())
            .collect();
        self.built = true;
        Ok(self)
    }

    /// Run the built statement on a fresh connection and fetch according to
    /// the result shape.
    pub fn execute(mut self) -> Result<Self> {
        if !self.built {
            return Err(Error::Syntax("execute() called before build()".to_string()));
        }
        let inserting = self.head.as_ref().map(Statement::kind) == Some(ClauseKind::Insert);
        debug!(sql = %self.sql, params = self.params.len(), "executing statement");

        let conn = self.db.connect()?;
        {
            let mut stmt = conn.prepare(&self.sql)?;
            let columns = stmt.column_count();
            let params = params_from_iter(self.params.iter());
            self.result = match self.shape {
                Some(ResultShape::Rows) => Fetched::Rows(
                    stmt.query_map(params, |row| read_row(row, columns))?
                        .collect::<rusqlite::Result<Vec<_>>>()?,
                ),
                Some(ResultShape::Row) => stmt
                    .query_row(params, |row| read_row(row, columns))
                    .optional()?
                    .map_or(Fetched::None, Fetched::Row),
                None => {
                    stmt.execute(params)?;
                    Fetched::None
                }
            };
        }
        if inserting && self.model.has_generated_pk() {
            self.last_id = Some(conn.last_insert_rowid());
        }

        self.clear();
        Ok(self)
    }

    fn clear(&mut self) {
        self.head = None;
        self.filter = None;
        self.order.clear();
        self.limit = None;
        self.offset = None;
        self.shape = None;
        self.sql.clear();
        self.params.clear();
        self.built = false;
    }

    /// Compiled SQL; empty before `build()` and after `execute()`.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Row id assigned by the last `INSERT` into a model with a generated key.
    pub fn last_id(&self) -> Option<i64> {
        self.last_id
    }

    pub fn result(&self) -> &Fetched {
        &self.result
    }

    pub fn into_result(self) -> Fetched {
        self.result
    }
}

fn read_row(row: &rusqlite::Row<'_>, columns: usize) -> rusqlite::Result<Vec<Value>> {
    (0..columns).map(|i| row.get::<_, Value>(i)).collect()
}

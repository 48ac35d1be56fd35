//! Model instances.

use crate::db::Database;
use crate::error::Result;
use crate::orm::model::ModelMeta;
use crate::orm::query::QueryBuilder;
use crate::orm::value::Value;
use std::collections::BTreeMap;

/// Attribute of a record: a scalar, or a related record for a relation column
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Value(Value),
    Related(Box<Record>),
}

/// One row of a registered model, in memory
///
/// The primary key is tracked apart from the attributes. It is frozen the
/// first time it is set and decides whether [`Record::save`] inserts or
/// updates, and which row an update or delete targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: String,
    pk_column: String,
    pk: Option<Value>,
    attrs: BTreeMap<String, Attr>,
}

impl Record {
    pub fn new(meta: &ModelMeta) -> Self {
        Record {
            model: meta.name().to_string(),
            pk_column: meta.primary_key_column().name.clone(),
            pk: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Frozen primary key; `None` until persisted or explicitly set.
    pub fn pk(&self) -> Option<&Value> {
        self.pk.as_ref()
    }

    /// Set the primary key attribute. Only the first call freezes the value
    /// used to locate the row.
    pub fn set_pk(&mut self, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if self.pk.is_none() && !value.is_null() {
            self.pk = Some(value.clone());
        }
        self.attrs.insert(self.pk_column.clone(), Attr::Value(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.attrs.get(name) {
            Some(Attr::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attrs.insert(name.into(), Attr::Value(value.into()));
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn related(&self, name: &str) -> Option<&Record> {
        match self.attrs.get(name) {
            Some(Attr::Related(record)) => Some(record),
            _ => None,
        }
    }

    pub fn related_mut(&mut self, name: &str) -> Option<&mut Record> {
        match self.attrs.get_mut(name) {
            Some(Attr::Related(record)) => Some(record),
            _ => None,
        }
    }

    pub fn set_related(&mut self, name: impl Into<String>, record: Record) -> &mut Self {
        self.attrs
            .insert(name.into(), Attr::Related(Box::new(record)));
        self
    }

    pub fn with_related(mut self, name: impl Into<String>, record: Record) -> Self {
        self.set_related(name, record);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.get(name)
    }

    pub(crate) fn attr_mut(&mut self, name: &str) -> Option<&mut Attr> {
        self.attrs.get_mut(name)
    }

    /// Current value of the primary key attribute (not the frozen one).
    fn current_pk(&self) -> Option<Value> {
        match self.attrs.get(&self.pk_column)? {
            Attr::Value(Value::Null) => None,
            Attr::Value(value) => Some(value.clone()),
            Attr::Related(record) => record.pk().cloned(),
        }
    }

    /// Insert the record if it has no primary key yet, otherwise update it.
    /// With `cascade`, attached related records are saved first.
    pub fn save(&mut self, db: &Database, cascade: bool) -> Result<&mut Self> {
        let builder = QueryBuilder::new(db, &self.model)?;
        let builder = if self.pk.is_none() {
            builder.insert(self, cascade)?
        } else {
            builder.update(self, cascade)?
        };
        let builder = builder.build()?.execute()?;

        match builder.last_id() {
            Some(id) if id != 0 => {
                self.pk = None;
                self.set_pk(id);
            }
            _ => self.pk = self.current_pk(),
        }
        Ok(self)
    }

    /// Delete the row and forget the primary key. With `cascade`, attached
    /// related records are deleted first.
    pub fn delete(&mut self, db: &Database, cascade: bool) -> Result<&mut Self> {
        QueryBuilder::new(db, &self.model)?
            .delete(self, cascade)?
            .build()?
            .execute()?;
        self.pk = None;
        Ok(self)
    }
}

impl From<&Record> for Value {
    fn from(record: &Record) -> Self {
        record.pk.clone().unwrap_or_default()
    }
}

//! Turning fetched rows into records.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::orm::model::ModelMeta;
use crate::orm::query::Fetched;
use crate::orm::record::Record;
use crate::orm::value::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Builds [`Record`]s from a fetch result
///
/// Rows are read left to right in the model's declared column order. A
/// relation column registered with [`append_joins`](Self::append_joins) takes
/// the related model's columns in its place and yields a related record;
/// other relation columns keep their raw key. Joins go one level deep.
pub struct RowFactory<'db> {
    db: &'db Database,
    model: Arc<ModelMeta>,
    fetched: Fetched,
    joins: HashSet<String>,
}

impl<'db> RowFactory<'db> {
    pub fn new(db: &'db Database, model: &str, fetched: Fetched) -> Result<Self> {
        Ok(RowFactory {
            db,
            model: db.registry().resolve_reference(model)?,
            fetched,
            joins: HashSet::new(),
        })
    }

    /// Mark relation columns whose related columns follow in each row.
    pub fn append_joins<I, S>(&mut self, columns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in columns {
            let name = name.as_ref();
            match self.model.column(name) {
                Some(column) if column.field.is_relation() => {
                    self.joins.insert(column.name.clone());
                }
                _ => return Err(Error::unknown_column(self.model.name(), name)),
            }
        }
        Ok(self)
    }

    pub fn to_instances(&self) -> Result<Vec<Record>> {
        match &self.fetched {
            Fetched::None => Ok(Vec::new()),
            Fetched::Row(row) => Ok(vec![self.fill(row)?]),
            Fetched::Rows(rows) => rows.iter().map(|row| self.fill(row)).collect(),
        }
    }

    pub fn fill(&self, row: &[Value]) -> Result<Record> {
        let expected = self.width(&self.model, Some(&self.joins))?;
        if row.len() < expected {
            return Err(Error::RowShape {
                model: self.model.name().to_string(),
                expected,
                found: row.len(),
            });
        }
        let mut values = row.iter();
        self.fill_model(&self.model, &mut values, Some(&self.joins))
    }

    fn width(&self, meta: &ModelMeta, joins: Option<&HashSet<String>>) -> Result<usize> {
        let mut width = 0;
        for column in meta.columns() {
            match column.field.reference() {
                Some(reference) if joins.is_some_and(|j| j.contains(&column.name)) => {
                    let target = self.db.registry().resolve_reference(reference)?;
                    width += self.width(&target, None)?;
                }
                _ => width += 1,
            }
        }
        Ok(width)
    }

    fn fill_model<'r>(
        &self,
        meta: &ModelMeta,
        values: &mut impl Iterator<Item = &'r Value>,
        joins: Option<&HashSet<String>>,
    ) -> Result<Record> {
        let mut record = Record::new(meta);
        let pk_name = &meta.primary_key_column().name;

        for column in meta.columns() {
            match column.field.reference() {
                Some(reference) if joins.is_some_and(|j| j.contains(&column.name)) => {
                    let target = self.db.registry().resolve_reference(reference)?;
                    let related = self.fill_model(&target, values, None)?;
                    record.set_related(column.name.clone(), related);
                }
                _ => {
                    let value = values.next().cloned().unwrap_or_default();
                    if &column.name == pk_name {
                        record.set_pk(value);
                    } else {
                        record.set(column.name.clone(), value);
                    }
                }
            }
        }
        Ok(record)
    }
}

//! Model declarations and the registry of derived model metadata.
//!
//! A model is declared once as an ordered list of `(name, Field)` pairs and
//! registered under its type name. Registration derives the table name, binds
//! every field to its column name and owning model, and settles the primary
//! key (synthesizing an auto-incrementing `id` when none is declared). The
//! derived metadata is cached in the [`Registry`] until [`Registry::reset`].
//!
//! The registry is plain owned data: callers that share a `Database` across
//! threads must finish registering before the first query.

use crate::error::{Error, Result};
use crate::orm::field::Field;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// String used to join words in table and relation column names.
pub const WORD_JOINER: char = '_';

/// Name of the synthesized primary key column.
pub const DEFAULT_PK: &str = "id";

/// A Rust type whose instances are stored as rows of one table
pub trait Model {
    /// Type name, used for the table name and for relation lookups.
    const NAME: &'static str;

    /// Declared columns in order.
    fn fields() -> Vec<(&'static str, Field)>;

    fn definition() -> ModelDef {
        Self::fields()
            .into_iter()
            .fold(ModelDef::new(Self::NAME), |def, (name, field)| {
                def.field(name, field)
            })
    }
}

/// Declarative description of a model, built before registration
#[derive(Debug, Clone)]
pub struct ModelDef {
    name: String,
    fields: Vec<(String, Field)>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        ModelDef {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A field bound to its column name and owning model
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub model: String,
    pub name: String,
    pub field: Field,
}

/// Derived metadata of one registered model
#[derive(Debug)]
pub struct ModelMeta {
    name: String,
    table_name: String,
    columns: Vec<Column>,
    pk_index: usize,
}

impl ModelMeta {
    fn derive(def: ModelDef) -> Result<Self> {
        let ModelDef { name, fields } = def;

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(fields.len() + 1);
        for (column, field) in fields {
            field.validate(&column)?;
            if !seen.insert(column.clone()) {
                return Err(Error::Schema(format!(
                    "column \"{column}\" is declared twice in {name}"
                )));
            }
            columns.push(Column {
                model: name.clone(),
                name: column,
                field,
            });
        }

        let declared: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.field.is_primary_key())
            .map(|(i, _)| i)
            .collect();

        let pk_index = match declared.as_slice() {
            [] => {
                columns.insert(
                    0,
                    Column {
                        model: name.clone(),
                        name: DEFAULT_PK.to_string(),
                        field: Field::integer().primary_key().autoincrement(),
                    },
                );
                0
            }
            [index] => *index,
            _ => {
                return Err(Error::Schema(format!(
                    "{name} declares more than one primary key"
                )));
            }
        };

        Ok(ModelMeta {
            table_name: table_name_for(&name),
            name,
            columns,
            pk_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Declared columns, primary key included.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_column(&self) -> &Column {
        &self.columns[self.pk_index]
    }

    /// Whether the database assigns the primary key on insert.
    pub fn has_generated_pk(&self) -> bool {
        self.primary_key_column().field.is_autoincrement()
    }
}

/// Registered models, keyed by type name
#[derive(Debug, Default)]
pub struct Registry {
    models: Vec<Arc<ModelMeta>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Register a model, replacing any earlier registration with the same name.
    pub fn register(&mut self, def: ModelDef) -> Result<Arc<ModelMeta>> {
        let meta = Arc::new(ModelMeta::derive(def)?);
        match self.index.get(meta.name()) {
            Some(&i) => self.models[i] = Arc::clone(&meta),
            None => {
                self.index.insert(meta.name().to_string(), self.models.len());
                self.models.push(Arc::clone(&meta));
            }
        }
        Ok(meta)
    }

    pub fn register_model<M: Model>(&mut self) -> Result<Arc<ModelMeta>> {
        self.register(M::definition())
    }

    /// Drop all cached metadata.
    pub fn reset(&mut self) {
        self.models.clear();
        self.index.clear();
    }

    /// Look up a model by its type name.
    pub fn resolve_reference(&self, name: &str) -> Result<Arc<ModelMeta>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.models[i]))
            .ok_or_else(|| Error::UnresolvedReference(name.to_string()))
    }

    /// Registered models in registration order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelMeta>> {
        self.models.iter()
    }

    /// Columns of `model`. With `expand`, every relation is replaced depth-first
    /// by the referenced model's columns; a relation back to a model that is
    /// still being expanded is kept as is.
    pub fn columns(&self, model: &str, expand: bool) -> Result<Vec<Column>> {
        let meta = self.resolve_reference(model)?;
        if !expand {
            return Ok(meta.columns().to_vec());
        }

        let mut expanding = HashSet::new();
        let mut columns = Vec::new();
        self.expand_into(&meta, &mut expanding, &mut columns)?;
        Ok(columns)
    }

    fn expand_into(
        &self,
        meta: &ModelMeta,
        expanding: &mut HashSet<String>,
        out: &mut Vec<Column>,
    ) -> Result<()> {
        expanding.insert(meta.name().to_string());
        for column in meta.columns() {
            match column.field.reference() {
                Some(reference) if !expanding.contains(reference) => {
                    let target = self.resolve_reference(reference)?;
                    self.expand_into(&target, expanding, out)?;
                }
                _ => out.push(column.clone()),
            }
        }
        expanding.remove(meta.name());
        Ok(())
    }

    /// Storage name of a relation column: `<referenced_table>_<referenced_pk>`.
    pub fn relation_column_name(&self, column: &Column) -> Result<String> {
        let reference = column
            .field
            .reference()
            .ok_or_else(|| Error::Schema(format!("column \"{}\" is not a relation", column.name)))?;
        let target = self.resolve_reference(reference)?;
        Ok(format!(
            "{}{WORD_JOINER}{}",
            target.table_name(),
            target.primary_key_column().name
        ))
    }

    /// Name of the column as stored in the table.
    pub fn sql_column_name(&self, column: &Column) -> Result<String> {
        if column.field.is_relation() {
            self.relation_column_name(column)
        } else {
            Ok(column.name.clone())
        }
    }
}

/// Lower-case, joiner-separated table name: `MultipleWords` -> `multiple_words`.
pub fn table_name_for(type_name: &str) -> String {
    let mut name = String::with_capacity(type_name.len() + 4);
    for ch in type_name.chars() {
        let is_boundary = ch.is_uppercase() || ch == WORD_JOINER;
        if is_boundary && !name.is_empty() && !name.ends_with(WORD_JOINER) {
            name.push(WORD_JOINER);
        }
        if ch != WORD_JOINER {
            name.extend(ch.to_lowercase());
        }
    }
    name
}

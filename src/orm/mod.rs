//! A small model mapper over SQLite.
//!
//! Models are declared as ordered `(name, Field)` lists and registered with a
//! [`Database`](crate::db::Database). Records are saved, deleted and fetched
//! through single-use [`QueryBuilder`]s, and fetched rows become records
//! again through a [`RowFactory`].

pub mod factory;
pub mod field;
pub mod model;
pub mod query;
pub mod record;
pub mod statement;
pub mod value;

pub use factory::RowFactory;
pub use field::{Field, FieldKind, OnDelete};
pub use model::{Column, Model, ModelDef, ModelMeta, Registry, table_name_for};
pub use query::{ColumnRef, Fetched, QueryBuilder, ResultShape};
pub use record::{Attr, Record};
pub use statement::{ClauseKind, Condition, Direction, Predicate, Statement};
pub use value::Value;

use crate::error::Result;
use crate::orm::model::{Model, ModelDef, ModelMeta, Registry};
use crate::orm::query::QueryBuilder;
use crate::orm::record::Record;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Database file plus the models registered against it
///
/// No connection is held: every statement opens its own and closes it when
/// done.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    registry: Registry,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Database {
            path: path.as_ref().to_path_buf(),
            registry: Registry::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn register(&mut self, def: ModelDef) -> Result<Arc<ModelMeta>> {
        self.registry.register(def)
    }

    pub fn register_model<M: Model>(&mut self) -> Result<Arc<ModelMeta>> {
        self.registry.register_model::<M>()
    }

    /// Open a connection for one statement.
    pub fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Empty record of a registered model.
    pub fn record(&self, model: &str) -> Result<Record> {
        let meta = self.registry.resolve_reference(model)?;
        Ok(Record::new(&meta))
    }

    /// Create the table of `model`. `strict` fails if the table exists.
    pub fn create_table(&self, model: &str, strict: bool) -> Result<()> {
        let builder = QueryBuilder::new(self, model)?.create_table(strict)?;
        info!(table = builder.model().table_name(), "creating table");
        builder.build()?.execute()?;
        Ok(())
    }

    /// Create every registered model's table that does not exist yet.
    pub fn initialize_schema(&self) -> Result<()> {
        for meta in self.registry.models() {
            self.create_table(meta.name(), false)?;
        }
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let conn = self.connect()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

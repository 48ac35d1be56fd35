//! Application settings stores.

use crate::db::Database;
use crate::error::{Error, Result};
use rusqlite::OptionalExtension;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Settings document: a JSON object
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Where settings are loaded from and dumped to
pub trait SettingsProvider {
    fn load_settings(&self) -> Result<Settings>;
    fn dump_settings(&self, settings: &Settings) -> Result<()>;
}

/// Settings written when a store is first created.
pub fn default_settings() -> Settings {
    let mut settings = Settings::new();
    settings.insert("version".to_string(), json!(env!("CARGO_PKG_VERSION")));
    settings.insert("is_authorized".to_string(), json!(false));
    settings.insert("skip_authentication".to_string(), json!(true));
    settings
}

/// Which provider backs the settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsStore {
    #[default]
    Json,
    Db,
}

impl FromStr for SettingsStore {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(SettingsStore::Json),
            "db" => Ok(SettingsStore::Db),
            _ => Err(Error::InvalidSettingsStore(s.to_string())),
        }
    }
}

/// Settings kept in a JSON file
pub struct JsonSettingsProvider {
    path: PathBuf,
}

impl JsonSettingsProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonSettingsProvider {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SettingsProvider for JsonSettingsProvider {
    /// A missing file reads as empty settings.
    fn load_settings(&self) -> Result<Settings> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "settings file not found, using empty settings");
            return Ok(Settings::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn dump_settings(&self, settings: &Settings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

const SETTINGS_TABLE: &str = "settings";

/// Settings kept as one JSON row of the `settings` table
pub struct DbSettingsProvider {
    db: Database,
}

impl DbSettingsProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        DbSettingsProvider {
            db: Database::open(path),
        }
    }

    /// Create the table and store the default settings.
    fn load_fallback_settings(&self) -> Result<Settings> {
        warn!("settings table missing, seeding defaults");
        let settings = default_settings();
        let conn = self.db.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS \"settings\" (\"settings\" TEXT PRIMARY KEY)",
            [],
        )?;
        conn.execute(
            "INSERT INTO \"settings\" (\"settings\") VALUES (?1)",
            [serde_json::to_string(&settings)?],
        )?;
        Ok(settings)
    }
}

impl SettingsProvider for DbSettingsProvider {
    fn load_settings(&self) -> Result<Settings> {
        if !self.db.table_exists(SETTINGS_TABLE)? {
            return self.load_fallback_settings();
        }
        let conn = self.db.connect()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT \"settings\".\"settings\" FROM \"settings\" LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            Some(stored) => Ok(serde_json::from_str(&stored)?),
            None => self.load_fallback_settings(),
        }
    }

    fn dump_settings(&self, settings: &Settings) -> Result<()> {
        if !self.db.table_exists(SETTINGS_TABLE)? {
            self.load_fallback_settings()?;
        }
        let conn = self.db.connect()?;
        let content = serde_json::to_string(settings)?;
        let updated = conn.execute("UPDATE \"settings\" SET \"settings\"=?1", [&content])?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO \"settings\" (\"settings\") VALUES (?1)",
                [&content],
            )?;
        }
        Ok(())
    }
}

/// Provider for the chosen store.
pub fn provider(
    store: SettingsStore,
    settings_path: &Path,
    db_path: &Path,
) -> Box<dyn SettingsProvider> {
    match store {
        SettingsStore::Json => Box::new(JsonSettingsProvider::new(settings_path)),
        SettingsStore::Db => Box::new(DbSettingsProvider::new(db_path)),
    }
}

/// Interpret a command-line value as JSON, falling back to a plain string.
pub fn parse_setting_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

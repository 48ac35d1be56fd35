use crate::settings::SettingsStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "affaire")]
#[command(about = "Command-line task manager")]
#[command(version)]
pub struct Cli {
    /// Path of the task database
    #[arg(long, global = true, env = "AFFAIRE_DB", default_value = "affaire.db")]
    pub db: PathBuf,

    /// Path of the JSON settings file
    #[arg(
        long,
        global = true,
        env = "AFFAIRE_SETTINGS",
        default_value = "settings.json"
    )]
    pub settings: PathBuf,

    /// Settings store: json or db
    #[arg(long, global = true, default_value = "json")]
    pub store: SettingsStore,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the task table
    Init,

    /// Add a new task
    Add {
        /// Task text
        body: String,
        /// Expiry: +N days from now, or a YYYY-MM-DD date
        #[arg(long, short)]
        expires: Option<String>,
    },

    /// List tasks
    List {
        /// Only this task
        #[arg(long)]
        id: Option<i64>,
        /// Only tasks whose text contains this
        #[arg(long, short)]
        search: Option<String>,
        /// Hide finished tasks
        #[arg(long, short)]
        active: bool,
        /// At most this many tasks
        #[arg(long, short)]
        limit: Option<i64>,
    },

    /// Edit a task, or toggle it done/undone when nothing else is given
    Update {
        /// Task ID
        id: i64,
        /// New text
        #[arg(long, short)]
        body: Option<String>,
        /// New expiry
        #[arg(long, short)]
        expires: Option<String>,
    },

    /// Delete a task, or all tasks with --force
    Delete {
        /// Task ID (omit to delete all tasks)
        id: Option<i64>,
        /// Confirm deleting all tasks
        #[arg(long, short)]
        force: bool,
    },

    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all settings
    List,
    /// Show one setting
    Get {
        key: String,
    },
    /// Change one setting (JSON values are parsed, anything else is text)
    Set {
        key: String,
        value: String,
    },
}

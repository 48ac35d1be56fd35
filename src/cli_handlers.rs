use crate::error::{Error, Result};
use crate::models::Task;
use crate::settings::{self, SettingsProvider, SettingsStore};
use crate::tasks::{TaskFilter, TaskManager};
use std::path::Path;

/// Handle the init command
pub fn handle_init(db_path: &Path) -> Result<()> {
    let manager = TaskManager::open(db_path)?;
    if manager.is_initialized()? {
        println!("Already initialized: {}", db_path.display());
        return Ok(());
    }
    manager.init()?;
    println!("Initialized task database at {}", db_path.display());
    Ok(())
}

/// Handle the add command
pub fn handle_add(db_path: &Path, body: &str, expires: Option<&str>) -> Result<()> {
    let manager = open_initialized(db_path)?;
    let task = manager.create_task(body, expires)?;
    println!("Created task #{}: {}", task.id, task);
    Ok(())
}

/// Handle the list command
pub fn handle_list(db_path: &Path, filter: &TaskFilter) -> Result<()> {
    let manager = open_initialized(db_path)?;
    let tasks = manager.list_tasks(filter)?;

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for task in &tasks {
        println!("{}", task_line(task));
    }
    Ok(())
}

/// Handle the update command
pub fn handle_update(
    db_path: &Path,
    id: i64,
    body: Option<&str>,
    expires: Option<&str>,
) -> Result<()> {
    let manager = open_initialized(db_path)?;
    let task = manager.update_task(id, body, expires)?;
    println!("Updated task {}", task_line(&task));
    Ok(())
}

/// Handle the delete command
pub fn handle_delete(db_path: &Path, id: Option<i64>, force: bool) -> Result<()> {
    let manager = open_initialized(db_path)?;
    let removed = manager.delete_tasks(id, force)?;
    match id {
        Some(id) => println!("Deleted task #{id}"),
        None => println!("Deleted {removed} task(s)"),
    }
    Ok(())
}

/// Handle `config list`
pub fn handle_config_list(store: SettingsStore, settings_path: &Path, db_path: &Path) -> Result<()> {
    let provider = settings::provider(store, settings_path, db_path);
    let settings = provider.load_settings()?;
    if settings.is_empty() {
        println!("No settings.");
    }
    for (key, value) in &settings {
        println!("{key} = {value}");
    }
    Ok(())
}

/// Handle `config get`
pub fn handle_config_get(
    store: SettingsStore,
    settings_path: &Path,
    db_path: &Path,
    key: &str,
) -> Result<()> {
    let provider = settings::provider(store, settings_path, db_path);
    let settings = provider.load_settings()?;
    let value = settings
        .get(key)
        .ok_or_else(|| Error::SettingsKey(key.to_string()))?;
    println!("{value}");
    Ok(())
}

/// Handle `config set`
pub fn handle_config_set(
    store: SettingsStore,
    settings_path: &Path,
    db_path: &Path,
    key: &str,
    value: &str,
) -> Result<()> {
    let provider = settings::provider(store, settings_path, db_path);
    let mut settings = provider.load_settings()?;
    let value = settings::parse_setting_value(value);
    println!("{key} = {value}");
    settings.insert(key.to_string(), value);
    provider.dump_settings(&settings)?;
    Ok(())
}

fn open_initialized(db_path: &Path) -> Result<TaskManager> {
    let manager = TaskManager::open(db_path)?;
    if !manager.is_initialized()? {
        return Err(Error::NotInitialized);
    }
    Ok(manager)
}

fn task_line(task: &Task) -> String {
    let mark = if task.is_active { " " } else { "x" };
    format!("#{} [{mark}] {task}", task.id)
}

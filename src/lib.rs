pub mod cli;
pub mod cli_handlers;
pub mod db;
pub mod error;
pub mod models;
pub mod orm;
pub mod settings;
pub mod tasks;

pub use error::{Error, Result};
pub use models::Task;

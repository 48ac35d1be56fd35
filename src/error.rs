use thiserror::Error;

/// All possible errors raised by the model mapper and the task manager
#[derive(Error, Debug)]
pub enum Error {
    #[error("Column \"{column}\" declares a NULL default but is NOT NULL")]
    Configuration { column: String },

    #[error("Model named {0} does not exist")]
    UnresolvedReference(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Column \"{0}\" requires a value")]
    MissingValue(String),

    #[error("The INSERT into \"{0}\" contains no columns or values")]
    EmptyStatement(String),

    #[error("The field {column} is not defined in the model {model}")]
    UnknownColumn { model: String, column: String },

    #[error("SQL syntax error: {0}")]
    Syntax(String),

    #[error("Row for {model} ended after {found} values, expected at least {expected}")]
    RowShape {
        model: String,
        expected: usize,
        found: usize,
    },

    #[error("Not initialized. Run 'affaire init' first.")]
    NotInitialized,

    #[error("Task #{0} not found")]
    TaskNotFound(i64),

    #[error("Invalid expiry \"{0}\": use +N (days) or a YYYY-MM-DD date")]
    InvalidExpiry(String),

    #[error("This action will remove all your tasks. Re-run with --force to confirm.")]
    ConfirmationRequired,

    #[error("Setting \"{0}\" is not defined")]
    SettingsKey(String),

    #[error("Unknown settings store \"{0}\" (expected json or db)")]
    InvalidSettingsStore(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date error: {0}")]
    Date(#[from] chrono::ParseError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn unknown_column(model: &str, column: &str) -> Self {
        Error::UnknownColumn {
            model: model.to_string(),
            column: column.to_string(),
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV source could not be read: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook source could not be read: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Environment variable {name} is not usable: {source}")]
    Env {
        name: &'static str,
        #[source]
        source: std::env::VarError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source file is unreadable: {0}")]
    Source(String),

    #[error("Directory store error: {message}")]
    Store { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Purge for event '{event_id}' was not confirmed")]
    PurgeNotConfirmed { event_id: String },

    #[error("Purge failed for event '{event_id}': {message}")]
    Purge { event_id: String, message: String },

    #[error("Cannot {action} while session is {state}")]
    InvalidState { action: &'static str, state: String },
}

impl SyncError {
    pub fn store(message: impl Into<String>) -> Self {
        SyncError::Store {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

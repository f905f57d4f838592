use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record store error on {entity}: {message}")]
    Store { entity: String, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection to {0} failed")]
    ConnectionFailed(String),

    #[error("Version conflict on {entity} {id} after {attempts} attempts")]
    Conflict {
        entity: String,
        id: i64,
        attempts: usize,
    },
}

impl AppError {
    pub fn store(entity: &str, message: impl Into<String>) -> Self {
        AppError::Store {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

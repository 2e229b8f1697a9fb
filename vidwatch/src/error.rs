//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseSqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool, network or browser failure while fetching content.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Malformed output from an external tool.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A canonical account identifier could not be derived.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The notification could not be delivered to its destination.
    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("No monitor registered for platform: {0}")]
    UnknownPlatform(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }
}

impl From<process_utils::ProcessError> for Error {
    fn from(err: process_utils::ProcessError) -> Self {
        Self::Fetch(err.to_string())
    }
}

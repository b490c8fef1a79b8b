//! Core error types for the Arenarr domain

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArenarrError {
    #[error("Event not found: {id}")]
    EventNotFound { id: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid quality profile: {profile}")]
    InvalidQualityProfile { profile: String },

    #[error("Indexer error: {message}")]
    IndexerError { message: String },

    #[error("Rate limited by {service}, retry after {retry_after_secs}s")]
    RateLimited {
        service: String,
        retry_after_secs: u64,
    },

    #[error("Domain validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    #[error("External service error: {service} - {error}")]
    ExternalServiceError { service: String, error: String },

    #[error("Download client error: {client} - {error}")]
    DownloadClientError { client: String, error: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Import error: {operation} - {message}")]
    ImportError { operation: String, message: String },

    #[error("File system error: {path} - {error}")]
    FileSystemError { path: String, error: String },

    #[error("Configuration error: {field} - {message}")]
    ConfigurationError { field: String, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Operation timed out: {operation} after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: Box<ArenarrError>,
    },
}

pub type Result<T> = std::result::Result<T, ArenarrError>;

impl ArenarrError {
    /// Whether a retry on the next cycle can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ArenarrError::NetworkError { .. }
                | ArenarrError::Timeout { .. }
                | ArenarrError::RateLimited { .. }
                | ArenarrError::ExternalServiceError { .. }
        )
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ArenarrError {
    fn from(err: sqlx::Error) -> Self {
        ArenarrError::DatabaseError {
            message: err.to_string(),
        }
    }
}

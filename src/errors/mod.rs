use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Record errors
    #[error("Record not found in {collection} (id={id})")]
    NotFound { collection: &'static str, id: String },

    #[error("Invalid record for {collection}: {message}")]
    InvalidRecord {
        collection: &'static str,
        message: String,
    },

    // Remote errors
    #[error("Remote request failed: {0}")]
    Remote(#[from] gateway::GatewayError),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type AppResult<T> = Result<T, AppError>;

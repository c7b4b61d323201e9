use thiserror::Error;

/// Errors raised by the persistent usage store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database operation failed: {0}")]
    OperationFailed(String),

    #[error("Database corruption detected: {0}")]
    Corruption(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

//! Error types for credential storage

/// Errors from the client-side stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("store parse error: {0}")]
    StoreParse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("unknown period filter: {0}")]
    UnknownFilter(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict on {identifier}: {reason}")]
    Conflict { identifier: String, reason: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("core error: {0}")]
    Core(#[from] flowsync_core::CoreError),
}

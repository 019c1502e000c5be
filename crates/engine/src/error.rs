use flowsync_core::CoreError;
use flowsync_storage::StorageError;
use thiserror::Error;

use crate::traits::DiscoveryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("flow not found: {0}")]
    NotFound(String),

    #[error("flow is locked: {0}")]
    LockedRecord(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no changes to submit")]
    NoOpDiff,

    #[error("no current reconciliation result for {0}")]
    StaleReconciliation(String),

    #[error("selection is empty")]
    EmptySelection,

    #[error("selection includes fields outside the difference set: {}", fields.join(", "))]
    InvalidSelection { fields: Vec<String> },

    #[error("discovery source error: {0}")]
    DiscoverySource(#[from] DiscoveryError),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("edit session is closed")]
    SessionClosed,

    #[error("config error: {0}")]
    Config(String),
}

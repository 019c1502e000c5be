use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("reserved field cannot be written: {0}")]
    ReservedField(String),

    #[error("unknown field: {0}")]
    UnknownField(String),
}

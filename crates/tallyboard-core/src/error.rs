use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller asked for something out of bounds; nothing was fetched.
    #[error("{0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

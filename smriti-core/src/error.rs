//! Crate-wide error type for the Smriti memory engine.

/// Result type alias used throughout `smriti-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the memory engine.
///
/// The top-level query surface (`recall`, `HybridSearch::search`) never
/// propagates these to its caller — it degrades to an empty result
/// instead. Write APIs (`crystallize`, `persist`, store mutations)
/// surface them as typed returns.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("samskara not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedder error: {0}")]
    Embedding(#[from] anyhow::Error),

    #[error("consolidation cycle cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    /// Whether a caller could reasonably retry this operation.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Storage(_) | Error::Io(_) | Error::Embedding(_) => true,
            Error::NotFound(_)
            | Error::Serialization(_)
            | Error::InvalidInput(_)
            | Error::Configuration(_)
            | Error::Cancelled(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_recoverable() {
        assert!(Error::Storage("disk full".into()).is_recoverable());
    }

    #[test]
    fn not_found_is_not_recoverable() {
        assert!(!Error::NotFound(uuid::Uuid::nil()).is_recoverable());
    }
}

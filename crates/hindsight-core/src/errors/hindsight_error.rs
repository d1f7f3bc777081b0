use super::{ReifyError, StorageError};

/// Top-level error type for hindsight.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum HindsightError {
    #[error("not found: {item_type}#{item_id}")]
    NotFound { item_type: String, item_id: String },

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("reify error: {0}")]
    ReifyError(#[from] ReifyError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl HindsightError {
    pub fn not_found(item_type: &str, item_id: impl ToString) -> Self {
        Self::NotFound {
            item_type: item_type.to_string(),
            item_id: item_id.to_string(),
        }
    }

    /// Whether the underlying read view could not be established.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StorageError(StorageError::Unavailable { .. }))
    }

    /// Whether this error stems from a malformed relationship descriptor.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ReifyError(
                ReifyError::Configuration(_)
                    | ReifyError::UnknownKind(_)
                    | ReifyError::UnknownRelationship { .. }
                    | ReifyError::RecursionLimit { .. }
            )
        )
    }

    /// Whether a stored payload could not be turned back into attributes.
    pub fn is_deserialization(&self) -> bool {
        matches!(
            self,
            Self::ReifyError(ReifyError::Deserialization { .. } | ReifyError::MissingPayload { .. })
        )
    }
}

/// Convenience type alias.
pub type HindsightResult<T> = Result<T, HindsightError>;

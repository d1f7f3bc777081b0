/// Errors raised while resolving, rehydrating or walking history.
#[derive(Debug, thiserror::Error)]
pub enum ReifyError {
    #[error("invalid relationship configuration: {0}")]
    Configuration(String),

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("unknown relationship {relationship} on {item_type}")]
    UnknownRelationship {
        item_type: String,
        relationship: String,
    },

    #[error("cannot deserialize {item_type}#{item_id}: {reason}")]
    Deserialization {
        item_type: String,
        item_id: i64,
        reason: String,
    },

    #[error("version {sequence} of {item_type} has no attribute payload for a {event} event")]
    MissingPayload {
        item_type: String,
        sequence: u64,
        event: String,
    },

    #[error("recursion depth {depth} exceeds ceiling {max_depth} at {item_type}")]
    RecursionLimit {
        item_type: String,
        depth: usize,
        max_depth: usize,
    },

    #[error("deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u128 },
}

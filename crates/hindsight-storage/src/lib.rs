//! # hindsight-storage
//!
//! SQLite persistence for the hindsight version store.
//! Single write connection + read pool (WAL mode), forward-only migrations,
//! raw queries over the `versions` and `live_entities` tables, a
//! snapshot-scoped [`reader::SqliteVersionReader`], and the reference
//! [`recorder::Recorder`] that writes live rows and version rows together.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod reader;
pub mod recorder;

pub use engine::StorageEngine;
pub use reader::SqliteVersionReader;
pub use recorder::Recorder;

/// Helper to convert a string message into a HindsightError::StorageError.
pub fn to_storage_err(msg: String) -> hindsight_core::HindsightError {
    hindsight_core::HindsightError::StorageError(
        hindsight_core::errors::StorageError::SqliteError { message: msg },
    )
}

/// Helper for failures to establish or hold a read view.
pub fn to_unavailable_err(reason: String) -> hindsight_core::HindsightError {
    hindsight_core::HindsightError::StorageError(
        hindsight_core::errors::StorageError::Unavailable { reason },
    )
}

/// Classify a SQLite failure. Contention, interruption and an unopenable file
/// mean the store cannot serve the read; everything else is a query error.
pub fn from_sqlite_err(e: rusqlite::Error) -> hindsight_core::HindsightError {
    use rusqlite::ErrorCode;
    match e.sqlite_error_code() {
        Some(
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::OperationInterrupted
            | ErrorCode::CannotOpen,
        ) => to_unavailable_err(e.to_string()),
        _ => to_storage_err(e.to_string()),
    }
}

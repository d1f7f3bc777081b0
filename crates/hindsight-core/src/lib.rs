//! # hindsight-core
//!
//! Foundation types for the hindsight temporal versioning engine.
//! Version records, attribute sets, relationship descriptors, historical
//! entities, the schema registry, error types, configuration and the
//! store/engine traits. No I/O lives here.

pub mod config;
pub mod errors;
pub mod models;
pub mod schema;
pub mod traits;

pub use config::HindsightConfig;
pub use errors::{HindsightError, HindsightResult};
pub use schema::SchemaRegistry;

//! # hindsight-reify
//!
//! Reconstructs entities and their nested relationship graphs as they
//! existed at a past instant.
//!
//! - [`resolver`] finds the version that was current at `as_of`.
//! - [`rehydrate`] turns a stored payload back into typed attributes.
//! - [`walker`] resolves declared relationships recursively at one instant.
//! - [`engine::ReificationEngine`] runs all of it inside one read transaction.

pub mod context;
pub mod engine;
pub mod rehydrate;
pub mod resolver;
pub mod walker;

pub use context::ReifyOptions;
pub use engine::{ReadSession, ReificationEngine};

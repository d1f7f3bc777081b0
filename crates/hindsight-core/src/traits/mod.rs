mod reification_engine;
mod version_reader;

pub use reification_engine::IReificationEngine;
pub use version_reader::IVersionReader;

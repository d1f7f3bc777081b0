pub mod reify_config;
pub mod storage_config;

use serde::{Deserialize, Serialize};

pub use reify_config::ReifyConfig;
pub use storage_config::StorageConfig;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HindsightConfig {
    pub storage: StorageConfig,
    pub reify: ReifyConfig,
}

impl HindsightConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

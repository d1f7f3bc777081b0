//! Reification configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the reification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReifyConfig {
    /// Recursion ceiling for the relationship walk. Also bounds the depth of
    /// the descriptor graph accepted at registration.
    pub max_depth: usize,
    /// Default deadline applied to every reify call, if any.
    pub deadline_ms: Option<u64>,
    /// Missing required payload fields are an error instead of falling back
    /// to the live value.
    pub strict_payloads: bool,
}

impl ReifyConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for ReifyConfig {
    fn default() -> Self {
        Self {
            max_depth: 16,
            deadline_ms: None,
            strict_payloads: true,
        }
    }
}

//! Per-call walk state: the instant, recursion depth and deadline.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use hindsight_core::config::ReifyConfig;
use hindsight_core::errors::{HindsightResult, ReifyError};

/// Caller overrides for a single reification.
#[derive(Debug, Clone, Default)]
pub struct ReifyOptions {
    pub include_nested: bool,
    /// Replaces the configured deadline.
    pub deadline: Option<Duration>,
    /// Replaces the configured payload strictness.
    pub strict_payloads: Option<bool>,
}

impl ReifyOptions {
    pub fn nested() -> Self {
        Self {
            include_nested: true,
            ..Self::default()
        }
    }

    pub fn shallow() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn strict_payloads(mut self, strict: bool) -> Self {
        self.strict_payloads = Some(strict);
        self
    }
}

/// Immutable view of where a walk stands. Children get a copy one level deeper.
#[derive(Debug, Clone, Copy)]
pub struct WalkContext {
    pub as_of: DateTime<Utc>,
    pub depth: usize,
    pub max_depth: usize,
    pub strict_payloads: bool,
    started: Instant,
    deadline: Option<Duration>,
}

impl WalkContext {
    pub fn new(as_of: DateTime<Utc>, config: &ReifyConfig, options: &ReifyOptions) -> Self {
        Self {
            as_of,
            depth: 0,
            max_depth: config.max_depth,
            strict_payloads: options.strict_payloads.unwrap_or(config.strict_payloads),
            started: Instant::now(),
            deadline: options.deadline.or_else(|| config.deadline()),
        }
    }

    pub fn check_deadline(&self) -> HindsightResult<()> {
        if let Some(limit) = self.deadline {
            let elapsed = self.started.elapsed();
            if elapsed >= limit {
                return Err(ReifyError::DeadlineExceeded {
                    elapsed_ms: elapsed.as_millis(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Context for the children of an `item_type` entity.
    pub fn descend(&self, item_type: &str) -> HindsightResult<Self> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(ReifyError::RecursionLimit {
                item_type: item_type.to_string(),
                depth,
                max_depth: self.max_depth,
            }
            .into());
        }
        Ok(Self { depth, ..*self })
    }
}

use std::time::Duration;

use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::ConfigError;


/// What to do with a successful response whose mutation is no longer pending.
///
/// This happens when a mutation was expired or abandoned before its operation resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LateConfirmation {
    /// Write the canonical value to the authority anyway.
    #[default]
    Apply,
    /// Drop the response.
    Ignore,
}

/// Settings for [`Optimistic`](crate::Optimistic).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Age in milliseconds after which [`expire`](crate::Optimistic::expire) reverts a pending mutation.
    pub timeout_ms: Option<u64>,
    /// Maximum number of mutations pending at once.
    pub max_pending: Option<usize>,
    pub late_confirmation: LateConfirmation,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = Some(max_pending);
        self
    }
    pub fn with_late_confirmation(mut self, late_confirmation: LateConfirmation) -> Self {
        self.late_confirmation = late_confirmation;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_pending == Some(0) {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

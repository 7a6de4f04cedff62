//! Convergence tuning knobs.
//!
//! The interval and timeout are operational constants, not part of the
//! algorithm; both are loaded from configuration with sensible defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_converge_interval_ms() -> u64 {
    30_000
}

fn default_freeze_timeout_ms() -> u64 {
    300_000
}

/// Tuning for the convergence worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvergenceConfig {
    /// Sleep between iterations when nothing wakes the loop early.
    #[serde(default = "default_converge_interval_ms")]
    pub converge_interval_ms: u64,
    /// How long agents may sit frozen while suspension keeps being denied
    /// before the loop rolls the freeze back.
    #[serde(default = "default_freeze_timeout_ms")]
    pub freeze_timeout_ms: u64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        ConvergenceConfig {
            converge_interval_ms: default_converge_interval_ms(),
            freeze_timeout_ms: default_freeze_timeout_ms(),
        }
    }
}

impl ConvergenceConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn converge_interval(&self) -> Duration {
        Duration::from_millis(self.converge_interval_ms)
    }

    pub fn freeze_timeout(&self) -> Duration {
        Duration::from_millis(self.freeze_timeout_ms)
    }
}

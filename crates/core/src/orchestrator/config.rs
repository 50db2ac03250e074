//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

/// Configuration for the conversion orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Time budget for one file's conversion, in seconds.
    /// On expiry the file is failed with reason `timeout`; no retries.
    #[serde(default = "default_timeout")]
    pub conversion_timeout_secs: u64,

    /// How long `stop` waits for cancelled jobs to wind down (milliseconds).
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

fn default_timeout() -> u64 {
    120
}

fn default_shutdown_grace() -> u64 {
    5000
}

impl OrchestratorConfig {
    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.conversion_timeout_secs = secs;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            conversion_timeout_secs: default_timeout(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            conversion_timeout_secs: config.transcoder.timeout_secs,
            ..Default::default()
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Loop configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the capture/convert loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Cadence sleep between iterations, in milliseconds
    pub frame_interval_ms: u64,
    /// Bounded wait for a new frame during acquisition, in milliseconds
    pub acquire_timeout_ms: u64,
    /// Seconds between throughput reports
    pub stats_interval_secs: u64,
    /// Validate converted output every N frames (0 disables validation)
    pub validate_every: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16, // ~60 fps tick
            acquire_timeout_ms: 100,
            stats_interval_secs: 5,
            validate_every: 300,
        }
    }
}

impl LoopConfig {
    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&raw).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

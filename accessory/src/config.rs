//! Accessory configuration
//!
//! Loaded for the accessory by the host platform's config layer; every
//! tuning knob has a default so a minimal config is just the device
//! address and code.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BridgeError;

fn default_name() -> String {
    "Slide Curtain".to_string()
}

fn default_tolerance() -> u8 {
    7
}

fn default_closing_time() -> u64 {
    20
}

fn default_poll_interval() -> u64 {
    10
}

/// Configuration for one bridged curtain.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessoryConfig {
    /// Display name for the accessory.
    #[serde(default = "default_name")]
    pub name: String,
    /// Device network address, `host` or `host:port`.
    pub host: String,
    /// Per-installation device code used for HTTP Basic auth.
    pub code: String,
    /// Maximum reported-position delta treated as "at rest at an extreme",
    /// and the threshold for declaring a move arrived.
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
    /// Seconds the curtain needs for a full close; sizes the moving-window
    /// timeout.
    #[serde(default = "default_closing_time")]
    pub closing_time: u64,
    /// Baseline poll cadence in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl AccessoryConfig {
    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Time the device needs for a full traversal.
    pub fn travel_duration(&self) -> Duration {
        Duration::from_secs(self.closing_time)
    }

    /// Baseline poll cadence.
    pub fn poll_cadence(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

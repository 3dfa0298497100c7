//! Slide HTTP RPC Client
//!
//! Implements the local HTTP API exposed by Slide curtain controllers.
//! The device speaks a two-method JSON RPC over plain HTTP on the local
//! network, authenticated with HTTP Basic using a fixed username and a
//! per-installation device code.

mod client;

pub use client::*;

/// Fixed username the Slide local API expects for HTTP Basic auth.
/// The password is the per-installation device code.
pub const BASIC_AUTH_USER: &str = "user";

/// A Slide controller reachable on the local network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideDevice {
    /// Network address, `host` or `host:port`.
    pub host: String,
    /// Per-installation device code.
    pub code: String,
}

impl SlideDevice {
    pub fn new(host: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            code: code.into(),
        }
    }

    /// Base URL for RPC calls against this device.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.host)
    }
}

impl std::fmt::Display for SlideDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Slide at {}", self.base_url())
    }
}

//! Error types for the accessory bridge

use slidebridge_rpc::SlideError;
use thiserror::Error;

/// Errors surfaced to the accessory host.
///
/// Only commanded writes and configuration loading fail loudly; read-path
/// operations fall back to the last-known state instead of returning these.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Device(#[from] SlideError),

    #[error("Configuration error: {0}")]
    Config(String),
}

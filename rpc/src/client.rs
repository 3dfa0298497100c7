//! Slide HTTP RPC client

use crate::{SlideDevice, BASIC_AUTH_USER};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Slide-specific error types
#[derive(Debug, Error)]
pub enum SlideError {
    #[error("Connection timeout after {duration_ms}ms during {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    #[error("Connection refused: {url} - {cause}")]
    ConnectionRefused { url: String, cause: String },

    #[error("Device returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl SlideError {
    /// Create a timeout error with operation context
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        SlideError::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Network-level failures, as opposed to the device answering badly.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SlideError::Timeout { .. }
                | SlideError::ConnectionRefused { .. }
                | SlideError::RequestFailed(_)
        )
    }
}

impl From<reqwest::Error> for SlideError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SlideError::Timeout {
                operation: "HTTP request".to_string(),
                // Actual duration is supplied where the call site knows it
                duration_ms: TimeoutConfig::default().command_ms,
            }
        } else if err.is_connect() {
            let url = err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            SlideError::ConnectionRefused {
                url,
                cause: err.to_string(),
            }
        } else if err.is_decode() {
            SlideError::MalformedResponse(err.to_string())
        } else {
            SlideError::RequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SlideError {
    fn from(err: serde_json::Error) -> Self {
        SlideError::MalformedResponse(err.to_string())
    }
}

/// Timeout configuration for the two RPC operation types
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for position queries (`Slide.GetInfo`)
    pub query_ms: u64,
    /// Timeout for movement commands (`Slide.SetPos`); the device
    /// acknowledges before the move completes, so this stays short
    pub command_ms: u64,
    /// Connection timeout
    pub connect_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            query_ms: 5000,
            command_ms: 10000,
            connect_ms: 5000,
        }
    }
}

/// Response body of `Slide.GetInfo`. Additional fields the device reports
/// (identifiers, calibration data) are ignored.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SlideInfo {
    /// Device-native position: 1.0 fully closed, 0.0 fully open.
    pub pos: f64,
}

/// Client for a single Slide controller
pub struct SlideClient {
    http: Client,
    base_url: String,
    code: String,
    timeouts: TimeoutConfig,
}

impl SlideClient {
    /// Create a client with default timeouts
    pub fn new(device: &SlideDevice) -> Result<Self, SlideError> {
        Self::with_config(device, TimeoutConfig::default())
    }

    /// Create a client with custom timeout configuration
    pub fn with_config(device: &SlideDevice, timeouts: TimeoutConfig) -> Result<Self, SlideError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeouts.command_ms))
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .build()
            .map_err(|e| SlideError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http,
            base_url: device.base_url(),
            code: device.code.clone(),
            timeouts,
        })
    }

    /// Get the base URL for this client
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the timeout configuration
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    fn rpc_url(&self, method: &str) -> String {
        format!("{}/rpc/{}", self.base_url, method)
    }

    fn classify(&self, err: reqwest::Error, operation: &str, timeout_ms: u64) -> SlideError {
        if err.is_timeout() {
            SlideError::timeout(operation, timeout_ms)
        } else {
            err.into()
        }
    }

    /// Fetch the device's current state.
    pub async fn get_info(&self) -> Result<SlideInfo, SlideError> {
        let response = self
            .http
            .post(self.rpc_url("Slide.GetInfo"))
            .basic_auth(BASIC_AUTH_USER, Some(&self.code))
            .timeout(Duration::from_millis(self.timeouts.query_ms))
            .send()
            .await
            .map_err(|e| self.classify(e, "Slide.GetInfo", self.timeouts.query_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlideError::HttpStatus {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await.map_err(SlideError::from)?;
        let info: SlideInfo = serde_json::from_str(&body)?;
        debug!(pos = info.pos, "Slide.GetInfo");
        Ok(info)
    }

    /// Command the device to move to a raw position (1.0 closed, 0.0 open).
    /// The device acknowledges immediately; the move itself completes later.
    pub async fn set_pos(&self, pos: f64) -> Result<(), SlideError> {
        let response = self
            .http
            .post(self.rpc_url("Slide.SetPos"))
            .basic_auth(BASIC_AUTH_USER, Some(&self.code))
            .json(&serde_json::json!({ "pos": pos }))
            .send()
            .await
            .map_err(|e| self.classify(e, "Slide.SetPos", self.timeouts.command_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlideError::HttpStatus {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!(pos, "Slide.SetPos acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> SlideClient {
        let device = SlideDevice::new(server.address().to_string(), "123456");
        SlideClient::new(&device).unwrap()
    }

    #[tokio::test]
    async fn get_info_parses_position() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/rpc/Slide.GetInfo");
                then.status(200)
                    .json_body(serde_json::json!({ "pos": 0.3, "slide_id": "slide_abc" }));
            })
            .await;

        let info = client_for(&server).get_info().await.unwrap();
        assert!((info.pos - 0.3).abs() < f64::EPSILON);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_info_sends_basic_auth_for_fixed_user() {
        let server = MockServer::start_async().await;
        // base64("user:123456")
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rpc/Slide.GetInfo")
                    .header("authorization", "Basic dXNlcjoxMjM0NTY=");
                then.status(200).json_body(serde_json::json!({ "pos": 1.0 }));
            })
            .await;

        client_for(&server).get_info().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_device_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rpc/Slide.GetInfo");
                then.status(503).body("busy");
            })
            .await;

        let err = client_for(&server).get_info().await.unwrap_err();
        match err {
            SlideError::HttpStatus { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "busy");
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
        assert!(!SlideError::HttpStatus {
            status: 503,
            message: String::new()
        }
        .is_transport());
    }

    #[tokio::test]
    async fn unparsable_body_is_malformed_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rpc/Slide.GetInfo");
                then.status(200).body("not json");
            })
            .await;

        let err = client_for(&server).get_info().await.unwrap_err();
        assert!(matches!(err, SlideError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn set_pos_posts_raw_position_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rpc/Slide.SetPos")
                    .json_body(serde_json::json!({ "pos": 0.2 }));
                then.status(200).json_body(serde_json::json!({ "response": "success" }));
            })
            .await;

        client_for(&server).set_pos(0.2).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn set_pos_surfaces_device_rejection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rpc/Slide.SetPos");
                then.status(401).body("invalid code");
            })
            .await;

        let err = client_for(&server).set_pos(0.5).await.unwrap_err();
        assert!(matches!(err, SlideError::HttpStatus { status: 401, .. }));
    }

    #[test]
    fn client_carries_device_base_url_and_timeouts() {
        let device = SlideDevice::new("192.168.1.50", "123456");
        let client = SlideClient::new(&device).unwrap();
        assert_eq!(client.base_url(), "http://192.168.1.50");
        assert_eq!(client.timeouts().query_ms, 5000);
        assert_eq!(client.timeouts().command_ms, 10000);
    }

    #[test]
    fn transport_classification() {
        assert!(SlideError::timeout("Slide.GetInfo", 5000).is_transport());
        assert!(SlideError::ConnectionRefused {
            url: "http://192.168.1.50".to_string(),
            cause: "refused".to_string(),
        }
        .is_transport());
        assert!(SlideError::RequestFailed("channel closed".to_string()).is_transport());
        assert!(!SlideError::MalformedResponse("eof".to_string()).is_transport());
    }

    #[test]
    fn timeout_error_carries_context() {
        let err = SlideError::timeout("Slide.SetPos", 10000);
        let text = err.to_string();
        assert!(text.contains("Slide.SetPos"));
        assert!(text.contains("10000ms"));
    }
}

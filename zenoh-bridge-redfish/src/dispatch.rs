//! Delivery of extracted samples.

use std::future::Future;
use std::sync::Arc;

use redfish_common::{Format, KeyExprBuilder, SampleRecord, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Bridge name reported in status messages.
pub const BRIDGE_NAME: &str = "redfish";

/// Dispatch error.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to encode record: {0}")]
    Encode(#[from] redfish_common::Error),

    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },
}

/// Sink for extracted samples.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, record: SampleRecord)
    -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// Publishes every record to Zenoh under
/// `<prefix>/<host>/<plugin_instance>/<type>/<type_instance>`.
#[derive(Clone, Debug)]
pub struct ZenohDispatcher {
    session: Arc<zenoh::Session>,
    keys: KeyExprBuilder,
    format: Format,
}

impl ZenohDispatcher {
    pub fn new(session: Arc<zenoh::Session>, key_prefix: &str, format: Format) -> Self {
        Self {
            session,
            keys: KeyExprBuilder::new(key_prefix),
            format,
        }
    }

    pub fn keys(&self) -> &KeyExprBuilder {
        &self.keys
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Publish the bridge status, always as JSON, to `<prefix>/@/status`.
    pub async fn publish_status(&self, status: &BridgeStatus) -> Result<(), DispatchError> {
        let key = self.keys.status_key();
        let payload = encode(status, Format::Json)?;
        self.put(key, payload).await
    }

    async fn put(&self, key: String, payload: Vec<u8>) -> Result<(), DispatchError> {
        self.session
            .put(&key, payload)
            .await
            .map_err(|e| DispatchError::Publish {
                key: key.clone(),
                message: e.to_string(),
            })
    }
}

impl Dispatch for ZenohDispatcher {
    async fn dispatch(&self, record: SampleRecord) -> Result<(), DispatchError> {
        let key = self.keys.record_key(&record);
        let payload = encode(&record, self.format)?;
        trace!(key = %key, bytes = payload.len(), "Publishing sample");
        self.put(key, payload).await
    }
}

/// Bridge status message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub bridge: String,
    pub version: String,
    /// "running", "offline" or "error".
    pub status: String,
    /// Names of the polled services.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeStatus {
    fn new(status: &str) -> Self {
        Self {
            bridge: BRIDGE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: status.to_string(),
            services: Vec::new(),
            error: None,
        }
    }

    pub fn running(services: Vec<String>) -> Self {
        Self {
            services,
            ..Self::new("running")
        }
    }

    pub fn offline() -> Self {
        Self::new("offline")
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new("error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_running() {
        let status = BridgeStatus::running(vec!["mock1U".to_string()]);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["bridge"], "redfish");
        assert_eq!(json["status"], "running");
        assert_eq!(json["services"][0], "mock1U");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_status_offline_omits_empty_fields() {
        let json = serde_json::to_string(&BridgeStatus::offline()).unwrap();

        assert!(json.contains("\"status\":\"offline\""));
        assert!(!json.contains("services"));
    }

    #[test]
    fn test_status_error() {
        let status = BridgeStatus::error("no services configured");

        assert_eq!(status.status, "error");
        assert_eq!(status.error.as_deref(), Some("no services configured"));
    }
}

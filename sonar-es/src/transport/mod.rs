//! Transport layer: the low-level driver that puts an operation on the wire.
//!
//! The facade never talks to the cluster directly. Every descriptor goes
//! through a [`Transport`], which returns the engine's raw JSON response or a
//! [`TransportError`]. [`HttpTransport`] speaks the Elasticsearch REST API;
//! tests substitute [`crate::testing::FakeTransport`].

mod http;

pub use http::HttpTransport;

use crate::descriptor::OperationDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a transport before any normalization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The cluster processed the request and answered with an error status.
    #[error("Cluster returned status {status}: [{error_type}] {reason}")]
    Rejected {
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("Failed to encode request: {0}")]
    Encode(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Transport is closed")]
    Closed,
}

impl TransportError {
    /// Build a rejection from an Elasticsearch error body.
    ///
    /// Understands both `{"error": {"type": .., "reason": ..}}` and the
    /// legacy `{"error": "message"}` shapes.
    pub fn from_error_body(status: u16, body: &Value) -> Self {
        let error = body.get("error");
        let (error_type, reason) = match error {
            Some(Value::Object(obj)) => {
                let root = obj
                    .get("root_cause")
                    .and_then(Value::as_array)
                    .and_then(|causes| causes.first());
                let error_type = obj
                    .get("type")
                    .or_else(|| root.and_then(|r| r.get("type")))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                let reason = obj
                    .get("reason")
                    .or_else(|| root.and_then(|r| r.get("reason")))
                    .and_then(Value::as_str)
                    .unwrap_or("no reason given")
                    .to_string();
                (error_type, reason)
            }
            Some(Value::String(message)) => ("unknown".to_string(), message.clone()),
            _ => ("unknown".to_string(), body.to_string()),
        };

        TransportError::Rejected {
            status,
            error_type,
            reason,
        }
    }
}

/// Low-level driver for cluster communication.
///
/// Implementations must be safe for concurrent independent requests;
/// connection pooling is their concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one operation and return the raw response body.
    async fn send(&self, descriptor: &OperationDescriptor) -> Result<Value, TransportError>;

    /// Release the underlying resources. Called exactly once by the facade.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Short name used in log lines.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_structured() {
        let body = json!({
            "error": {
                "root_cause": [{"type": "index_not_found_exception", "reason": "no such index"}],
                "type": "index_not_found_exception",
                "reason": "no such index [issues]"
            },
            "status": 404
        });

        match TransportError::from_error_body(404, &body) {
            TransportError::Rejected { status, error_type, reason } => {
                assert_eq!(status, 404);
                assert_eq!(error_type, "index_not_found_exception");
                assert_eq!(reason, "no such index [issues]");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_body_root_cause_only() {
        let body = json!({
            "error": {"root_cause": [{"type": "parsing_exception", "reason": "bad query"}]}
        });

        let err = TransportError::from_error_body(400, &body);
        assert_eq!(
            err,
            TransportError::Rejected {
                status: 400,
                error_type: "parsing_exception".into(),
                reason: "bad query".into(),
            }
        );
    }

    #[test]
    fn test_error_body_legacy_string() {
        let body = json!({"error": "IndexMissingException[[rules] missing]", "status": 404});
        let err = TransportError::from_error_body(404, &body);
        assert!(err.to_string().contains("IndexMissingException"));
    }

    #[test]
    fn test_error_body_unknown_shape() {
        let err = TransportError::from_error_body(500, &json!("boom"));
        match err {
            TransportError::Rejected { error_type, .. } => assert_eq!(error_type, "unknown"),
            other => panic!("unexpected {:?}", other),
        }
    }
}

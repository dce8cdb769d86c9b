//! Remote predictor seam.
//!
//! The classifier does not run locally; it lives on a hosted Space and
//! is reached over HTTP. [`Predictor`] is the boundary the orchestration
//! layer talks to: [`space::SpaceClient`] implements it over the Gradio
//! API, [`MockPredictor`] stands in for tests.

pub mod space;

pub use space::SpaceClient;

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::pipeline::prepare::UploadArtifact;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Cannot resolve Space host for {0}")]
    SpaceResolve(String),

    #[error("Cannot connect to the prediction service at {0}")]
    Connection(String),

    #[error("Prediction service returned HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Prediction endpoint reported an error: {0}")]
    RemoteError(String),

    #[error("Malformed response from the prediction service: {0}")]
    ResponseParsing(String),

    #[error("Prediction stream ended without a result")]
    MissingResult,

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// One in-flight prediction call, surfaced in status snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveCall {
    pub endpoint: String,
    pub started_at: String,
}

impl ActiveCall {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Anything that can turn an upload into a classifier payload.
pub trait Predictor: Send + Sync {
    /// Submit the artifact to the named endpoint and return the payload
    /// as delivered by the transport. Positional framing (a one-element
    /// array around the output object) is tolerated downstream, so
    /// implementations pass the data through unmodified.
    fn predict(&self, endpoint: &str, artifact: &UploadArtifact) -> Result<Value, PredictorError>;
}

/// Mock predictor for testing. Returns a configurable payload and
/// counts the calls it serves.
pub struct MockPredictor {
    response: Result<Value, String>,
    calls: AtomicUsize,
}

impl MockPredictor {
    pub fn new(response: Value) -> Self {
        Self {
            response: Ok(response),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Predictor for MockPredictor {
    fn predict(&self, _endpoint: &str, _artifact: &UploadArtifact) -> Result<Value, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(value) => Ok(value.clone()),
            Err(message) => Err(PredictorError::Connection(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact() -> UploadArtifact {
        UploadArtifact {
            file_name: "lesion.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
            width: 10,
            height: 10,
            reencoded: true,
        }
    }

    #[test]
    fn mock_returns_configured_payload() {
        let mock = MockPredictor::new(json!({"label": "benign-ish"}));
        let value = mock.predict("predict", &artifact()).unwrap();
        assert_eq!(value, json!({"label": "benign-ish"}));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn mock_failing_yields_connection_error() {
        let mock = MockPredictor::failing("space is sleeping");
        let err = mock.predict("predict", &artifact()).unwrap_err();
        assert!(matches!(err, PredictorError::Connection(_)));
        assert!(err.to_string().contains("space is sleeping"));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn active_call_carries_rfc3339_timestamp() {
        let call = ActiveCall::new("predict");
        assert_eq!(call.endpoint, "predict");
        assert!(chrono::DateTime::parse_from_rfc3339(&call.started_at).is_ok());
    }
}

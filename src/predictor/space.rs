//! Gradio Space client.
//!
//! Reaching a hosted classifier takes four HTTP steps:
//!
//! 1. `GET https://huggingface.co/api/spaces/{id}/host` resolves the
//!    Space id to its serving host.
//! 2. `POST {host}/gradio_api/upload` (multipart field `files`) stages
//!    the image and returns its server-side path.
//! 3. `POST {host}/gradio_api/call/{endpoint}` with a `FileData`
//!    reference starts the call and returns an `event_id`.
//! 4. `GET {host}/gradio_api/call/{endpoint}/{event_id}` streams
//!    server-sent events; the `complete` event carries the payload.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{Predictor, PredictorError};
use crate::pipeline::prepare::UploadArtifact;

const HF_SPACES_API: &str = "https://huggingface.co/api/spaces";

/// Blocking client for one Gradio Space.
pub struct SpaceClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct SpaceHostResponse {
    host: String,
}

#[derive(Deserialize)]
struct CallStartResponse {
    event_id: String,
}

impl SpaceClient {
    /// Connect to a Space by id (`owner/name`) or directly by URL.
    ///
    /// Fetches the Space config once after resolving the host, which
    /// wakes a sleeping Space. Callers treat this as the warm-up step.
    pub fn connect(space: &str) -> Result<Self, PredictorError> {
        let client = Self::build_http_client()?;
        let base_url = if space.starts_with("http://") || space.starts_with("https://") {
            space.trim_end_matches('/').to_string()
        } else {
            resolve_space_host(&client, space)?
        };

        let connected = Self { base_url, client };
        connected.wake()?;
        info!(base_url = %connected.base_url, "Connected to prediction Space");
        Ok(connected)
    }

    /// Client over an already-known host. Performs no network traffic.
    pub fn with_base_url(base_url: &str) -> Result<Self, PredictorError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Self::build_http_client()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // No local timeout: a sleeping Space wakes on first request and the
    // inference itself is server-paced.
    fn build_http_client() -> Result<reqwest::blocking::Client, PredictorError> {
        reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| PredictorError::HttpClient(e.to_string()))
    }

    fn wake(&self) -> Result<(), PredictorError> {
        let url = format!("{}/config", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::RemoteStatus {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Stage the artifact on the Space, returning its server-side path.
    fn upload(&self, artifact: &UploadArtifact) -> Result<String, PredictorError> {
        let part = Part::bytes(artifact.bytes.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.mime)
            .map_err(|e| PredictorError::HttpClient(e.to_string()))?;
        let form = Form::new().part("files", part);

        let url = format!("{}/gradio_api/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::RemoteStatus {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let paths: Vec<String> = response
            .json()
            .map_err(|e| PredictorError::ResponseParsing(e.to_string()))?;
        paths
            .into_iter()
            .next()
            .ok_or_else(|| PredictorError::ResponseParsing("upload returned no file path".into()))
    }

    fn start_call(&self, endpoint: &str, server_path: &str) -> Result<String, PredictorError> {
        let url = format!(
            "{}/gradio_api/call/{}",
            self.base_url,
            trim_endpoint(endpoint)
        );
        let body = json!({
            "data": [{
                "path": server_path,
                "meta": {"_type": "gradio.FileData"},
            }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::RemoteStatus {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let parsed: CallStartResponse = response
            .json()
            .map_err(|e| PredictorError::ResponseParsing(e.to_string()))?;
        Ok(parsed.event_id)
    }

    fn read_result(&self, endpoint: &str, event_id: &str) -> Result<Value, PredictorError> {
        let url = format!(
            "{}/gradio_api/call/{}/{}",
            self.base_url,
            trim_endpoint(endpoint),
            event_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::RemoteStatus {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body = response
            .text()
            .map_err(|e| PredictorError::HttpClient(e.to_string()))?;
        parse_sse_result(&body)
    }

    fn map_send_error(&self, e: reqwest::Error) -> PredictorError {
        if e.is_connect() {
            PredictorError::Connection(self.base_url.clone())
        } else {
            PredictorError::HttpClient(e.to_string())
        }
    }
}

impl Predictor for SpaceClient {
    fn predict(&self, endpoint: &str, artifact: &UploadArtifact) -> Result<Value, PredictorError> {
        let server_path = self.upload(artifact)?;
        debug!(path = %server_path, "Upload staged on Space");

        let event_id = self.start_call(endpoint, &server_path)?;
        debug!(event_id = %event_id, "Prediction call started");

        self.read_result(endpoint, &event_id)
    }
}

/// Resolve a Space id to its serving host via the Hugging Face API.
fn resolve_space_host(
    client: &reqwest::blocking::Client,
    space_id: &str,
) -> Result<String, PredictorError> {
    let url = format!("{HF_SPACES_API}/{space_id}/host");
    let response = client.get(&url).send().map_err(|e| {
        if e.is_connect() {
            PredictorError::Connection(url.clone())
        } else {
            PredictorError::HttpClient(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(PredictorError::SpaceResolve(space_id.to_string()));
    }

    let parsed: SpaceHostResponse = response
        .json()
        .map_err(|e| PredictorError::ResponseParsing(e.to_string()))?;
    Ok(ensure_https(parsed.host.trim_end_matches('/')))
}

/// Endpoint names may be written with or without a leading slash.
fn trim_endpoint(endpoint: &str) -> &str {
    endpoint.trim_start_matches('/')
}

/// The host API sometimes returns a bare hostname.
fn ensure_https(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// Pull the result payload out of an SSE body. The `complete` event
/// carries the output data; `error` aborts; anything else (heartbeats,
/// progress) is skipped.
fn parse_sse_result(body: &str) -> Result<Value, PredictorError> {
    let mut event = "";
    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match event {
                "complete" => {
                    return serde_json::from_str(data)
                        .map_err(|e| PredictorError::ResponseParsing(e.to_string()));
                }
                "error" => {
                    let message = if data.is_empty() || data == "null" {
                        "endpoint reported an unspecified error".to_string()
                    } else {
                        data.to_string()
                    };
                    return Err(PredictorError::RemoteError(message));
                }
                _ => {}
            }
        }
    }
    Err(PredictorError::MissingResult)
}

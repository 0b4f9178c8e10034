use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::error::ExtractionError;

/// Raw text generation. The seam between the extractor and a model server.
pub trait TextInference: Send + Sync {
    fn infer_text(&self, prompt: &str, timeout: Duration) -> Result<String, ExtractionError>;
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:1.5b".to_string(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        }
    }
}

impl TextInference for OllamaBackend {
    fn infer_text(&self, prompt: &str, timeout: Duration) -> Result<String, ExtractionError> {
        let timeout_ms = timeout.as_millis() as u64;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                ExtractionError::Timeout { timeout_ms }
            } else {
                ExtractionError::Transport(e.to_string())
            }
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "sending generate request");
        let response = client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().map_err(classify)?;
        let envelope: OllamaResponse =
            serde_json::from_str(&body).map_err(|e| ExtractionError::Envelope(e.to_string()))?;
        Ok(envelope.response)
    }
}

// ============================================================================
// Mock Backend (for testing without Ollama)
// ============================================================================

/// Returns the same canned text for every prompt.
pub struct MockTextInference {
    pub response: String,
}

impl MockTextInference {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl TextInference for MockTextInference {
    fn infer_text(&self, _prompt: &str, _timeout: Duration) -> Result<String, ExtractionError> {
        Ok(self.response.clone())
    }
}

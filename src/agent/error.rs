use thiserror::Error;

/// Failure to obtain any answer from the semantic extractor.
///
/// An answer that arrives but does not fit the action schema is not an error:
/// it becomes `Action::Unknown`.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The backend did not answer within the configured bound
    #[error("extractor timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection refused, DNS failure, broken body
    #[error("extractor transport error: {0}")]
    Transport(String),

    #[error("extractor returned HTTP {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// The backend's response envelope could not be decoded
    #[error("extractor response envelope unreadable: {0}")]
    Envelope(String),
}

impl ExtractionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExtractionError::Timeout { .. })
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The descriptor resolved to no element on the page
    #[error("element '{target}' not found")]
    ElementNotFound { target: String },

    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },

    /// A driver command exceeded its own timeout
    #[error("{command} timed out")]
    Timeout { command: String },

    /// The driver reported failure for a command
    #[error("{command} failed: {error}")]
    Protocol { command: String, error: String },

    #[error("browser session I/O: {0}")]
    SessionIo(String),

    /// Node.js subprocess failed to spawn
    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("browser session is closed")]
    Closed,
}

impl DriverError {
    /// Transient failures a retry may cure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::ElementNotFound { .. }
                | DriverError::NavigationTimeout { .. }
                | DriverError::Timeout { .. }
        )
    }
}

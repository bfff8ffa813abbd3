use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key environment variable '{0}' is not set")]
    MissingApiKey(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("provider reported a failure: {0}")]
    Sentinel(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, request timeouts, rate limiting and server-side
    /// errors are retried. Everything else is a property of the request or
    /// the configuration and fails immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Transport(_) => true,
            GenerationError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GenerationError::Decode(e.to_string())
        } else {
            GenerationError::Transport(e.to_string())
        }
    }
}

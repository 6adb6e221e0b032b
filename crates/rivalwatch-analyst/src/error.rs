use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalystError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("language model request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("language model request timed out")]
    Timeout,

    #[error("language model returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed chat completion envelope: {0}")]
    MalformedEnvelope(String),

    #[error("language model returned no content")]
    EmptyContent,

    #[error("summary is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("summary JSON is not an object")]
    NotAnObject,
}

/// Error returned by [`crate::Summarizer::summarize`].
pub type SummarizationFailure = AnalystError;

impl AnalystError {
    pub(crate) fn from_transport(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            AnalystError::Timeout
        } else {
            AnalystError::Http(source)
        }
    }
}

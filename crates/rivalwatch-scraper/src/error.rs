use thiserror::Error;

/// Why a changelog page did not yield usable text.
///
/// Never fatal to a run: the orchestrator answers every variant with the
/// fallback generator.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("extracted text from {url} is too short ({chars} chars, minimum {min})")]
    TooShort { url: String, chars: usize, min: usize },

    #[error("invalid changelog URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ExtractionFailure {
    pub(crate) fn from_transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ExtractionFailure::Timeout {
                url: url.to_string(),
            }
        } else {
            ExtractionFailure::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

use rivalwatch_analyst::AnalystError;
use rivalwatch_scraper::ExtractionFailure;
use thiserror::Error;

use crate::notify::NotifyError;

/// Failure to assemble a [`crate::Pipeline`]. Running one never fails.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build extractor: {0}")]
    Extractor(#[from] ExtractionFailure),

    #[error("failed to build language-model client: {0}")]
    Analyst(#[from] AnalystError),

    #[error("failed to build notifier: {0}")]
    Notifier(#[from] NotifyError),
}

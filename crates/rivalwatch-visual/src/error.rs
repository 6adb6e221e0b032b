use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisualError {
    /// Screenshot capture is not possible on this host or is switched off.
    #[error("visual diff unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("screenshot capture failed for {competitor}: {reason}")]
    Capture { competitor: String, reason: String },

    #[error("screenshot capture for {competitor} timed out after {secs}s")]
    Timeout { competitor: String, secs: u64 },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VisualError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VisualError::Io {
            path: path.into(),
            source,
        }
    }
}

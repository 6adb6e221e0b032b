//! Changelog page fetching and text extraction.

pub mod clean;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod html;

pub use error::ExtractionFailure;
pub use extractor::{Extractor, ExtractorConfig};
pub use gate::RequestGate;

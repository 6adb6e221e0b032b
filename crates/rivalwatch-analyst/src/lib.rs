//! Language-model analysis of competitor changelogs.
//!
//! [`Summarizer`] turns extracted text into a [`rivalwatch_core::SummaryRecord`],
//! [`FallbackGenerator`] writes stand-in changelog text when extraction fails,
//! and [`strategic_alert`] phrases a one-line call to action for a record.
//! Both model-backed components degrade to offline heuristics when no API key
//! is configured.

pub mod alert;
pub mod error;
pub mod fallback;
pub mod heuristic;
pub mod llm;
pub mod summarizer;

pub use alert::strategic_alert;
pub use error::{AnalystError, SummarizationFailure};
pub use fallback::{fallback_marker, FallbackEntry, FallbackGenerator};
pub use heuristic::{heuristic_draft, keyword_categories};
pub use llm::{ChatRequest, LlmClient, LlmConfig};
pub use summarizer::{repair_summary, summary_prompt, Summarizer};

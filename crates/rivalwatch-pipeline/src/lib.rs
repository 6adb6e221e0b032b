//! Run orchestration: extract, fall back, summarize, store, notify.
//!
//! [`Pipeline::run`] walks the competitor list in order and always returns a
//! [`RunReport`] with one outcome per processed competitor. Every upstream
//! failure is absorbed into a degraded record and logged.

pub mod control;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod report;

pub use control::RunControl;
pub use error::PipelineError;
pub use notify::{
    alert_payload, digest_payload, leaderboard_payload, DigestEntry, Notifier, NotifyError,
    LEADERBOARD_SIZE,
};
pub use pipeline::Pipeline;
pub use report::{CompetitorOutcome, PipelineState, RunReport};

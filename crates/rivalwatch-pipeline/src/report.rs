//! Per-run results returned by [`crate::Pipeline::run`].

use chrono::NaiveDate;
use rivalwatch_core::{ScreenshotComparison, SourceMethod, SummaryRecord};
use serde::Serialize;

/// Where a competitor is in the extract → summarize → store sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Extracting,
    Extracted,
    Fallback,
    Summarizing,
    Stored,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Pending => "PENDING",
            PipelineState::Extracting => "EXTRACTING",
            PipelineState::Extracted => "EXTRACTED",
            PipelineState::Fallback => "FALLBACK",
            PipelineState::Summarizing => "SUMMARIZING",
            PipelineState::Stored => "STORED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitorOutcome {
    pub competitor: String,
    /// URL the text came from; the changelog link for digests.
    pub source_url: String,
    pub record: SummaryRecord,
    pub trace: Vec<PipelineState>,
    /// `false` when the store rejected the write; the record is still reported.
    pub persisted: bool,
    pub comparison: Option<ScreenshotComparison>,
}

impl CompetitorOutcome {
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.trace.contains(&PipelineState::Fallback)
    }

    #[must_use]
    pub fn trace_label(&self) -> String {
        self.trace
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_date: NaiveDate,
    /// In competitor-list order.
    pub outcomes: Vec<CompetitorOutcome>,
    pub aborted: bool,
    pub store_persistent: bool,
}

impl RunReport {
    /// Records not saved anywhere durable: failed writes, or every record
    /// when the run used the in-memory store.
    #[must_use]
    pub fn unsaved_count(&self) -> usize {
        if !self.store_persistent {
            return self.outcomes.len();
        }
        self.outcomes.iter().filter(|o| !o.persisted).count()
    }

    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.record.source == SourceMethod::AiGenerated)
            .count()
    }

    #[must_use]
    pub fn average_impact(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let total: u32 = self
            .outcomes
            .iter()
            .map(|o| u32::from(o.record.impact_score))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.outcomes.len() as f64;
        Some(f64::from(total) / count)
    }

    pub fn records(&self) -> impl Iterator<Item = &SummaryRecord> {
        self.outcomes.iter().map(|o| &o.record)
    }
}

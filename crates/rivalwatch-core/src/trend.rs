//! Trend view over a competitor's summaries. Computed on read, never stored.

use std::collections::HashMap;

use serde::Serialize;

use crate::records::{Confidence, DateRange, SourceMethod, SummaryRecord};

/// Impact change between first and last record that counts as a movement.
const MOMENTUM_DELTA: i16 = 10;

/// Number of categories reported in [`TrendAnalysis::top_categories`].
const TOP_CATEGORIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Rising,
    Falling,
    Steady,
}

impl std::fmt::Display for Momentum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Momentum::Rising => write!(f, "rising"),
            Momentum::Falling => write!(f, "falling"),
            Momentum::Steady => write!(f, "steady"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub competitor: String,
    pub range: DateRange,
    pub record_count: usize,
    pub average_impact: f64,
    pub min_impact: Option<u8>,
    pub max_impact: Option<u8>,
    pub latest_impact: Option<u8>,
    /// Last minus first impact score in the range.
    pub impact_delta: i16,
    pub momentum: Momentum,
    pub confidence_counts: ConfidenceCounts,
    pub top_categories: Vec<String>,
    /// Share of records built from generated rather than scraped text.
    pub fallback_share: f64,
}

impl TrendAnalysis {
    /// Build the view from records ordered by ascending capture date.
    #[must_use]
    pub fn from_records(competitor: &str, range: DateRange, records: &[SummaryRecord]) -> Self {
        let impacts: Vec<u8> = records.iter().map(|r| r.impact_score).collect();

        #[allow(clippy::cast_precision_loss)]
        let average_impact = if impacts.is_empty() {
            0.0
        } else {
            impacts.iter().map(|&i| f64::from(i)).sum::<f64>() / impacts.len() as f64
        };

        let impact_delta = match (impacts.first(), impacts.last()) {
            (Some(&first), Some(&last)) => i16::from(last) - i16::from(first),
            _ => 0,
        };

        let momentum = if impact_delta >= MOMENTUM_DELTA {
            Momentum::Rising
        } else if impact_delta <= -MOMENTUM_DELTA {
            Momentum::Falling
        } else {
            Momentum::Steady
        };

        let mut confidence_counts = ConfidenceCounts::default();
        for record in records {
            match record.confidence {
                Confidence::Low => confidence_counts.low += 1,
                Confidence::Medium => confidence_counts.medium += 1,
                Confidence::High => confidence_counts.high += 1,
            }
        }

        let fallbacks = records
            .iter()
            .filter(|r| r.source == SourceMethod::AiGenerated)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let fallback_share = if records.is_empty() {
            0.0
        } else {
            fallbacks as f64 / records.len() as f64
        };

        Self {
            competitor: competitor.to_string(),
            range,
            record_count: records.len(),
            average_impact,
            min_impact: impacts.iter().copied().min(),
            max_impact: impacts.iter().copied().max(),
            latest_impact: impacts.last().copied(),
            impact_delta,
            momentum,
            confidence_counts,
            top_categories: top_categories(records),
            fallback_share,
        }
    }
}

fn top_categories(records: &[SummaryRecord]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for category in records.iter().flat_map(|r| r.categories.iter()) {
        *counts.entry(category.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|(name, _)| name.to_string())
        .collect()
}

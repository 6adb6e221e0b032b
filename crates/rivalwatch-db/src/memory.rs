//! Process-local store used when Postgres is unavailable.
//!
//! Orderings mirror the SQL in [`crate::summaries`] and [`crate::comparisons`]
//! so callers see the same results from either backend.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rivalwatch_core::{CompetitorConfig, DateRange, ScreenshotComparison, SummaryRecord};
use tokio::sync::Mutex;

use crate::{clamp_limit, PruneCounts, SummaryFilter};

type SummaryKey = (String, NaiveDate);
type ComparisonKey = (String, DateTime<Utc>);

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    summaries: Arc<Mutex<BTreeMap<SummaryKey, SummaryRecord>>>,
    comparisons: Arc<Mutex<BTreeMap<ComparisonKey, ScreenshotComparison>>>,
    competitors: Arc<Mutex<BTreeMap<String, CompetitorConfig>>>,
}

fn take(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins for the same `(competitor, captured_on)`.
    pub async fn upsert_summary(&self, record: &SummaryRecord) {
        self.summaries.lock().await.insert(
            (record.competitor.clone(), record.captured_on),
            record.clone(),
        );
    }

    pub async fn upsert_comparison(&self, comparison: &ScreenshotComparison) {
        self.comparisons.lock().await.insert(
            (comparison.competitor.clone(), comparison.captured_at),
            comparison.clone(),
        );
    }

    pub async fn query_trend(&self, competitor: &str, range: DateRange) -> Vec<SummaryRecord> {
        // BTreeMap order is (competitor, date) ascending.
        self.summaries
            .lock()
            .await
            .values()
            .filter(|r| r.competitor == competitor && range.contains(r.captured_on))
            .cloned()
            .collect()
    }

    pub async fn list_summaries(&self, filter: &SummaryFilter) -> Vec<SummaryRecord> {
        let mut records: Vec<SummaryRecord> = self
            .summaries
            .lock()
            .await
            .values()
            .filter(|r| filter.competitor.as_deref().is_none_or(|c| r.competitor == c))
            .filter(|r| filter.range.is_none_or(|range| range.contains(r.captured_on)))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.captured_on
                .cmp(&a.captured_on)
                .then_with(|| a.competitor.cmp(&b.competitor))
        });
        records.truncate(take(filter.effective_limit()));
        records
    }

    pub async fn latest_per_competitor(&self, per_competitor: i64) -> Vec<SummaryRecord> {
        let per_competitor = take(per_competitor.max(1));
        let mut by_competitor: HashMap<String, Vec<SummaryRecord>> = HashMap::new();
        for record in self.summaries.lock().await.values() {
            by_competitor
                .entry(record.competitor.clone())
                .or_default()
                .push(record.clone());
        }

        let mut records: Vec<SummaryRecord> = by_competitor
            .into_values()
            .flat_map(|mut rows| {
                rows.sort_by_key(|r| Reverse(r.captured_on));
                rows.truncate(per_competitor);
                rows
            })
            .collect();
        records.sort_by(|a, b| {
            b.impact_score
                .cmp(&a.impact_score)
                .then_with(|| a.competitor.cmp(&b.competitor))
                .then_with(|| b.captured_on.cmp(&a.captured_on))
        });
        records
    }

    pub async fn list_comparisons(
        &self,
        competitor: Option<&str>,
        limit: Option<i64>,
    ) -> Vec<ScreenshotComparison> {
        let mut comparisons: Vec<ScreenshotComparison> = self
            .comparisons
            .lock()
            .await
            .values()
            .filter(|c| competitor.is_none_or(|name| c.competitor == name))
            .cloned()
            .collect();
        comparisons.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| a.competitor.cmp(&b.competitor))
        });
        comparisons.truncate(take(clamp_limit(limit)));
        comparisons
    }

    pub async fn prune_before(&self, cutoff: NaiveDate) -> PruneCounts {
        let mut summaries = self.summaries.lock().await;
        let before = summaries.len();
        summaries.retain(|(_, date), _| *date >= cutoff);
        let summaries_removed = before - summaries.len();
        drop(summaries);

        let mut comparisons = self.comparisons.lock().await;
        let before = comparisons.len();
        comparisons.retain(|(_, at), _| at.date_naive() >= cutoff);
        let comparisons_removed = before - comparisons.len();

        PruneCounts {
            summaries: summaries_removed as u64,
            comparisons: comparisons_removed as u64,
        }
    }

    pub async fn seed_competitors(&self, competitors: &[CompetitorConfig]) -> usize {
        let mut seeded = self.competitors.lock().await;
        for competitor in competitors {
            seeded.insert(competitor.name.clone(), competitor.clone());
        }
        competitors.len()
    }

    pub async fn seeded_competitors(&self) -> Vec<CompetitorConfig> {
        self.competitors.lock().await.values().cloned().collect()
    }
}

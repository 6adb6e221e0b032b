//! Records flowing through a pipeline run and the store.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Upper bound on bullets kept per summary.
pub const MAX_BULLETS: usize = 5;

/// Bullet used when a summary came back without any usable bullets.
pub const EMPTY_SUMMARY_BULLET: &str = "No notable product changes were identified.";

/// Bullet used for the placeholder record written after a failed summarization.
pub const PLACEHOLDER_BULLET: &str = "Analysis could not be completed for this update.";

/// How the text behind a summary was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    Scraped,
    AiGenerated,
}

impl SourceMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceMethod::Scraped => "scraped",
            SourceMethod::AiGenerated => "ai_generated",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scraped" => Some(SourceMethod::Scraped),
            "ai_generated" => Some(SourceMethod::AiGenerated),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Case-insensitive parse; anything unrecognised is `Low`.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" | "med" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changelog text for one competitor, as scraped or generated.
///
/// Transient: consumed by the summarizer and never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawUpdate {
    pub competitor: String,
    pub source_url: String,
    pub text: String,
    pub method: SourceMethod,
    pub captured_at: DateTime<Utc>,
}

impl RawUpdate {
    /// Hex SHA-256 of the text, used to spot unchanged changelogs across runs.
    #[must_use]
    pub fn content_hash(&self) -> String {
        format!("{:x}", Sha256::digest(self.text.as_bytes()))
    }
}

/// Repaired summarizer output before it is attached to a competitor and date.
///
/// `bullets` may be empty here; [`SummaryRecord::from_draft`] fills it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDraft {
    pub bullets: Vec<String>,
    pub insight: String,
    pub impact_score: u8,
    pub confidence: Confidence,
    pub categories: Vec<String>,
}

/// One summary per competitor per capture date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub competitor: String,
    pub captured_on: NaiveDate,
    pub bullets: Vec<String>,
    pub insight: String,
    pub impact_score: u8,
    pub confidence: Confidence,
    pub source: SourceMethod,
    pub categories: Vec<String>,
    /// Set when summarization failed and this record only marks the attempt.
    pub placeholder: bool,
    pub content_hash: Option<String>,
    pub raw_content: Option<String>,
}

impl SummaryRecord {
    /// Attach a draft to the update it summarizes.
    ///
    /// Bullets are trimmed and capped at [`MAX_BULLETS`]; an empty list becomes
    /// a single [`EMPTY_SUMMARY_BULLET`] so stored records always carry 1 to 5.
    #[must_use]
    pub fn from_draft(update: &RawUpdate, draft: SummaryDraft) -> Self {
        let mut bullets: Vec<String> = draft
            .bullets
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .take(MAX_BULLETS)
            .collect();
        if bullets.is_empty() {
            bullets.push(EMPTY_SUMMARY_BULLET.to_string());
        }

        Self {
            competitor: update.competitor.clone(),
            captured_on: update.captured_at.date_naive(),
            bullets,
            insight: draft.insight.trim().to_string(),
            impact_score: draft.impact_score.min(100),
            confidence: draft.confidence,
            source: update.method,
            categories: draft.categories,
            placeholder: false,
            content_hash: Some(update.content_hash()),
            raw_content: Some(update.text.clone()),
        }
    }

    /// Minimal record written when summarization failed.
    #[must_use]
    pub fn placeholder(update: &RawUpdate) -> Self {
        Self {
            competitor: update.competitor.clone(),
            captured_on: update.captured_at.date_naive(),
            bullets: vec![PLACEHOLDER_BULLET.to_string()],
            insight: String::new(),
            impact_score: 0,
            confidence: Confidence::Low,
            source: update.method,
            categories: Vec::new(),
            placeholder: true,
            content_hash: Some(update.content_hash()),
            raw_content: Some(update.text.clone()),
        }
    }

    #[must_use]
    pub fn top_bullet(&self) -> &str {
        self.bullets.first().map_or("", String::as_str)
    }
}

/// Result of comparing two captures of the same competitor page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotComparison {
    pub competitor: String,
    pub captured_at: DateTime<Utc>,
    pub before_path: String,
    pub after_path: String,
    pub diff_path: String,
    /// Normalized mean absolute channel difference in `[0, 1]`.
    pub difference_score: f64,
    /// Share of pixels whose difference crossed the per-pixel cutoff.
    pub changed_ratio: f64,
    /// Mean structural similarity (SSIM) of the grayscale captures, 1.0 when
    /// identical.
    pub similarity: f64,
    pub significant: bool,
    pub threshold: f64,
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `from` is after `to`.
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    /// `today` and the `days` days before it.
    #[must_use]
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        let from = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: today }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn update(text: &str, method: SourceMethod) -> RawUpdate {
        RawUpdate {
            competitor: "Linear".to_string(),
            source_url: "https://linear.app/changelog".to_string(),
            text: text.to_string(),
            method,
            captured_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        }
    }

    fn draft(bullets: &[&str], impact: u8) -> SummaryDraft {
        SummaryDraft {
            bullets: bullets.iter().map(|b| (*b).to_string()).collect(),
            insight: " Doubling down on AI triage ".to_string(),
            impact_score: impact,
            confidence: Confidence::Medium,
            categories: vec!["AI".to_string()],
        }
    }

    #[test]
    fn source_method_round_trips_through_str() {
        for method in [SourceMethod::Scraped, SourceMethod::AiGenerated] {
            assert_eq!(SourceMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(SourceMethod::parse("manual"), None);
        assert_eq!(
            serde_json::to_string(&SourceMethod::AiGenerated).unwrap(),
            "\"ai_generated\""
        );
    }

    #[test]
    fn confidence_parse_is_lenient() {
        assert_eq!(Confidence::parse_lenient("HIGH"), Confidence::High);
        assert_eq!(Confidence::parse_lenient(" medium "), Confidence::Medium);
        assert_eq!(Confidence::parse_lenient("certain"), Confidence::Low);
        assert_eq!(Confidence::parse_lenient(""), Confidence::Low);
    }

    #[test]
    fn from_draft_uses_capture_date_and_method() {
        let u = update("Triage Intelligence ships", SourceMethod::AiGenerated);
        let record = SummaryRecord::from_draft(&u, draft(&["Triage Intelligence"], 72));
        assert_eq!(
            record.captured_on,
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
        assert_eq!(record.source, SourceMethod::AiGenerated);
        assert_eq!(record.insight, "Doubling down on AI triage");
        assert!(!record.placeholder);
        assert_eq!(record.content_hash.as_deref(), Some(u.content_hash().as_str()));
    }

    #[test]
    fn from_draft_fills_empty_bullets() {
        let u = update("text", SourceMethod::Scraped);
        let record = SummaryRecord::from_draft(&u, draft(&["  ", ""], 10));
        assert_eq!(record.bullets, [EMPTY_SUMMARY_BULLET]);
    }

    #[test]
    fn from_draft_caps_bullets_and_impact() {
        let u = update("text", SourceMethod::Scraped);
        let record =
            SummaryRecord::from_draft(&u, draft(&["a", "b", "c", "d", "e", "f", "g"], 250));
        assert_eq!(record.bullets.len(), MAX_BULLETS);
        assert_eq!(record.impact_score, 100);
    }

    #[test]
    fn placeholder_is_low_confidence_zero_impact() {
        let u = update("text", SourceMethod::Scraped);
        let record = SummaryRecord::placeholder(&u);
        assert_eq!(record.impact_score, 0);
        assert_eq!(record.confidence, Confidence::Low);
        assert_eq!(record.bullets, [PLACEHOLDER_BULLET]);
        assert!(record.placeholder);
        assert_eq!(record.top_bullet(), PLACEHOLDER_BULLET);
    }

    #[test]
    fn content_hash_is_stable_sha256_hex() {
        let u = update("abc", SourceMethod::Scraped);
        assert_eq!(
            u.content_hash(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let a = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(DateRange::new(a, b).is_none());
        assert!(DateRange::new(b, a).is_some());
    }

    #[test]
    fn last_days_is_inclusive_of_both_ends() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let range = DateRange::last_days(7, today);
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
        assert!(range.contains(today));
        assert!(range.contains(range.from));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 3, 6).unwrap()));
    }
}

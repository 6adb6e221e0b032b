//! Changelog summarization into structured records.

use chrono::Utc;
use rivalwatch_core::{
    Confidence, DateRange, RawUpdate, SourceMethod, SummaryDraft, SummaryRecord, MAX_BULLETS,
};
use serde_json::Value;

use crate::error::AnalystError;
use crate::heuristic::heuristic_draft;
use crate::llm::{strip_code_fence, ChatRequest, LlmClient};

const SYSTEM_PROMPT: &str = "You are an expert product analyst specializing in competitive \
intelligence and changelog analysis. Provide accurate, actionable summaries in the requested \
JSON format.";

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_TOKENS: u32 = 1000;

/// Produces one [`SummaryRecord`] per [`RawUpdate`].
///
/// With an [`LlmClient`] the model is asked for a JSON object which is then
/// repaired into range; without one a keyword heuristic is used instead.
#[derive(Debug, Clone)]
pub struct Summarizer {
    llm: Option<LlmClient>,
    analysis_days: u32,
}

impl Summarizer {
    #[must_use]
    pub fn new(llm: Option<LlmClient>, analysis_days: u32) -> Self {
        Self { llm, analysis_days }
    }

    /// `true` when summaries come from the offline heuristic.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.llm.is_none()
    }

    /// Summarize one update.
    ///
    /// The record's source method is the update's, so AI-generated changelog
    /// text stays marked as such after analysis.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalystError`] when the model call fails or its reply is not
    /// a JSON object. Out-of-range fields are repaired, never rejected.
    pub async fn summarize(&self, update: &RawUpdate) -> Result<SummaryRecord, AnalystError> {
        let Some(llm) = &self.llm else {
            let draft = heuristic_draft(&update.competitor, &update.text);
            return Ok(SummaryRecord::from_draft(update, draft));
        };

        let range = DateRange::last_days(self.analysis_days, Utc::now().date_naive());
        let prompt = summary_prompt(update, range);
        let content = llm
            .complete(&ChatRequest {
                system: SYSTEM_PROMPT,
                user: &prompt,
                temperature: SUMMARY_TEMPERATURE,
                max_tokens: SUMMARY_MAX_TOKENS,
                json_object: true,
            })
            .await?;

        let value: Value = serde_json::from_str(strip_code_fence(&content))?;
        if !value.is_object() {
            return Err(AnalystError::NotAnObject);
        }

        let draft = repair_summary(&value);
        tracing::debug!(
            competitor = %update.competitor,
            impact = draft.impact_score,
            confidence = %draft.confidence,
            bullets = draft.bullets.len(),
            "summary received"
        );
        Ok(SummaryRecord::from_draft(update, draft))
    }
}

/// Build the user prompt for one update.
#[must_use]
pub fn summary_prompt(update: &RawUpdate, range: DateRange) -> String {
    let note = match update.method {
        SourceMethod::AiGenerated => {
            " (Note: this content was AI-generated as a fallback when scraping failed)"
        }
        SourceMethod::Scraped => "",
    };
    format!(
        r#"Analyze the following changelog content from {competitor} and create a structured summary focusing on changes from {from} to {to}.{note}

CHANGELOG CONTENT:
{text}

Respond with a JSON object in exactly this shape:
{{
  "competitor": "{competitor}",
  "summary_bullets": ["bullet 1", "bullet 2", "bullet 3"],
  "strategic_insight": "one sentence on what this means competitively",
  "confidence_level": "low|medium|high",
  "categories": ["AI", "Feature", "UI", "Pricing", "Integration"],
  "impact_score": 0
}}

Guidelines:
- Use 3 to 5 bullets of at most 25 words each, most significant first.
- impact_score is an integer from 0 (cosmetic) to 100 (market-shifting).
- Only list categories that apply.
- Use "low" confidence when nothing significant can be identified."#,
        competitor = update.competitor,
        from = range.from,
        to = range.to,
        text = update.text,
    )
}

/// Coerce a model reply into a [`SummaryDraft`].
///
/// Accepts both the prompted field names and the short ones (`bullets`,
/// `insight`, `confidence`). The impact score is clamped to `0..=100` and may
/// arrive as a float or a numeric string. Unknown confidence becomes `low`.
/// Missing fields fall back to empty values.
#[must_use]
pub fn repair_summary(value: &Value) -> SummaryDraft {
    let field = |names: &[&str; 2]| names.iter().find_map(|name| value.get(*name));

    let bullets = match field(&["summary_bullets", "bullets"]) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .take(MAX_BULLETS)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => {
            vec![single.trim().to_string()]
        }
        _ => Vec::new(),
    };

    let insight = field(&["strategic_insight", "insight"])
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let confidence = field(&["confidence_level", "confidence"])
        .and_then(Value::as_str)
        .map_or(Confidence::Low, Confidence::parse_lenient);

    let mut categories: Vec<String> = Vec::new();
    if let Some(Value::Array(items)) = value.get("categories") {
        for category in items.iter().filter_map(Value::as_str).map(str::trim) {
            if !category.is_empty() && !categories.iter().any(|c| c.eq_ignore_ascii_case(category))
            {
                categories.push(category.to_string());
            }
        }
    }

    SummaryDraft {
        bullets,
        insight,
        impact_score: field(&["impact_score", "impact"]).map_or(0, clamp_impact),
        confidence,
        categories,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_impact(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

//! Slack-compatible incoming-webhook messages.
//!
//! Payload builders are pure so their shape can be tested without a server;
//! [`Notifier`] only posts them.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rivalwatch_core::{AppConfig, SourceMethod, SummaryRecord};
use serde_json::{json, Value};
use thiserror::Error;

const BOT_NAME: &str = "Competitor Intelligence Bot";
/// Digest "high impact" counter cutoff.
const HIGH_IMPACT: u8 = 75;
pub const LEADERBOARD_SIZE: usize = 5;
const POSITION_EMOJI: [&str; LEADERBOARD_SIZE] = [
    ":first_place_medal:",
    ":second_place_medal:",
    ":third_place_medal:",
    ":four:",
    ":five:",
];
const ERROR_BODY_EXCERPT: usize = 200;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build webhook client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// One digest line: a record and the changelog it came from.
#[derive(Debug, Clone, Copy)]
pub struct DigestEntry<'a> {
    pub record: &'a SummaryRecord,
    pub link: Option<&'a str>,
}

/// Posts JSON payloads to one webhook URL.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("webhook_url", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Client`] if the HTTP client cannot be built.
    pub fn new(webhook_url: impl Into<String>, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    /// `Ok(None)` when `SLACK_WEBHOOK_URL` is not set.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Client`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>, NotifyError> {
        config
            .slack_webhook_url
            .as_deref()
            .map(|url| Self::new(url, config.webhook_timeout_secs))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns [`NotifyError`] on transport failure or a non-2xx response.
    pub async fn send_digest(
        &self,
        entries: &[DigestEntry<'_>],
        period: &str,
    ) -> Result<(), NotifyError> {
        self.post(&digest_payload(entries, period, Utc::now())).await?;
        tracing::info!(competitors = entries.len(), "digest sent");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`NotifyError`] on transport failure or a non-2xx response.
    pub async fn send_leaderboard(&self, records: &[SummaryRecord]) -> Result<(), NotifyError> {
        self.post(&leaderboard_payload(records, Utc::now().date_naive()))
            .await?;
        tracing::info!(competitors = records.len().min(LEADERBOARD_SIZE), "leaderboard sent");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`NotifyError`] on transport failure or a non-2xx response.
    pub async fn send_strategic_alert(
        &self,
        record: &SummaryRecord,
        alert: &str,
    ) -> Result<(), NotifyError> {
        self.post(&alert_payload(record, alert)).await?;
        tracing::info!(
            competitor = %record.competitor,
            impact_score = record.impact_score,
            "strategic alert sent"
        );
        Ok(())
    }

    async fn post(&self, payload: &Value) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_EXCERPT).collect(),
            });
        }
        Ok(())
    }
}

fn by_impact_desc<'a, T>(items: &'a [T], record: impl Fn(&T) -> &SummaryRecord) -> Vec<&'a T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| {
        let (a, b) = (record(*a), record(*b));
        b.impact_score
            .cmp(&a.impact_score)
            .then_with(|| a.competitor.cmp(&b.competitor))
    });
    sorted
}

/// Run digest: aggregate fields, then one section per competitor by impact.
#[must_use]
pub fn digest_payload(
    entries: &[DigestEntry<'_>],
    period: &str,
    generated_at: DateTime<Utc>,
) -> Value {
    let total = entries.len();
    let impact_sum: u32 = entries
        .iter()
        .map(|e| u32::from(e.record.impact_score))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let average = if total == 0 {
        0.0
    } else {
        f64::from(impact_sum) / total as f64
    };
    let high_impact = entries
        .iter()
        .filter(|e| e.record.impact_score > HIGH_IMPACT)
        .count();
    let fallbacks = entries
        .iter()
        .filter(|e| e.record.source == SourceMethod::AiGenerated)
        .count();

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": "Competitive Intelligence Digest" }
        }),
        json!({
            "type": "context",
            "elements": [{
                "type": "mrkdwn",
                "text": format!(
                    "Analysis Period: {period} | Generated: {}",
                    generated_at.format("%B %d, %Y at %H:%M UTC")
                )
            }]
        }),
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Competitors:*\n{total}") },
                { "type": "mrkdwn", "text": format!("*Avg Impact:*\n{average:.1}/100") },
                { "type": "mrkdwn", "text": format!("*High Impact:*\n{high_impact}") },
                { "type": "mrkdwn", "text": format!("*AI Fallbacks:*\n{fallbacks}") },
            ]
        }),
        json!({ "type": "divider" }),
    ];

    for entry in by_impact_desc(entries, |e| e.record) {
        let record = entry.record;
        let name = match entry.link {
            Some(link) => format!("<{link}|{}>", record.competitor),
            None => record.competitor.clone(),
        };
        let robot = if record.source == SourceMethod::AiGenerated {
            " :robot_face:"
        } else {
            ""
        };
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*{name}*{robot} (Score: {})\n• {}",
                    record.impact_score,
                    record.top_bullet()
                )
            }
        }));
    }

    json!({
        "text": format!("Competitive Intelligence Digest - {period}"),
        "username": BOT_NAME,
        "icon_emoji": ":chart_with_upwards_trend:",
        "blocks": blocks,
    })
}

/// Top [`LEADERBOARD_SIZE`] records by impact score.
#[must_use]
pub fn leaderboard_payload(records: &[SummaryRecord], date: NaiveDate) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": "Competitive Momentum Leaderboard" }
        }),
        json!({
            "type": "context",
            "elements": [{
                "type": "mrkdwn",
                "text": format!("Based on impact scores | {}", date.format("%B %d, %Y"))
            }]
        }),
    ];

    let ranked = by_impact_desc(records, |r| r);
    for (position, record) in POSITION_EMOJI.iter().zip(ranked) {
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "{position} *{}* | Score: {} | Confidence: {}",
                    record.competitor, record.impact_score, record.confidence
                )
            }
        }));
    }

    json!({
        "text": "Competitive Momentum Leaderboard",
        "username": BOT_NAME,
        "icon_emoji": ":trophy:",
        "blocks": blocks,
    })
}

#[must_use]
pub fn alert_payload(record: &SummaryRecord, alert: &str) -> Value {
    let (urgency, color) = match record.impact_score {
        86.. => ("HIGH PRIORITY", "#FF0000"),
        71..=85 => ("MEDIUM PRIORITY", "#FFA500"),
        _ => ("LOW PRIORITY", "#0000FF"),
    };
    let categories = if record.categories.is_empty() {
        "None".to_string()
    } else {
        record.categories.join(", ")
    };

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": format!("{urgency}: {} Update", record.competitor)
            }
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*Alert:* {alert}") }
        }),
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Impact Score:*\n{}/100", record.impact_score) },
                { "type": "mrkdwn", "text": format!("*Categories:*\n{categories}") },
            ]
        }),
    ];

    if !record.bullets.is_empty() {
        let bullets: Vec<String> = record.bullets.iter().map(|b| format!("• {b}")).collect();
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*Key Updates:*\n{}", bullets.join("\n"))
            }
        }));
    }

    json!({
        "text": format!("Strategic Alert: {}", record.competitor),
        "username": BOT_NAME,
        "icon_emoji": ":warning:",
        "attachments": [{ "color": color, "blocks": blocks }],
    })
}

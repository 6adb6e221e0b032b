//! HTTP fetch of competitor changelog pages.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Url};
use rivalwatch_core::{AppConfig, CompetitorConfig, Platform, RawUpdate, SourceMethod};

use crate::clean::{clean_for_platform, finalize};
use crate::error::ExtractionFailure;
use crate::gate::RequestGate;
use crate::html::html_to_text;

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Extracted text shorter than this is treated as a parse failure.
    pub min_content_chars: usize,
    pub max_content_chars: usize,
}

impl ExtractorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.scraper_request_timeout_secs,
            user_agent: config.scraper_user_agent.clone(),
            min_content_chars: config.min_content_chars,
            max_content_chars: config.max_content_chars,
        }
    }
}

/// Fetches a changelog page and reduces it to plain text.
///
/// Every fetch passes through the extractor's [`RequestGate`] first. There
/// are no retries: a failed fetch is reported once and the caller decides
/// what to do next.
pub struct Extractor {
    client: Client,
    gate: RequestGate,
    min_content_chars: usize,
    max_content_chars: usize,
}

impl Extractor {
    /// # Errors
    ///
    /// Returns [`ExtractionFailure::Client`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ExtractorConfig, gate: RequestGate) -> Result<Self, ExtractionFailure> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(ExtractionFailure::Client)?;
        Ok(Self {
            client,
            gate,
            min_content_chars: config.min_content_chars,
            max_content_chars: config.max_content_chars,
        })
    }

    #[must_use]
    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    /// Extract the changelog text for a configured competitor.
    ///
    /// # Errors
    ///
    /// See [`Extractor::extract_url`].
    pub async fn extract(
        &self,
        competitor: &CompetitorConfig,
    ) -> Result<RawUpdate, ExtractionFailure> {
        self.extract_url(
            &competitor.name,
            &competitor.url,
            competitor.effective_platform(),
        )
        .await
    }

    /// Fetch `url` and apply the cleanup rules for `platform`.
    ///
    /// # Errors
    ///
    /// - [`ExtractionFailure::InvalidUrl`]: not an absolute `http(s)` URL.
    /// - [`ExtractionFailure::Timeout`]: the request exceeded the configured timeout.
    /// - [`ExtractionFailure::Http`]: connection or TLS failure.
    /// - [`ExtractionFailure::UnexpectedStatus`]: any non-2xx response.
    /// - [`ExtractionFailure::TooShort`]: the page parsed to less text than the minimum.
    pub async fn extract_url(
        &self,
        competitor: &str,
        url: &str,
        platform: Platform,
    ) -> Result<RawUpdate, ExtractionFailure> {
        let parsed = parse_changelog_url(url)?;

        self.gate.wait_if_needed().await;
        let response = self
            .client
            .get(parsed)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| ExtractionFailure::from_transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionFailure::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExtractionFailure::from_transport(url, e))?;

        let text = finalize(
            &clean_for_platform(&html_to_text(&body), platform),
            self.max_content_chars,
        );
        let chars = text.chars().count();
        if chars < self.min_content_chars {
            return Err(ExtractionFailure::TooShort {
                url: url.to_string(),
                chars,
                min: self.min_content_chars,
            });
        }

        tracing::debug!(
            competitor,
            url,
            %platform,
            html_bytes = body.len(),
            text_chars = chars,
            "extracted changelog text"
        );

        Ok(RawUpdate {
            competitor: competitor.to_string(),
            source_url: url.to_string(),
            text,
            method: SourceMethod::Scraped,
            captured_at: Utc::now(),
        })
    }
}

fn parse_changelog_url(url: &str) -> Result<Url, ExtractionFailure> {
    let invalid = |reason: &str| ExtractionFailure::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(parsed)
}

//! The per-competitor extract → summarize → store sequence.

use chrono::Utc;
use rivalwatch_analyst::{strategic_alert, FallbackGenerator, LlmClient, LlmConfig, Summarizer};
use rivalwatch_core::{AppConfig, CompetitorConfig, ScreenshotComparison, SummaryRecord};
use rivalwatch_db::Store;
use rivalwatch_scraper::{Extractor, ExtractorConfig, RequestGate};
use rivalwatch_visual::VisualDiff;

use crate::control::RunControl;
use crate::error::PipelineError;
use crate::notify::{DigestEntry, Notifier};
use crate::report::{CompetitorOutcome, PipelineState, RunReport};

/// Everything one run needs, resolved once at startup.
pub struct Pipeline {
    extractor: Extractor,
    fallback: FallbackGenerator,
    summarizer: Summarizer,
    store: Store,
    visual: VisualDiff,
    notifier: Option<Notifier>,
    alert_threshold: Option<u8>,
    analysis_days: u32,
}

impl Pipeline {
    /// Build the pipeline around an already-resolved store.
    ///
    /// The extractor gets its own [`RequestGate`]; the summarizer and the
    /// fallback generator share a second one since both call the language
    /// model. Visual diff capability is probed here, once, and browser
    /// launches share the extractor's gate.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if an HTTP client cannot be built.
    pub async fn from_app_config(config: &AppConfig, store: Store) -> Result<Self, PipelineError> {
        let extractor = Extractor::new(
            &ExtractorConfig::from_app_config(config),
            RequestGate::from_millis(config.min_request_interval_ms),
        )?;

        let llm_gate = RequestGate::from_millis(config.min_request_interval_ms);
        let llm = LlmConfig::from_app_config(config)
            .map(|llm_config| LlmClient::new(&llm_config, llm_gate))
            .transpose()?;
        if llm.is_none() {
            tracing::info!("OPENAI_API_KEY not set; using offline summaries and placeholder fallbacks");
        }

        let visual = VisualDiff::detect(config)
            .await
            .with_gate(extractor.gate().clone());

        Ok(Self {
            extractor,
            fallback: FallbackGenerator::new(llm.clone()),
            summarizer: Summarizer::new(llm, config.analysis_days),
            store,
            visual,
            notifier: Notifier::from_app_config(config)?,
            alert_threshold: config.alert_threshold,
            analysis_days: config.analysis_days,
        })
    }

    /// Drop the notifier so the run sends nothing.
    #[must_use]
    pub fn without_notifier(mut self) -> Self {
        self.notifier = None;
        self
    }

    /// Replace the visual diff capability. Captures are throttled by the
    /// extractor's gate.
    #[must_use]
    pub fn with_visual(mut self, visual: VisualDiff) -> Self {
        self.visual = visual.with_gate(self.extractor.gate().clone());
        self
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn notifier(&self) -> Option<&Notifier> {
        self.notifier.as_ref()
    }

    /// Process `competitors` in order, then send notifications.
    ///
    /// Never fails. `control` is checked before each competitor; an abort
    /// skips the rest and marks the report as aborted.
    pub async fn run(&self, competitors: &[CompetitorConfig], control: &RunControl) -> RunReport {
        let run_date = Utc::now().date_naive();
        let started = std::time::Instant::now();
        if let VisualDiff::Unavailable { reason } = &self.visual {
            tracing::debug!(reason = %reason, "visual diff skipped for this run");
        }
        tracing::info!(
            competitors = competitors.len(),
            store = self.store.backend(),
            "pipeline run started"
        );

        let mut outcomes = Vec::with_capacity(competitors.len());
        let mut aborted = false;
        for competitor in competitors {
            if control.is_aborted() {
                aborted = true;
                tracing::warn!(
                    processed = outcomes.len(),
                    skipped = competitors.len() - outcomes.len(),
                    "run aborted; remaining competitors skipped"
                );
                break;
            }
            outcomes.push(self.process(competitor).await);
        }

        let report = RunReport {
            run_date,
            outcomes,
            aborted,
            store_persistent: self.store.is_persistent(),
        };
        self.notify(&report).await;

        tracing::info!(
            records = report.outcomes.len(),
            fallbacks = report.fallback_count(),
            unsaved = report.unsaved_count(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "pipeline run finished"
        );
        report
    }

    async fn process(&self, competitor: &CompetitorConfig) -> CompetitorOutcome {
        let mut trace = vec![PipelineState::Pending, PipelineState::Extracting];
        tracing::info!(competitor = %competitor.name, url = %competitor.url, "extracting changelog");

        let update = match self.extractor.extract(competitor).await {
            Ok(update) => {
                trace.push(PipelineState::Extracted);
                update
            }
            Err(e) => {
                tracing::warn!(
                    competitor = %competitor.name,
                    url = %competitor.url,
                    error = %e,
                    "extraction failed; generating fallback changelog"
                );
                trace.push(PipelineState::Fallback);
                self.fallback.generate(competitor).await
            }
        };

        trace.push(PipelineState::Summarizing);
        let record = match self.summarizer.summarize(&update).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    competitor = %competitor.name,
                    error = %e,
                    "summarization failed; storing placeholder record"
                );
                SummaryRecord::placeholder(&update)
            }
        };

        let persisted = match self.store.upsert_summary(&record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    competitor = %competitor.name,
                    error = %e,
                    "failed to persist summary; keeping it in the run report only"
                );
                false
            }
        };
        trace.push(PipelineState::Stored);

        let comparison = self.visual_check(competitor).await;

        let outcome = CompetitorOutcome {
            competitor: competitor.name.clone(),
            source_url: update.source_url,
            record,
            trace,
            persisted,
            comparison,
        };
        tracing::info!(
            competitor = %outcome.competitor,
            impact_score = outcome.record.impact_score,
            confidence = %outcome.record.confidence,
            source = %outcome.record.source,
            persisted,
            trace = %outcome.trace_label(),
            "competitor stored"
        );
        outcome
    }

    async fn visual_check(&self, competitor: &CompetitorConfig) -> Option<ScreenshotComparison> {
        if !self.visual.is_available() {
            return None;
        }
        match self.visual.check(competitor).await {
            Ok(Some(comparison)) => {
                if let Err(e) = self.store.upsert_comparison(&comparison).await {
                    tracing::warn!(
                        competitor = %competitor.name,
                        error = %e,
                        "failed to persist screenshot comparison"
                    );
                }
                Some(comparison)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    competitor = %competitor.name,
                    error = %e,
                    "visual diff failed for competitor"
                );
                None
            }
        }
    }

    async fn notify(&self, report: &RunReport) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if report.outcomes.is_empty() {
            tracing::debug!("no records produced; digest skipped");
            return;
        }

        let entries: Vec<DigestEntry<'_>> = report
            .outcomes
            .iter()
            .map(|o| DigestEntry {
                record: &o.record,
                link: Some(o.source_url.as_str()),
            })
            .collect();
        let period = format!("Last {} days", self.analysis_days);
        if let Err(e) = notifier.send_digest(&entries, &period).await {
            tracing::warn!(error = %e, "digest notification failed");
        }

        let Some(threshold) = self.alert_threshold else {
            return;
        };
        for record in report.records().filter(|r| r.impact_score >= threshold) {
            let alert = strategic_alert(record);
            if let Err(e) = notifier.send_strategic_alert(record, &alert).await {
                tracing::warn!(
                    competitor = %record.competitor,
                    error = %e,
                    "strategic alert notification failed"
                );
            }
        }
    }
}

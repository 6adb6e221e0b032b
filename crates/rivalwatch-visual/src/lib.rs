//! Optional visual change detection for competitor pages.
//!
//! A headless browser captures the competitor URL, the capture is compared
//! with the previous one for the same competitor, and a highlighted diff
//! image is written next to both.

pub mod capture;
pub mod compare;
pub mod error;

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use rivalwatch_core::{AppConfig, CompetitorConfig, ScreenshotComparison};
use rivalwatch_scraper::RequestGate;

pub use capture::{
    diff_file_name, latest_screenshot, prune_screenshots, screenshot_file_name, ScreenshotCapturer,
};
pub use compare::{compare_images, DiffOutcome, CHANGED_PIXEL_CUTOFF};
pub use error::VisualError;

/// Visual diff capability for one process, resolved once.
#[derive(Debug, Clone)]
pub enum VisualDiff {
    Available(VisualDiffEngine),
    Unavailable { reason: String },
}

/// Each browser launch first waits on `gate`.
#[derive(Debug, Clone)]
pub struct VisualDiffEngine {
    capturer: ScreenshotCapturer,
    threshold: f64,
    gate: RequestGate,
}

impl VisualDiff {
    /// Switched off by configuration, or no runnable browser, gives
    /// [`VisualDiff::Unavailable`].
    pub async fn detect(config: &AppConfig) -> Self {
        if !config.visual_diff_enabled {
            return VisualDiff::Unavailable {
                reason: "disabled by RIVALWATCH_VISUAL_DIFF".to_string(),
            };
        }

        let capturer = ScreenshotCapturer::new(
            config.browser_bin.clone(),
            config.screenshots_dir.clone(),
            config.screenshot_timeout_secs,
        );
        match capturer.probe().await {
            Ok(()) => VisualDiff::Available(VisualDiffEngine {
                capturer,
                threshold: config.diff_threshold,
                gate: RequestGate::from_millis(config.min_request_interval_ms),
            }),
            Err(e) => {
                tracing::warn!(
                    browser = %config.browser_bin,
                    error = %e,
                    "visual diff disabled for this run"
                );
                VisualDiff::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// An available engine with an unthrottled gate; see [`VisualDiff::with_gate`].
    #[must_use]
    pub fn with_engine(capturer: ScreenshotCapturer, threshold: f64) -> Self {
        VisualDiff::Available(VisualDiffEngine {
            capturer,
            threshold,
            gate: RequestGate::new(Duration::ZERO),
        })
    }

    /// Throttle browser launches through `gate`. Pass the extractor's gate
    /// so captures and fetches share one spacing. No-op when unavailable.
    #[must_use]
    pub fn with_gate(self, gate: RequestGate) -> Self {
        match self {
            VisualDiff::Available(engine) => VisualDiff::Available(VisualDiffEngine { gate, ..engine }),
            unavailable @ VisualDiff::Unavailable { .. } => unavailable,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, VisualDiff::Available(_))
    }

    /// Capture the competitor's page and compare it with the previous capture.
    ///
    /// Returns `Ok(None)` on the first capture for a competitor.
    ///
    /// # Errors
    ///
    /// [`VisualError::Unavailable`] when the capability is absent, otherwise
    /// any capture, decode or write failure.
    pub async fn check(
        &self,
        competitor: &CompetitorConfig,
    ) -> Result<Option<ScreenshotComparison>, VisualError> {
        match self {
            VisualDiff::Available(engine) => engine.check(competitor).await,
            VisualDiff::Unavailable { reason } => Err(VisualError::Unavailable {
                reason: reason.clone(),
            }),
        }
    }
}

impl VisualDiffEngine {
    async fn check(
        &self,
        competitor: &CompetitorConfig,
    ) -> Result<Option<ScreenshotComparison>, VisualError> {
        let slug = competitor.slug();
        self.gate.wait_if_needed().await;
        let captured_at = Utc::now();
        let after_path = self
            .capturer
            .capture(&competitor.name, &slug, &competitor.url, captured_at)
            .await?;

        let Some(before_path) =
            latest_screenshot(self.capturer.dir(), &slug, Some(after_path.as_path()))?
        else {
            tracing::info!(
                competitor = %competitor.name,
                "first screenshot captured; nothing to compare"
            );
            return Ok(None);
        };

        let diff_path = self.capturer.dir().join(diff_file_name(&slug, captured_at));
        let threshold = self.threshold;
        let (before, after, diff) = (before_path.clone(), after_path.clone(), diff_path.clone());

        // Decoding and comparing full-page PNGs is CPU-bound.
        let outcome = tokio::task::spawn_blocking(move || -> Result<DiffOutcome, VisualError> {
            let outcome = compare_images(&image::open(&before)?, &image::open(&after)?, threshold);
            outcome.diff_image.save(&diff)?;
            Ok(outcome)
        })
        .await
        .map_err(|e| VisualError::Capture {
            competitor: competitor.name.clone(),
            reason: format!("comparison task failed: {e}"),
        })??;

        tracing::info!(
            competitor = %competitor.name,
            difference_score = outcome.difference_score,
            changed_ratio = outcome.changed_ratio,
            similarity = outcome.similarity,
            significant = outcome.significant,
            "visual comparison complete"
        );

        Ok(Some(ScreenshotComparison {
            competitor: competitor.name.clone(),
            captured_at,
            before_path: display(before_path),
            after_path: display(after_path),
            diff_path: display(diff_path),
            difference_score: outcome.difference_score,
            changed_ratio: outcome.changed_ratio,
            similarity: outcome.similarity,
            significant: outcome.significant,
            threshold,
        }))
    }
}

fn display(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

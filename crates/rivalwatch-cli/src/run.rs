//! `run` command: one pipeline pass over the selected competitors.

use rivalwatch_core::{load_competitors, AppConfig, CompetitorConfig, CompetitorsFile};
use rivalwatch_db::Store;
use rivalwatch_pipeline::{Pipeline, RunControl, RunReport};

use crate::{print_unsaved_notice, truncate};

/// Which competitors a run covers. Empty means all of them.
#[derive(Debug, Default)]
pub(crate) struct Selection {
    pub names: Vec<String>,
    pub category: Option<String>,
}

impl Selection {
    /// Resolve against the competitor file, keeping file order.
    ///
    /// # Errors
    ///
    /// Returns an error if a named competitor is not configured or the
    /// selection is empty.
    pub(crate) fn resolve(&self, file: &CompetitorsFile) -> anyhow::Result<Vec<CompetitorConfig>> {
        for name in &self.names {
            if file.find(name).is_none() {
                anyhow::bail!("competitor '{name}' is not configured");
            }
        }

        let selected: Vec<CompetitorConfig> = file
            .competitors
            .iter()
            .filter(|c| {
                self.names.is_empty()
                    || self
                        .names
                        .iter()
                        .any(|n| file.find(n).is_some_and(|found| found.name == c.name))
            })
            .filter(|c| {
                self.category
                    .as_deref()
                    .is_none_or(|cat| c.category.eq_ignore_ascii_case(cat.trim()))
            })
            .cloned()
            .collect();

        if selected.is_empty() {
            anyhow::bail!("no competitors match the selection");
        }
        Ok(selected)
    }
}

/// Run the pipeline and print the report.
///
/// Ctrl-C stops the run after the competitor in progress.
///
/// # Errors
///
/// Returns an error if the competitor file cannot be loaded, the selection
/// is empty, or an HTTP client cannot be built. Per-competitor failures are
/// absorbed by the pipeline.
pub(crate) async fn run_pipeline(
    config: &AppConfig,
    selection: &Selection,
    no_notify: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let file = load_competitors(&config.competitors_path)?;
    let competitors = selection.resolve(&file)?;

    if dry_run {
        let names: Vec<&str> = competitors.iter().map(|c| c.name.as_str()).collect();
        println!(
            "dry-run: would run {} competitors: [{}]",
            competitors.len(),
            names.join(", ")
        );
        return Ok(());
    }

    let store = Store::connect(config).await;
    let mut pipeline = Pipeline::from_app_config(config, store).await?;
    if no_notify {
        pipeline = pipeline.without_notifier();
    }

    let control = RunControl::new();
    let interrupt = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current competitor");
            interrupt.abort();
        }
    });

    let report = pipeline.run(&competitors, &control).await;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "{:<20}{:<14}{:<8}{:<12}{:<7}TOP BULLET",
        "COMPETITOR", "SOURCE", "IMPACT", "CONFIDENCE", "SAVED"
    );
    for outcome in &report.outcomes {
        let record = &outcome.record;
        let saved = if report.store_persistent && outcome.persisted {
            "yes"
        } else {
            "no"
        };
        println!(
            "{:<20}{:<14}{:<8}{:<12}{:<7}{}",
            truncate(&outcome.competitor, 18),
            record.source.as_str(),
            record.impact_score,
            record.confidence.as_str(),
            saved,
            truncate(record.top_bullet(), 60)
        );
    }

    println!();
    let average = report
        .average_impact()
        .map_or_else(|| "n/a".to_string(), |a| format!("{a:.1}"));
    println!(
        "{} competitors for {}; {} fallbacks; average impact {average}",
        report.outcomes.len(),
        report.run_date,
        report.fallback_count()
    );
    if report.aborted {
        println!("run aborted after {} competitors", report.outcomes.len());
    }
    if !report.store_persistent {
        print_unsaved_notice();
    } else if report.unsaved_count() > 0 {
        println!(
            "warning: {} records could not be saved; see the log for details",
            report.unsaved_count()
        );
    }
}

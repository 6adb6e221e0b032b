//! Read-only commands over the competitor file and the store.

use chrono::Utc;
use rivalwatch_core::{load_competitors, AppConfig, CompetitorsFile, DateRange};
use rivalwatch_db::{Store, SummaryFilter, MAX_LIST_LIMIT};
use rivalwatch_pipeline::{Notifier, LEADERBOARD_SIZE};

use crate::{print_unsaved_notice, truncate};

/// List configured competitors, optionally for one category.
///
/// # Errors
///
/// Returns an error if the competitor file cannot be loaded.
pub(crate) fn run_competitors(config: &AppConfig, category: Option<&str>) -> anyhow::Result<()> {
    let file = load_competitors(&config.competitors_path)?;
    let competitors = match category {
        Some(cat) => file.by_category(cat),
        None => file.competitors.iter().collect(),
    };

    if competitors.is_empty() {
        println!(
            "no competitors configured{}",
            category.map(|c| format!(" in category {c}")).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{:<20}{:<24}{:<10}URL", "NAME", "CATEGORY", "PLATFORM");
    for c in competitors {
        println!(
            "{:<20}{:<24}{:<10}{}",
            c.name,
            c.category,
            c.effective_platform(),
            c.url
        );
    }
    Ok(())
}

/// The stored name for `name` as typed on the command line; matching is
/// case-insensitive and accepts slugs.
///
/// # Errors
///
/// Returns an error if no configured competitor matches.
pub(crate) fn configured_name(file: &CompetitorsFile, name: &str) -> anyhow::Result<String> {
    file.find(name)
        .map(|c| c.name.clone())
        .ok_or_else(|| anyhow::anyhow!("competitor '{name}' is not configured"))
}

/// Print stored summaries for `competitor` over the last `days` days.
///
/// # Errors
///
/// Returns an error if the competitor is not configured or the store query
/// fails.
pub(crate) async fn run_history(
    config: &AppConfig,
    competitor: &str,
    days: u32,
) -> anyhow::Result<()> {
    let competitor = configured_name(&load_competitors(&config.competitors_path)?, competitor)?;
    let store = Store::connect(config).await;
    let filter = SummaryFilter {
        competitor: Some(competitor.clone()),
        range: Some(DateRange::last_days(days, Utc::now().date_naive())),
        limit: Some(MAX_LIST_LIMIT),
    };
    let records = store.list_summaries(&filter).await?;

    if records.is_empty() {
        println!("no summaries for {competitor} in the last {days} days; run `rivalwatch run` first");
        if !store.is_persistent() {
            print_unsaved_notice();
        }
        return Ok(());
    }

    println!("{:<12}{:<8}{:<12}{:<14}TOP BULLET", "DATE", "IMPACT", "CONFIDENCE", "SOURCE");
    for record in &records {
        println!(
            "{:<12}{:<8}{:<12}{:<14}{}",
            record.captured_on.format("%Y-%m-%d"),
            record.impact_score,
            record.confidence.as_str(),
            record.source.as_str(),
            truncate(record.top_bullet(), 70)
        );
    }
    Ok(())
}

/// Print the trend view for `competitor` over the last `days` days.
///
/// # Errors
///
/// Returns an error if the competitor is not configured or the store query
/// fails.
pub(crate) async fn run_trend(config: &AppConfig, competitor: &str, days: u32) -> anyhow::Result<()> {
    let competitor = configured_name(&load_competitors(&config.competitors_path)?, competitor)?;
    let store = Store::connect(config).await;
    let range = DateRange::last_days(days, Utc::now().date_naive());
    let trend = store.trend_analysis(&competitor, range).await?;

    println!("Competitor: {}", trend.competitor);
    println!("Range: {} to {}", trend.range.from, trend.range.to);
    println!("Records: {}", trend.record_count);
    if trend.record_count == 0 {
        if !store.is_persistent() {
            print_unsaved_notice();
        }
        return Ok(());
    }

    let fmt_impact = |v: Option<u8>| v.map_or_else(|| "n/a".to_string(), |i| i.to_string());
    println!("Average impact: {:.1}", trend.average_impact);
    println!(
        "Min / max / latest: {} / {} / {}",
        fmt_impact(trend.min_impact),
        fmt_impact(trend.max_impact),
        fmt_impact(trend.latest_impact)
    );
    println!("Momentum: {} ({:+})", trend.momentum, trend.impact_delta);
    println!(
        "Confidence: high {}, medium {}, low {}",
        trend.confidence_counts.high, trend.confidence_counts.medium, trend.confidence_counts.low
    );
    if !trend.top_categories.is_empty() {
        println!("Top categories: {}", trend.top_categories.join(", "));
    }
    println!("Fallback share: {:.0}%", trend.fallback_share * 100.0);
    Ok(())
}

/// Print competitors ranked by impact; optionally post the top entries.
///
/// # Errors
///
/// Returns an error if the store query fails, `--notify` is given without a
/// configured webhook, or the webhook rejects the message.
pub(crate) async fn run_leaderboard(
    config: &AppConfig,
    per_competitor: i64,
    notify: bool,
) -> anyhow::Result<()> {
    let store = Store::connect(config).await;
    let records = store.latest_per_competitor(per_competitor).await?;

    if records.is_empty() {
        println!("no summaries stored yet; run `rivalwatch run` first");
        if !store.is_persistent() {
            print_unsaved_notice();
        }
        return Ok(());
    }

    println!("{:<6}{:<20}{:<12}{:<8}CONFIDENCE", "RANK", "COMPETITOR", "DATE", "IMPACT");
    for (rank, record) in records.iter().enumerate() {
        println!(
            "{:<6}{:<20}{:<12}{:<8}{}",
            rank + 1,
            truncate(&record.competitor, 18),
            record.captured_on.format("%Y-%m-%d"),
            record.impact_score,
            record.confidence.as_str()
        );
    }

    if notify {
        let notifier = Notifier::from_app_config(config)?
            .ok_or_else(|| anyhow::anyhow!("--notify requires SLACK_WEBHOOK_URL to be set"))?;
        notifier.send_leaderboard(&records).await?;
        println!(
            "leaderboard posted (top {})",
            records.len().min(LEADERBOARD_SIZE)
        );
    }
    Ok(())
}

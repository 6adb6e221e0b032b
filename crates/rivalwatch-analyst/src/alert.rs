use rivalwatch_core::{SourceMethod, SummaryRecord};

/// One-line call to action for a summary, chosen by the first rule that fits:
/// AI work with impact above 70, pricing changes, impact above 85, three or
/// more categories, then a generic line.
#[must_use]
pub fn strategic_alert(record: &SummaryRecord) -> String {
    let name = &record.competitor;
    let has = |category: &str| {
        record
            .categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    };

    let mut alert = if has("AI") && record.impact_score > 70 {
        format!("{name}'s AI advancement signals a market shift; evaluate our AI roadmap urgency.")
    } else if has("Pricing") {
        format!("{name} pricing changes suggest repositioning; monitor customer reaction.")
    } else if record.impact_score > 85 {
        format!("High-impact updates from {name}; immediate competitive response needed.")
    } else if record.categories.len() >= 3 {
        format!("Multi-category updates from {name}; assess feature gap priorities.")
    } else {
        format!("{name} incremental progress; monitor for strategic pattern emergence.")
    };

    if record.source == SourceMethod::AiGenerated {
        alert.push_str(" (AI-generated analysis)");
    }
    alert
}

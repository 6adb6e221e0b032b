//! Offline summarization used when no language model is configured.

use std::sync::LazyLock;

use regex::Regex;
use rivalwatch_core::{Confidence, SummaryDraft};

/// Bullets kept by the offline summarizer and the fallback generator.
pub const HEURISTIC_BULLETS: usize = 3;

/// Impact assigned to every heuristic summary.
pub const HEURISTIC_IMPACT: u8 = 60;

/// Lines shorter than this are not promoted to bullets when the text has no
/// list items of its own.
const MIN_PROSE_LINE_CHARS: usize = 21;
const MAX_PROSE_BULLET_CHARS: usize = 100;

static CATEGORY_KEYWORDS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "AI",
            r"(?i)\b(ai|llm|gpt|copilot|agents?|machine learning|artificial intelligence)\b",
        ),
        (
            "Pricing",
            r"(?i)\b(price|prices|pricing|plans?|billing|tiers?|seats?)\b",
        ),
        (
            "UI",
            r"(?i)\b(ui|ux|interface|redesign(ed)?|dark mode|layout|sidebar)\b",
        ),
        (
            "Integration",
            r"(?i)\b(integrations?|api|webhooks?|sync|connectors?|plugins?)\b",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| (category, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Generic bullets used to pad short summaries and placeholder changelogs.
#[must_use]
pub fn generic_bullets(competitor: &str) -> [String; HEURISTIC_BULLETS] {
    [
        format!("{competitor} released new product features and enhancements"),
        "Various improvements to user experience and performance".to_string(),
        "Continued platform development and integration capabilities".to_string(),
    ]
}

/// Summarize changelog text without a model.
///
/// List items are preferred; without any, longer prose lines are used. The
/// result always carries exactly [`HEURISTIC_BULLETS`] bullets, low confidence
/// and an impact of [`HEURISTIC_IMPACT`].
#[must_use]
pub fn heuristic_draft(competitor: &str, text: &str) -> SummaryDraft {
    let mut bullets: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter_map(list_item)
        .filter(|item| !item.is_empty())
        .take(HEURISTIC_BULLETS)
        .map(str::to_string)
        .collect();

    if bullets.is_empty() {
        bullets = text
            .lines()
            .map(str::trim)
            .filter(|line| {
                line.chars().count() >= MIN_PROSE_LINE_CHARS && !line.starts_with('[')
            })
            .take(HEURISTIC_BULLETS)
            .map(shorten)
            .collect();
    }

    for filler in generic_bullets(competitor) {
        if bullets.len() >= HEURISTIC_BULLETS {
            break;
        }
        bullets.push(filler);
    }

    SummaryDraft {
        bullets,
        insight: format!(
            "{competitor} continues active product development with regular feature updates and improvements."
        ),
        impact_score: HEURISTIC_IMPACT,
        confidence: Confidence::Low,
        categories: keyword_categories(text),
    }
}

/// Category labels whose keywords appear in `text`; `["Feature"]` when none do.
#[must_use]
pub fn keyword_categories(text: &str) -> Vec<String> {
    let found: Vec<String> = CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(category, _)| (*category).to_string())
        .collect();
    if found.is_empty() {
        vec!["Feature".to_string()]
    } else {
        found
    }
}

/// Body of a `- `, `* ` or `• ` list item.
pub(crate) fn list_item(line: &str) -> Option<&str> {
    ["- ", "* ", "\u{2022} "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim)
}

fn shorten(line: &str) -> String {
    match line.char_indices().nth(MAX_PROSE_BULLET_CHARS) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_items_become_bullets() {
        let text = "March 14, 2026 \u{2013} Triage Intelligence\n- Suggested assignees\n\u{2022} Suggested labels\n* Bulk accept\n- Fourth item";
        let draft = heuristic_draft("Linear", text);
        assert_eq!(
            draft.bullets,
            ["Suggested assignees", "Suggested labels", "Bulk accept"]
        );
        assert_eq!(draft.impact_score, HEURISTIC_IMPACT);
        assert_eq!(draft.confidence, Confidence::Low);
        assert!(draft.insight.starts_with("Linear continues"));
    }

    #[test]
    fn prose_lines_are_used_without_list_items() {
        let long = "x".repeat(150);
        let text = format!("Short\n[AI-generated fallback for Slack]\nHuddles now support screen drawing\n{long}");
        let draft = heuristic_draft("Slack", &text);
        assert_eq!(draft.bullets[0], "Huddles now support screen drawing");
        assert_eq!(draft.bullets[1], format!("{}...", "x".repeat(100)));
        assert_eq!(draft.bullets[2], "Slack released new product features and enhancements");
    }

    #[test]
    fn empty_text_is_padded_with_generic_bullets() {
        let draft = heuristic_draft("Asana", "");
        assert_eq!(draft.bullets, generic_bullets("Asana"));
        assert_eq!(draft.categories, ["Feature"]);
    }

    #[test]
    fn keyword_categories_match_whole_words() {
        assert_eq!(
            keyword_categories("New AI agents and a redesigned sidebar"),
            ["AI", "UI"]
        );
        assert_eq!(
            keyword_categories("Business plan price drops; Slack integration"),
            ["Pricing", "Integration"]
        );
        // "maintain" contains "ai" but is not a match.
        assert_eq!(keyword_categories("We maintain uptime"), ["Feature"]);
    }
}

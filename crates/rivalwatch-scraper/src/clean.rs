//! Platform-specific line filtering and final truncation.

use rivalwatch_core::Platform;

/// Appended when extracted text is cut at the configured maximum.
pub const TRUNCATION_MARKER: &str = "... [content truncated]";

/// Notion release-note pages repeat the page title and scatter short
/// fragments (dates, emoji, toggles) between entries.
const NOTION_MIN_LINE_CHARS: usize = 11;

/// Linear's changelog carries short nav crumbs and per-entry labels.
const LINEAR_MIN_LINE_CHARS: usize = 16;

/// Drop lines known to be noise on the given platform.
#[must_use]
pub fn clean_for_platform(text: &str, platform: Platform) -> String {
    let keep: fn(&str) -> bool = match platform {
        Platform::Notion => |line| {
            !(line.starts_with("What's New") || line.starts_with("What\u{2019}s New"))
                && line.chars().count() >= NOTION_MIN_LINE_CHARS
        },
        Platform::Linear => |line| {
            !line.to_lowercase().starts_with("changelog")
                && line.chars().count() >= LINEAR_MIN_LINE_CHARS
        },
        Platform::Generic => |_| true,
    };

    text.lines()
        .map(str::trim)
        .filter(|line| keep(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim lines, drop empty ones, and cut to `max_chars` characters.
#[must_use]
pub fn finalize(text: &str, max_chars: usize) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    match joined.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &joined[..cut]),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notion_drops_title_and_short_fragments() {
        let text = "What's New\nWhat\u{2019}s New in Notion\nMarch 2026\nNotion Mail is now generally available\n\u{1F389}";
        assert_eq!(
            clean_for_platform(text, Platform::Notion),
            "Notion Mail is now generally available"
        );
    }

    #[test]
    fn linear_drops_changelog_headers_and_labels() {
        let text = "Changelog\nCHANGELOG \u{00B7} March\nImprovements\nTriage Intelligence suggests owners\nFixes";
        assert_eq!(
            clean_for_platform(text, Platform::Linear),
            "Triage Intelligence suggests owners"
        );
    }

    #[test]
    fn generic_keeps_everything() {
        let text = "A\nB\nWhat's New";
        assert_eq!(clean_for_platform(text, Platform::Generic), text);
    }

    #[test]
    fn finalize_trims_and_drops_empty_lines() {
        assert_eq!(finalize("  a  \n\n\t\n b", 100), "a\nb");
    }

    #[test]
    fn finalize_truncates_on_char_boundary() {
        let text = "é".repeat(20);
        let out = finalize(&text, 5);
        assert_eq!(out, format!("ééééé{TRUNCATION_MARKER}"));
    }

    #[test]
    fn finalize_leaves_text_at_limit_alone() {
        assert_eq!(finalize("abcde", 5), "abcde");
    }
}

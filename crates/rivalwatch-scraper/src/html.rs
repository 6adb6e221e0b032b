//! HTML to plain text for changelog pages.
//!
//! Regex based: changelog pages are shallow enough that dropping boilerplate
//! blocks and picking the main content container gives readable text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Elements whose whole content is boilerplate or non-text.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "template", "iframe", "nav", "header", "footer",
    "aside", "form", "button",
];

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));
static BOILERPLATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BOILERPLATE_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("valid boilerplate regex")
        })
        .collect()
});
static MAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main\s*>").expect("valid main regex"));
static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<article\b[^>]*>(.*?)</article\s*>").expect("valid article regex")
});
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)(?:</body\s*>|$)").expect("valid body regex"));
static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").expect("valid li regex"));
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|section|article|main|h[1-6]|ul|ol|li|table|tr|br|hr|blockquote|pre|dl|dt|dd|figure|figcaption|time)\b[^>]*>",
    )
    .expect("valid block regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid entity regex")
});

/// Convert a page to trimmed, non-empty text lines joined by `\n`.
///
/// List items become `- ` bullets. Content is taken from `<main>` when
/// present, otherwise from all `<article>` blocks, otherwise from `<body>`.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let mut doc = COMMENT_RE.replace_all(html, " ").into_owned();
    for re in BOILERPLATE_RES.iter() {
        doc = re.replace_all(&doc, "\n").into_owned();
    }

    let content = select_content(&doc);

    let with_bullets = LIST_ITEM_RE.replace_all(&content, "\n- ");
    let with_breaks = BLOCK_RE.replace_all(&with_bullets, "\n");
    let no_tags = TAG_RE.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&no_tags);

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty() && line != "-")
        .collect::<Vec<_>>()
        .join("\n")
}

fn select_content(doc: &str) -> String {
    if let Some(main) = MAIN_RE.captures(doc).and_then(|c| c.get(1)) {
        return main.as_str().to_string();
    }

    let articles: Vec<&str> = ARTICLE_RE
        .captures_iter(doc)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if !articles.is_empty() {
        return articles.join("\n");
    }

    BODY_RE
        .captures(doc)
        .and_then(|c| c.get(1))
        .map_or_else(|| doc.to_string(), |m| m.as_str().to_string())
}

/// Decode named entities common on changelog pages plus numeric references.
/// Unknown entities are left untouched.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            decode_entity(entity).map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    let c = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "hellip" => '\u{2026}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_main_over_body() {
        let html = r#"<html><body><nav>Home Pricing</nav>
            <div>Sidebar promo</div>
            <main><h1>Changelog</h1><p>Introducing Triage Intelligence.</p></main>
            <footer>(c) Linear</footer></body></html>"#;
        assert_eq!(
            html_to_text(html),
            "Changelog\nIntroducing Triage Intelligence."
        );
    }

    #[test]
    fn joins_all_articles_when_no_main() {
        let html = "<body><div>cookie banner</div>\
            <article><h2>March 3</h2><p>Dark mode</p></article>\
            <article><h2>March 10</h2><p>SCIM support</p></article></body>";
        assert_eq!(html_to_text(html), "March 3\nDark mode\nMarch 10\nSCIM support");
    }

    #[test]
    fn falls_back_to_body_then_whole_document() {
        assert_eq!(
            html_to_text("<html><body><p>Only body text</p></body></html>"),
            "Only body text"
        );
        assert_eq!(html_to_text("<p>fragment</p>"), "fragment");
    }

    #[test]
    fn strips_scripts_styles_and_comments() {
        let html = r#"<main><script type="text/javascript">var x = "<p>no</p>";</script>
            <style>.a { color: red }</style><!-- hidden <p>note</p> -->
            <p>Visible</p></main>"#;
        assert_eq!(html_to_text(html), "Visible");
    }

    #[test]
    fn list_items_become_bullets() {
        let html = "<main><ul><li>Faster sync</li><li><strong>New</strong> API</li></ul></main>";
        assert_eq!(html_to_text(html), "- Faster sync\n- New API");
    }

    #[test]
    fn decodes_entities_after_stripping_tags() {
        let html = "<main><p>Q&amp;A &lt;beta&gt; &#8212; it&rsquo;s &#x2713; &unknown;</p></main>";
        assert_eq!(
            html_to_text(html),
            "Q&A <beta> \u{2014} it\u{2019}s \u{2713} &unknown;"
        );
    }

    #[test]
    fn collapses_inline_whitespace() {
        let html = "<main><p>  Sub-issues   now\tsupport\n templates  </p></main>";
        assert_eq!(html_to_text(html), "Sub-issues now support\ntemplates");
    }
}

//! Stand-in changelog text for competitors whose page could not be extracted.

use chrono::{NaiveDate, Utc};
use rivalwatch_core::{CompetitorConfig, RawUpdate, SourceMethod};

use crate::heuristic::{generic_bullets, list_item, HEURISTIC_BULLETS};
use crate::llm::{ChatRequest, LlmClient};

const SYSTEM_PROMPT: &str = "You are a product manager writing realistic changelog entries. \
Generate authentic-sounding product updates.";

const FALLBACK_TEMPERATURE: f32 = 0.7;
const FALLBACK_MAX_TOKENS: u32 = 400;
const DEFAULT_TITLE: &str = "Product Update";

/// Separators a model may put between the date and the title.
const TITLE_SEPARATORS: [&str; 4] = [" \u{2013} ", " \u{2014} ", " - ", ": "];

/// Last line of every generated changelog.
#[must_use]
pub fn fallback_marker(competitor: &str) -> String {
    format!("[AI-generated fallback for {competitor}]")
}

/// One generated changelog entry: a dated title and three bullets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEntry {
    pub date: NaiveDate,
    pub title: String,
    pub bullets: Vec<String>,
}

impl FallbackEntry {
    /// Deterministic entry used when no model is available or the call fails.
    #[must_use]
    pub fn placeholder(competitor: &str, date: NaiveDate) -> Self {
        Self {
            date,
            title: DEFAULT_TITLE.to_string(),
            bullets: generic_bullets(competitor).to_vec(),
        }
    }

    /// Read a model reply into an entry dated `date`.
    ///
    /// Whatever date the model wrote is ignored. Missing pieces are filled
    /// from the placeholder, extra bullets are dropped.
    #[must_use]
    pub fn parse(output: &str, competitor: &str, date: NaiveDate) -> Self {
        let lines: Vec<&str> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let mut bullets: Vec<String> = lines
            .iter()
            .filter_map(|line| list_item(line).or_else(|| numbered_item(line)))
            .filter(|item| !item.is_empty())
            .take(HEURISTIC_BULLETS)
            .map(str::to_string)
            .collect();
        for filler in generic_bullets(competitor) {
            if bullets.len() >= HEURISTIC_BULLETS {
                break;
            }
            bullets.push(filler);
        }

        let title = lines
            .iter()
            .find(|line| {
                list_item(line).is_none() && numbered_item(line).is_none() && !line.starts_with('[')
            })
            .map(|line| clean_title(line))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Self {
            date,
            title,
            bullets,
        }
    }

    /// Render as changelog text ending with the [`fallback_marker`] line.
    #[must_use]
    pub fn render(&self, competitor: &str) -> String {
        let bullets = self
            .bullets
            .iter()
            .map(|b| format!("- {b}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{} \u{2013} {}\n{bullets}\n\n{}",
            self.date.format("%B %d, %Y"),
            self.title,
            fallback_marker(competitor)
        )
    }
}

/// Writes plausible changelog text when extraction fails.
///
/// [`FallbackGenerator::generate`] never fails: model errors are logged and a
/// deterministic placeholder entry is produced instead.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    llm: Option<LlmClient>,
}

impl FallbackGenerator {
    #[must_use]
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, competitor: &CompetitorConfig) -> RawUpdate {
        let captured_at = Utc::now();
        let today = captured_at.date_naive();

        let entry = match &self.llm {
            Some(llm) => {
                let prompt = fallback_prompt(&competitor.name, today);
                let request = ChatRequest {
                    system: SYSTEM_PROMPT,
                    user: &prompt,
                    temperature: FALLBACK_TEMPERATURE,
                    max_tokens: FALLBACK_MAX_TOKENS,
                    json_object: false,
                };
                match llm.complete(&request).await {
                    Ok(output) => FallbackEntry::parse(&output, &competitor.name, today),
                    Err(e) => {
                        tracing::warn!(
                            competitor = %competitor.name,
                            error = %e,
                            "fallback generation failed; using placeholder changelog"
                        );
                        FallbackEntry::placeholder(&competitor.name, today)
                    }
                }
            }
            None => FallbackEntry::placeholder(&competitor.name, today),
        };

        RawUpdate {
            competitor: competitor.name.clone(),
            source_url: competitor.url.clone(),
            text: entry.render(&competitor.name),
            method: SourceMethod::AiGenerated,
            captured_at,
        }
    }
}

fn fallback_prompt(competitor: &str, today: NaiveDate) -> String {
    format!(
        "Generate a realistic changelog update for {competitor} dated {date}.\n\n\
         Format exactly:\n\
         {date} \u{2013} [Title]\n\
         - Bullet point 1\n\
         - Bullet point 2\n\
         - Bullet point 3\n\n\
         Use features that fit {competitor}'s product. Keep bullet points concise but specific.",
        date = today.format("%B %d, %Y"),
    )
}

fn numbered_item(line: &str) -> Option<&str> {
    let (number, rest) = line.split_once(". ")?;
    (!number.is_empty() && number.chars().all(|c| c.is_ascii_digit())).then(|| rest.trim())
}

fn clean_title(line: &str) -> String {
    let line = line.trim_start_matches('#').trim();
    let title = TITLE_SEPARATORS
        .iter()
        .find_map(|sep| line.split_once(sep).map(|(_, title)| title))
        .unwrap_or(line);
    title
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '*' | '"'))
        .trim()
        .to_string()
}

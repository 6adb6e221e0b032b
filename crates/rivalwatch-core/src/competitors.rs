use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Changelog hosting platform; selects the extractor's cleanup rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Notion,
    Linear,
    Generic,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Notion => write!(f, "notion"),
            Platform::Linear => write!(f, "linear"),
            Platform::Generic => write!(f, "generic"),
        }
    }
}

impl Platform {
    /// Infer the platform from a URL's host.
    #[must_use]
    pub fn infer_from_url(url: &str) -> Self {
        let Some(host) = url_host(url) else {
            return Platform::Generic;
        };
        let host = host.to_ascii_lowercase();
        let matches_domain = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if matches_domain("linear.app") {
            Platform::Linear
        } else if matches_domain("notion.so") || matches_domain("notion.site") {
            Platform::Notion
        } else {
            Platform::Generic
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorConfig {
    pub name: String,
    pub url: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl CompetitorConfig {
    /// Build an entry with only the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: category.into(),
            platform: None,
            description: None,
            homepage: None,
        }
    }

    /// Generate a URL-safe slug from the competitor name.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Explicit platform if configured, otherwise inferred from the URL.
    #[must_use]
    pub fn effective_platform(&self) -> Platform {
        self.platform
            .unwrap_or_else(|| Platform::infer_from_url(&self.url))
    }

    /// Validate a single entry in isolation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an empty name or category, or a
    /// URL that is not an absolute `http`/`https` URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "competitor name must be non-empty".to_string(),
            ));
        }
        if self.slug().is_empty() {
            return Err(ConfigError::Validation(format!(
                "competitor '{}' has no ASCII alphanumeric characters to build a slug from",
                self.name
            )));
        }
        if self.category.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "competitor '{}' has an empty category",
                self.name
            )));
        }
        if url_host(&self.url).is_none() {
            return Err(ConfigError::Validation(format!(
                "competitor '{}' has invalid url '{}'; expected http(s)://host/...",
                self.name, self.url
            )));
        }
        Ok(())
    }
}

/// Lowercase ASCII alphanumerics, with runs of anything else collapsed to `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn url_host(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    if host.is_empty() || host.contains(char::is_whitespace) {
        None
    } else {
        Some(host)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompetitorsFile {
    pub competitors: Vec<CompetitorConfig>,
}

impl CompetitorsFile {
    /// Case-insensitive lookup by display name or slug.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&CompetitorConfig> {
        let wanted = name.trim().to_lowercase();
        let wanted_slug = slugify(&wanted);
        self.competitors
            .iter()
            .find(|c| c.name.to_lowercase() == wanted || c.slug() == wanted_slug)
    }

    /// All competitors in a category, case-insensitively, in file order.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&CompetitorConfig> {
        let wanted = category.trim().to_lowercase();
        self.competitors
            .iter()
            .filter(|c| c.category.to_lowercase() == wanted)
            .collect()
    }

    /// Distinct categories in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.competitors
            .iter()
            .map(|c| c.category.as_str())
            .filter(|c| seen.insert(c.to_lowercase()))
            .collect()
    }

    /// Append a competitor for the rest of the session.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the entry is invalid or its name
    /// or slug collides with an existing competitor.
    pub fn push(&mut self, competitor: CompetitorConfig) -> Result<(), ConfigError> {
        self.competitors.push(competitor);
        if let Err(e) = validate_competitors(self) {
            self.competitors.pop();
            return Err(e);
        }
        Ok(())
    }
}

/// Load and validate the competitors configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_competitors(path: &Path) -> Result<CompetitorsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CompetitorsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_competitors(&content)
}

/// Parse and validate competitors YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_competitors(content: &str) -> Result<CompetitorsFile, ConfigError> {
    let file: CompetitorsFile = serde_yaml::from_str(content)?;
    validate_competitors(&file)?;
    Ok(file)
}

fn validate_competitors(file: &CompetitorsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for competitor in &file.competitors {
        competitor.validate()?;

        let lower_name = competitor.name.trim().to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate competitor name: '{}'",
                competitor.name
            )));
        }

        let slug = competitor.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate competitor slug: '{}' (from competitor '{}')",
                slug, competitor.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "competitors_test.rs"]
mod tests;

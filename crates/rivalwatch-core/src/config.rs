use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every setting has a default or is optional, so an empty environment yields a
/// working offline configuration: no store, no language model, no webhook.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
#[allow(clippy::too_many_lines)]
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match optional(var) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
            },
        }
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("RIVALWATCH_ENV", "development"))?;

    let bind_addr = parse_addr("RIVALWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("RIVALWATCH_LOG_LEVEL", "info");
    let competitors_path = PathBuf::from(or_default(
        "RIVALWATCH_COMPETITORS_PATH",
        "./config/competitors.yaml",
    ));

    let db_max_connections = parse_u32("RIVALWATCH_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("RIVALWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("RIVALWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs =
        parse_u64("RIVALWATCH_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default(
        "RIVALWATCH_SCRAPER_USER_AGENT",
        "Mozilla/5.0 (compatible; rivalwatch/0.1; +changelog-monitor)",
    );
    let min_request_interval_ms = parse_u64("RIVALWATCH_MIN_REQUEST_INTERVAL_MS", "1000")?;
    let min_content_chars = parse_usize("RIVALWATCH_MIN_CONTENT_CHARS", "50")?;
    let max_content_chars = parse_usize("RIVALWATCH_MAX_CONTENT_CHARS", "10000")?;
    if max_content_chars < min_content_chars {
        return Err(invalid(
            "RIVALWATCH_MAX_CONTENT_CHARS",
            format!("must be at least RIVALWATCH_MIN_CONTENT_CHARS ({min_content_chars})"),
        ));
    }

    let openai_api_key = optional("OPENAI_API_KEY");
    let openai_base_url = or_default("OPENAI_BASE_URL", "https://api.openai.com/v1")
        .trim_end_matches('/')
        .to_string();
    let llm_model = or_default("RIVALWATCH_LLM_MODEL", "gpt-4o");
    let llm_timeout_secs = parse_u64("RIVALWATCH_LLM_TIMEOUT_SECS", "60")?;
    let analysis_days = parse_u32("RIVALWATCH_ANALYSIS_DAYS", "7")?;

    let slack_webhook_url = optional("SLACK_WEBHOOK_URL");
    let webhook_timeout_secs = parse_u64("RIVALWATCH_WEBHOOK_TIMEOUT_SECS", "10")?;
    let alert_threshold = match optional("RIVALWATCH_ALERT_THRESHOLD") {
        None => None,
        Some(raw) => {
            let value = raw
                .parse::<u8>()
                .map_err(|e| invalid("RIVALWATCH_ALERT_THRESHOLD", e.to_string()))?;
            if value > 100 {
                return Err(invalid(
                    "RIVALWATCH_ALERT_THRESHOLD",
                    "must be between 0 and 100",
                ));
            }
            Some(value)
        }
    };

    let visual_diff_enabled = parse_bool("RIVALWATCH_VISUAL_DIFF", false)?;
    let browser_bin = or_default("RIVALWATCH_BROWSER_BIN", "chromium");
    let screenshots_dir = PathBuf::from(or_default("RIVALWATCH_SCREENSHOTS_DIR", "./screenshots"));
    let screenshot_timeout_secs = parse_u64("RIVALWATCH_SCREENSHOT_TIMEOUT_SECS", "30")?;
    let diff_threshold = or_default("RIVALWATCH_DIFF_THRESHOLD", "0.01")
        .parse::<f64>()
        .map_err(|e| invalid("RIVALWATCH_DIFF_THRESHOLD", e.to_string()))?;
    if !(0.0..=1.0).contains(&diff_threshold) {
        return Err(invalid(
            "RIVALWATCH_DIFF_THRESHOLD",
            "must be between 0.0 and 1.0",
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        competitors_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        min_request_interval_ms,
        min_content_chars,
        max_content_chars,
        openai_api_key,
        openai_base_url,
        llm_model,
        llm_timeout_secs,
        analysis_days,
        slack_webhook_url,
        webhook_timeout_secs,
        alert_threshold,
        visual_diff_enabled,
        browser_bin,
        screenshots_dir,
        screenshot_timeout_secs,
        diff_threshold,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "RIVALWATCH_ENV",
            format!("unknown environment '{other}'"),
        )),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

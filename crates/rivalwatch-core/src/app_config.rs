use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` means no store is configured; runs keep results in memory only.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub competitors_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    /// Floor between two outbound calls sharing a request gate.
    pub min_request_interval_ms: u64,
    pub min_content_chars: usize,
    pub max_content_chars: usize,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub analysis_days: u32,
    pub slack_webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    pub alert_threshold: Option<u8>,
    pub visual_diff_enabled: bool,
    pub browser_bin: String,
    pub screenshots_dir: PathBuf,
    pub screenshot_timeout_secs: u64,
    pub diff_threshold: f64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("competitors_path", &self.competitors_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("min_request_interval_ms", &self.min_request_interval_ms)
            .field("min_content_chars", &self.min_content_chars)
            .field("max_content_chars", &self.max_content_chars)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_base_url", &self.openai_base_url)
            .field("llm_model", &self.llm_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("analysis_days", &self.analysis_days)
            .field(
                "slack_webhook_url",
                &self.slack_webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .field("webhook_timeout_secs", &self.webhook_timeout_secs)
            .field("alert_threshold", &self.alert_threshold)
            .field("visual_diff_enabled", &self.visual_diff_enabled)
            .field("browser_bin", &self.browser_bin)
            .field("screenshots_dir", &self.screenshots_dir)
            .field("screenshot_timeout_secs", &self.screenshot_timeout_secs)
            .field("diff_threshold", &self.diff_threshold)
            .finish()
    }
}

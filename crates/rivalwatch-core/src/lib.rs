//! Shared domain types and configuration for rivalwatch.

pub mod app_config;
pub mod competitors;
pub mod config;
pub mod records;
pub mod trend;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use competitors::{
    load_competitors, parse_competitors, slugify, CompetitorConfig, CompetitorsFile, Platform,
};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use records::{
    Confidence, DateRange, RawUpdate, ScreenshotComparison, SourceMethod, SummaryDraft,
    SummaryRecord, EMPTY_SUMMARY_BULLET, MAX_BULLETS, PLACEHOLDER_BULLET,
};
pub use trend::{ConfidenceCounts, Momentum, TrendAnalysis};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read competitors file {path}: {source}")]
    CompetitorsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse competitors file: {0}")]
    CompetitorsFileParse(#[from] serde_yaml::Error),

    #[error("competitor validation failed: {0}")]
    Validation(String),
}

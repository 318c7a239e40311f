//! Error types shared across the timeline crate

use crate::analysis::AnalysisState;

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Error types for timeline operations
#[derive(thiserror::Error, Debug)]
pub enum TimelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Analysis already in progress ({0:?})")]
    AnalysisInProgress(AnalysisState),

    #[error("A chapter draft is already being edited")]
    PromotionBusy,

    #[error("No chapter draft to confirm")]
    NoDraft,

    #[error("No detection at index {0}")]
    DetectionNotFound(usize),

    #[error("Chapter update has no fields to change")]
    EmptyChapterUpdate,
}

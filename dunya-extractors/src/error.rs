//! Error types for dunya-extractors

use thiserror::Error;

/// Result type for extractor operations
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Extractor error
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Setting lookup by a name that was never registered
    #[error("Missing setting: {0}")]
    MissingSetting(String),

    /// Setting present but of the wrong shape
    #[error("Invalid setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    /// Remote cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Value could not be (de)serialised
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Declared module metadata is incomplete or inconsistent
    #[error("Invalid module metadata: {}", .0.join("; "))]
    Metadata(Vec<String>),

    /// No module registered under this slug
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// Input file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O error (file read)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for ExtractorError {
    fn from(err: redis::RedisError) -> Self {
        ExtractorError::Cache(err.to_string())
    }
}

//! Custom error types for ragchain

use thiserror::Error;

/// Main error type for ragchain operations
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Invalid chunk configuration: overlap_size ({overlap_size}) must be smaller than window_size ({window_size})"
    )]
    InvalidChunkConfig {
        window_size: usize,
        overlap_size: usize,
    },

    #[error("Vectors should not be null (all zeros)")]
    ZeroMagnitudeVector,

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Convert error: {0}")]
    Convert(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),
}

/// Malformed snapshots and unserializable stores both surface as
/// `Serialization`.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias for ragchain
pub type Result<T> = std::result::Result<T, Error>;

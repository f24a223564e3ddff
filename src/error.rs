//! Error types for Skriv.

use thiserror::Error;

/// Library-level error type for Skriv operations.
#[derive(Error, Debug)]
pub enum SkrivError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media file not found: {0}")]
    MediaNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio conversion failed: {0}")]
    Conversion(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model download failed: {0}")]
    ModelDownload(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WAV read error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type alias for Skriv operations.
pub type Result<T> = std::result::Result<T, SkrivError>;

//! Error types for schoolai.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchoolError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Solving stream errors
    #[error("Solving stream unavailable: {message}")]
    StreamUnavailable { message: String },

    // Upstream request/response calls
    #[error("Request to {endpoint} failed: {message}")]
    Api { endpoint: String, message: String },

    #[error("Invalid {field}: {message}")]
    InvalidRequest { field: String, message: String },

    // Speech practice errors
    #[error("Speech capability not supported: {capability}")]
    UnsupportedCapability { capability: String },

    #[error("Speech recognition failed: {message}")]
    RecognitionFailed { message: String },

    #[error("Speech synthesis failed: {message}")]
    SynthesisFailed { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SchoolError>;

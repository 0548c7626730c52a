//! Error types for FlowLab

use thiserror::Error;

/// Result type alias using FlowLab Error
pub type Result<T> = std::result::Result<T, Error>;

/// FlowLab error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("Invalid test case id: {0}")]
    InvalidCaseId(String),

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Platform {platform} is not accepted by the conversion API as a {role}")]
    UnsupportedPlatform { platform: String, role: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Alert delivery failed: {0}")]
    AlertDelivery(String),
}

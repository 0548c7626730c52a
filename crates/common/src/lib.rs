//! FlowLab Common Library
//!
//! Shared types, configuration, the conversion API client and SMS alerting
//! used by the fixture generators, the test runner and the CLI.

pub mod alert;
pub mod client;
pub mod config;
pub mod error;
pub mod layout;
pub mod types;

// Re-export commonly used types
pub use alert::{Alerter, Priority, ResourceSnapshot};
pub use client::{ConversionClient, ConvertOptions, JobOutcome, JobState, JobStatus};
pub use config::LabConfig;
pub use error::{Error, Result};
pub use layout::LabLayout;
pub use types::*;

/// FlowLab version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default lab root
pub fn default_lab_root() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".flowlab")
}

/// Default configuration file path
pub fn default_config_path() -> std::path::PathBuf {
    default_lab_root().join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(std::path::PathBuf::from)
    }
}

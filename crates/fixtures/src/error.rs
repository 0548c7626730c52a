//! Fixture generation errors

use thiserror::Error;

pub type FixtureResult<T> = std::result::Result<T, FixtureError>;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No {platform} fixture for case {case}")]
    UnknownCase { platform: String, case: String },
}

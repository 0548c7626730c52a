//! Error types for the runner, conversion session and explorer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Lab(#[from] flowlab_common::Error),

    #[error("Conversion API unavailable: {0}")]
    ApiUnavailable(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

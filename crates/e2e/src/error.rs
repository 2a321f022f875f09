//! Error types for E2E testing

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Ambiguous: {what} matched {count} elements")]
    Ambiguous { what: String, count: usize },

    #[error("Column '{0}' has no items to select")]
    EmptyColumn(String),

    #[error("Label '{0}' is too short to carry a display suffix")]
    LabelTooShort(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Web server failed to start: {0}")]
    ServerStartup(String),

    #[error("Web server readiness check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npm install playwright @axe-core/playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Bridge protocol error: {0}")]
    Bridge(String),

    #[error("Test case parse error: {0}")]
    SpecParse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Coarse failure class recorded in the results file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Resolution,
    Assertion,
    Timeout,
    Infrastructure,
}

impl E2eError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            E2eError::NotFound { .. }
            | E2eError::Ambiguous { .. }
            | E2eError::EmptyColumn(_)
            | E2eError::LabelTooShort(_) => ErrorCategory::Resolution,
            E2eError::AssertionFailed(_) => ErrorCategory::Assertion,
            E2eError::Timeout(_) => ErrorCategory::Timeout,
            _ => ErrorCategory::Infrastructure,
        }
    }

    /// True for lookups that found nothing, as opposed to broken infrastructure
    pub fn is_not_found(&self) -> bool {
        matches!(self, E2eError::NotFound { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = E2eError::NotFound { what: "column Trees".into() };
        assert_eq!(err.category(), ErrorCategory::Resolution);
        assert!(err.is_not_found());

        assert_eq!(
            E2eError::AssertionFailed("x".into()).category(),
            ErrorCategory::Assertion
        );
        assert_eq!(E2eError::Timeout("click".into()).category(), ErrorCategory::Timeout);
        assert_eq!(E2eError::PlaywrightNotFound.category(), ErrorCategory::Infrastructure);
    }
}

//! Accessibility audit backed by axe-core

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::driver::PageDriver;
use crate::error::{E2eError, E2eResult};

/// WCAG 2.0 / 2.1 level A and AA rule tags
pub const WCAG_TAGS: [&str; 4] = ["wcag2a", "wcag2aa", "wcag21a", "wcag21aa"];

/// A single rule failure reported by axe-core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub help_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<ViolationNode>,
}

/// A DOM node implicated in a violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationNode {
    #[serde(default)]
    pub target: Vec<String>,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub failure_summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AccessibilityAudit {
    tags: Vec<String>,
}

impl Default for AccessibilityAudit {
    fn default() -> Self {
        Self::new(WCAG_TAGS.iter().map(|t| t.to_string()).collect())
    }
}

impl AccessibilityAudit {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Scan the current page and return every violation found
    pub async fn scan<D: PageDriver + ?Sized>(&self, driver: &mut D) -> E2eResult<Vec<Violation>> {
        let violations = driver.accessibility_scan(&self.tags).await?;
        info!(
            "Accessibility scan ({}) found {} violation(s)",
            self.tags.join(","),
            violations.len()
        );
        Ok(violations)
    }

    /// Scan and fail unless the violation list is empty
    pub async fn assert_clean<D: PageDriver + ?Sized>(&self, driver: &mut D) -> E2eResult<()> {
        let violations = self.scan(driver).await?;
        if violations.is_empty() {
            return Ok(());
        }

        for v in &violations {
            warn!(
                "[{}] {} ({} node(s), impact: {})",
                v.id,
                v.help,
                v.nodes.len(),
                v.impact.as_deref().unwrap_or("unknown")
            );
        }
        let ids: Vec<&str> = violations.iter().map(|v| v.id.as_str()).collect();
        Err(E2eError::AssertionFailed(format!(
            "expected no accessibility violations, found {}: {}",
            violations.len(),
            ids.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::SimulatedBoard;

    #[test]
    fn test_parse_axe_violation() {
        let json = r#"{
            "id": "color-contrast",
            "impact": "serious",
            "description": "Ensures the contrast ratio is sufficient",
            "help": "Elements must have sufficient color contrast",
            "helpUrl": "https://dequeuniversity.com/rules/axe/4.8/color-contrast",
            "tags": ["wcag2aa"],
            "nodes": [{ "target": ["li:nth-child(2)"], "html": "<li>Pine</li>", "failureSummary": "Fix this" }]
        }"#;
        let v: Violation = serde_json::from_str(json).unwrap();
        assert_eq!(v.id, "color-contrast");
        assert_eq!(v.nodes.len(), 1);
        assert_eq!(v.nodes[0].failure_summary.as_deref(), Some("Fix this"));
    }

    #[tokio::test]
    async fn test_clean_page_passes() {
        let mut board = SimulatedBoard::demo();
        let audit = AccessibilityAudit::default();
        assert_eq!(audit.tags().len(), 4);
        audit.assert_clean(&mut board).await.unwrap();
    }

    #[tokio::test]
    async fn test_violations_fail_with_ids() {
        let mut board = SimulatedBoard::demo().with_violation("aria-required-children", &["wcag2a"]);
        let err = AccessibilityAudit::default().assert_clean(&mut board).await.unwrap_err();
        match err {
            E2eError::AssertionFailed(msg) => assert!(msg.contains("aria-required-children")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_scan_filters_by_tag() {
        let mut board = SimulatedBoard::demo().with_violation("best-practice-rule", &["best-practice"]);
        let violations = AccessibilityAudit::default().scan(&mut board).await.unwrap();
        assert!(violations.is_empty());
    }
}

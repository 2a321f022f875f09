//! Main test runner that orchestrates the web server, pages and test cases

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::a11y::AccessibilityAudit;
use crate::config::{Project, SuiteConfig};
use crate::driver::{DriverFactory, PageDriver};
use crate::error::{E2eError, E2eResult, ErrorCategory};
use crate::locator::Locator;
use crate::resolver::{expect_item_visible, expect_title, expect_visible};
use crate::selection::SelectionPolicy;
use crate::server::ServerHandle;
use crate::suite::{CaseKind, TestCase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    /// Failed at least once, then passed on a retry
    Flaky,
    Failed,
    Skipped,
}

/// One run of a case from a fresh page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub category: Option<ErrorCategory>,
    pub screenshot_path: Option<PathBuf>,
}

/// Result of running a single case under one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub project: String,
    pub status: CaseStatus,
    pub duration_ms: u64,
    pub attempts: Vec<AttemptResult>,
    /// Item labels moved by the last attempt, if the case moves items
    pub moved: Vec<String>,
}

impl TestResult {
    pub fn error(&self) -> Option<&str> {
        self.attempts.last().and_then(|a| a.error.as_deref())
    }
}

/// Result of running all cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub seed: u64,
    pub total: usize,
    pub passed: usize,
    pub flaky: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which cases and projects to run
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub tag: Option<String>,
    pub grep: Option<Regex>,
    pub project: Option<String>,
}

impl CaseFilter {
    fn matches(&self, case: &TestCase) -> bool {
        let tag_ok = self.tag.as_deref().map(|t| case.has_tag(t)).unwrap_or(true);
        let grep_ok = self.grep.as_ref().map(|re| re.is_match(&case.name)).unwrap_or(true);
        tag_ok && grep_ok
    }
}

/// Navigate to the start page and run one case against it
///
/// Returns the labels a move case relocated, empty for other kinds.
pub async fn execute_case<D: PageDriver + ?Sized>(
    driver: &mut D,
    case: &TestCase,
    config: &SuiteConfig,
    policy: &mut SelectionPolicy,
) -> E2eResult<Vec<String>> {
    driver.goto(&config.start_url()).await?;
    let timeout = config.expect_timeout();

    match &case.kind {
        CaseKind::Title { expected } => {
            expect_title(driver, expected, timeout).await?;
        }
        CaseKind::ElementsVisible { heading, columns, items } => {
            expect_visible(driver, &Locator::heading(heading), timeout).await?;
            for column in columns {
                expect_visible(driver, &Locator::column(column), timeout).await?;
            }
            for item in items {
                expect_item_visible(driver, &item.column, &item.item, timeout).await?;
            }
        }
        CaseKind::Move(scenario) => {
            let outcome = scenario.run(driver, policy, timeout).await?;
            return Ok(outcome.moved);
        }
        CaseKind::Accessibility { tags } => {
            AccessibilityAudit::new(tags.clone()).assert_clean(driver).await?;
        }
    }
    Ok(Vec::new())
}

/// Main E2E test runner
pub struct TestRunner<F: DriverFactory> {
    factory: F,
    config: SuiteConfig,
    policy: SelectionPolicy,
    server: Option<ServerHandle>,
}

impl<F: DriverFactory> TestRunner<F> {
    pub fn new(factory: F, config: SuiteConfig) -> Self {
        let policy = SelectionPolicy::from_option(config.selection_seed);
        Self {
            factory,
            config,
            policy,
            server: None,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Seed driving item selection for this run
    pub fn seed(&self) -> u64 {
        self.policy.seed()
    }

    /// Start the configured web server, if any
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }
        if let Some(server_config) = &self.config.web_server {
            self.server = Some(ServerHandle::start(server_config).await?);
        }
        Ok(())
    }

    pub fn stop_server(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }

    /// Apply the filter and the `only` markers
    pub fn select_cases(&self, cases: &[TestCase], filter: &CaseFilter) -> E2eResult<Vec<TestCase>> {
        let focused: Vec<&TestCase> = cases.iter().filter(|c| c.only).collect();
        if let Some(case) = focused.first() {
            if self.config.forbid_only {
                return Err(E2eError::Config(format!(
                    "case '{}' is marked only, which is forbidden in this run",
                    case.name
                )));
            }
        }

        Ok(cases
            .iter()
            .filter(|c| focused.is_empty() || c.only)
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    fn select_projects(&self, filter: &CaseFilter) -> E2eResult<Vec<Project>> {
        let projects: Vec<Project> = self
            .config
            .projects
            .iter()
            .filter(|p| filter.project.as_deref().map(|name| p.name == name).unwrap_or(true))
            .cloned()
            .collect();
        if projects.is_empty() {
            return Err(E2eError::Config(format!(
                "no project named '{}'",
                filter.project.as_deref().unwrap_or_default()
            )));
        }
        Ok(projects)
    }

    /// Run every selected case under every selected project
    pub async fn run_cases(&mut self, cases: &[TestCase], filter: &CaseFilter) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let selected = self.select_cases(cases, filter)?;
        let projects = self.select_projects(filter)?;

        self.start_server().await?;

        info!(
            "Running {} case(s) x {} project(s) against {} (seed {})",
            selected.len(),
            projects.len(),
            self.config.start_url(),
            self.seed()
        );

        let mut results = Vec::new();
        for project in &projects {
            for case in &selected {
                let result = self.run_case(case, project).await;
                match result.status {
                    CaseStatus::Passed => info!("✓ [{}] {} ({} ms)", project.name, result.name, result.duration_ms),
                    CaseStatus::Flaky => warn!(
                        "~ [{}] {} passed after {} attempts",
                        project.name,
                        result.name,
                        result.attempts.len()
                    ),
                    CaseStatus::Failed => error!(
                        "✗ [{}] {} - {}",
                        project.name,
                        result.name,
                        result.error().unwrap_or("unknown error")
                    ),
                    CaseStatus::Skipped => info!("- [{}] {} (skipped)", project.name, result.name),
                }
                results.push(result);
            }
        }

        let count = |status: CaseStatus| results.iter().filter(|r| r.status == status).count();
        let suite = TestSuiteResult {
            started_at,
            seed: self.seed(),
            total: results.len(),
            passed: count(CaseStatus::Passed),
            flaky: count(CaseStatus::Flaky),
            failed: count(CaseStatus::Failed),
            skipped: count(CaseStatus::Skipped),
            duration_ms: start.elapsed().as_millis() as u64,
            results,
        };

        info!("");
        info!(
            "Test Results: {} passed, {} flaky, {} failed, {} skipped ({} ms, seed {})",
            suite.passed, suite.flaky, suite.failed, suite.skipped, suite.duration_ms, suite.seed
        );
        Ok(suite)
    }

    /// Run a case, retrying from a fresh page until it passes or retries run out
    pub async fn run_case(&mut self, case: &TestCase, project: &Project) -> TestResult {
        let start = Instant::now();
        let mut attempts = Vec::new();
        let mut moved = Vec::new();

        if case.skip {
            return TestResult {
                name: case.name.clone(),
                project: project.name.clone(),
                status: CaseStatus::Skipped,
                duration_ms: 0,
                attempts,
                moved,
            };
        }

        let mut status = CaseStatus::Failed;
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                warn!("Retrying '{}' (attempt {} of {})", case.name, attempt + 1, self.config.retries + 1);
            }
            let (result, attempt_moved) = self.attempt(case, project, attempt).await;
            moved = attempt_moved;
            let passed = result.error.is_none();
            attempts.push(result);
            if passed {
                status = if attempt == 0 { CaseStatus::Passed } else { CaseStatus::Flaky };
                break;
            }
        }

        TestResult {
            name: case.name.clone(),
            project: project.name.clone(),
            status,
            duration_ms: start.elapsed().as_millis() as u64,
            attempts,
            moved,
        }
    }

    async fn attempt(&mut self, case: &TestCase, project: &Project, attempt: u32) -> (AttemptResult, Vec<String>) {
        let start = Instant::now();
        debug!("Running '{}' under '{}' (attempt {})", case.name, project.name, attempt + 1);

        let mut driver = match self.factory.open(project).await {
            Ok(driver) => driver,
            Err(e) => {
                let result = AttemptResult {
                    attempt,
                    duration_ms: start.elapsed().as_millis() as u64,
                    category: Some(e.category()),
                    error: Some(e.to_string()),
                    screenshot_path: None,
                };
                return (result, Vec::new());
            }
        };

        let test_timeout = self.config.test_timeout();
        let outcome = match tokio::time::timeout(
            test_timeout,
            execute_case(&mut driver, case, &self.config, &mut self.policy),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(E2eError::Timeout(format!(
                "test '{}' exceeded {:?}",
                case.name, test_timeout
            ))),
        };

        let mut screenshot_path = None;
        if outcome.is_err() && self.config.screenshot_on_failure {
            let path = self
                .config
                .screenshot_dir()
                .join(format!("{}-{}-attempt{}.png", project.name, slug(&case.name), attempt + 1));
            match driver.screenshot(&path).await {
                Ok(()) => screenshot_path = Some(path),
                Err(e) => warn!("Could not capture failure screenshot: {}", e),
            }
        }

        if let Err(e) = driver.close().await {
            warn!("Failed to close page: {}", e);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(moved) => (
                AttemptResult {
                    attempt,
                    duration_ms,
                    error: None,
                    category: None,
                    screenshot_path,
                },
                moved,
            ),
            Err(e) => (
                AttemptResult {
                    attempt,
                    duration_ms,
                    category: Some(e.category()),
                    error: Some(e.to_string()),
                    screenshot_path,
                },
                Vec::new(),
            ),
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// File-name-safe form of a case name
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

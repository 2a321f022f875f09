//! Suite configuration
//!
//! Resolution order: built-in defaults, then an optional YAML file, then
//! environment variables, then command line flags (applied by the caller).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Public copy of the demo page
pub const STAGING_URL: &str = "https://cdpn.io/pen/debug/WNPVoag";

/// Local development server
pub const LOCAL_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280, height: 720 }
    }
}

/// A named browser configuration the whole suite runs under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub browser: Browser,
    #[serde(default = "default_true")]
    pub javascript_enabled: bool,
}

impl Project {
    pub fn chromium() -> Self {
        Self {
            name: "chromium".to_string(),
            browser: Browser::Chromium,
            javascript_enabled: true,
        }
    }

    pub fn javascript_disabled() -> Self {
        Self {
            name: "javascript-disabled".to_string(),
            browser: Browser::Chromium,
            javascript_enabled: false,
        }
    }
}

/// Local server started before the suite and stopped after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebServerConfig {
    /// Shell command that starts the server
    pub command: String,

    /// URL polled until it answers with a success status
    pub url: String,

    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Skip spawning when `url` already answers
    #[serde(default = "default_true")]
    pub reuse_existing: bool,
}

impl WebServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub base_url: String,
    pub start_path: String,
    pub viewport: Viewport,
    pub action_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub test_timeout_ms: u64,
    pub expect_timeout_ms: u64,
    pub retries: u32,
    pub headless: bool,
    pub slow_mo_ms: u64,
    pub projects: Vec<Project>,
    pub screenshot_on_failure: bool,
    pub output_dir: PathBuf,
    /// Directory whose `node_modules` provides playwright and axe-core
    pub node_project_dir: PathBuf,
    pub selection_seed: Option<u64>,
    pub web_server: Option<WebServerConfig>,
    /// Reject cases marked `only` (set under CI)
    pub forbid_only: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: LOCAL_URL.to_string(),
            start_path: "/".to_string(),
            viewport: Viewport::default(),
            action_timeout_ms: 10_000,
            navigation_timeout_ms: 10_000,
            test_timeout_ms: 30_000,
            expect_timeout_ms: 5_000,
            retries: 2,
            headless: true,
            slow_mo_ms: 0,
            projects: vec![Project::chromium()],
            screenshot_on_failure: true,
            output_dir: PathBuf::from("test-results"),
            node_project_dir: PathBuf::from("."),
            selection_seed: None,
            web_server: None,
            forbid_only: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_startup_timeout_ms() -> u64 {
    60_000
}

impl SuiteConfig {
    /// Parse a config from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Load defaults, the YAML file when present, then the process environment
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                debug!("Loading suite config from {}", p.display());
                Self::from_yaml(&std::fs::read_to_string(p)?)?
            }
            Some(p) => {
                return Err(E2eError::Config(format!("config file not found: {}", p.display())));
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("STAGING").as_deref() == Some("1") {
            self.base_url = STAGING_URL.to_string();
        }
        if let Some(url) = lookup("E2E_BASE_URL") {
            self.base_url = url;
        }
        if lookup("CI").map(|v| !v.is_empty()).unwrap_or(false) {
            self.forbid_only = true;
        }
        if let Some(headless) = lookup("E2E_HEADLESS") {
            self.headless = parse_bool(&headless)
                .ok_or_else(|| E2eError::Config(format!("E2E_HEADLESS: not a boolean: {}", headless)))?;
        }
        if let Some(seed) = lookup("E2E_SEED") {
            let seed = seed
                .parse()
                .map_err(|_| E2eError::Config(format!("E2E_SEED: not an integer: {}", seed)))?;
            self.selection_seed = Some(seed);
        }
        Ok(())
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.base_url.is_empty() {
            return Err(E2eError::Config("base_url must not be empty".to_string()));
        }
        if self.projects.is_empty() {
            return Err(E2eError::Config("at least one project is required".to_string()));
        }
        if self.test_timeout_ms == 0 || self.action_timeout_ms == 0 || self.expect_timeout_ms == 0 {
            return Err(E2eError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    /// The page each test case starts from
    pub fn start_url(&self) -> String {
        let path = self.start_path.trim();
        if path.is_empty() || path == "/" {
            return self.base_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    pub fn expect_timeout(&self) -> Duration {
        Duration::from_millis(self.expect_timeout_ms)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

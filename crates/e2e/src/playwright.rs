//! Playwright browser automation
//!
//! Each page is a `node` child process running the embedded bridge script.
//! Requests and replies are single JSON lines over stdin/stdout, so a page
//! keeps its browser state for the whole test attempt.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::a11y::Violation;
use crate::config::{Project, SuiteConfig};
use crate::driver::{DriverFactory, PageDriver};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

const BRIDGE_SCRIPT: &str = include_str!("../assets/bridge.js");

/// Extra time granted on top of Playwright's own timeouts so its
/// `TimeoutError` arrives before ours fires
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

/// Read the reply to request `id`
///
/// Replies to earlier requests whose wait was abandoned (a timeout, or a
/// cancelled test) are still queued on the stream and are discarded here.
async fn read_reply<R>(lines: &mut Lines<R>, id: u64) -> E2eResult<BridgeResponse>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = lines
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Bridge("bridge process exited".to_string()))?;
        let response: BridgeResponse = serde_json::from_str(&line)?;
        if response.id < id {
            debug!("Discarding stale bridge reply {} while waiting for {}", response.id, id);
            continue;
        }
        if response.id > id {
            return Err(E2eError::Bridge(format!(
                "reply id {} is ahead of request id {}",
                response.id, id
            )));
        }
        return Ok(response);
    }
}

/// Launches one bridge process per page
pub struct PlaywrightFactory {
    config: SuiteConfig,
    /// Keeps the bridge script on disk for the factory's lifetime
    _script_dir: tempfile::TempDir,
    script_path: PathBuf,
}

impl PlaywrightFactory {
    pub fn new(config: SuiteConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.node_project_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;
        debug!("Bridge script written to {}", script_path.display());

        Ok(Self {
            config,
            _script_dir: script_dir,
            script_path,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(project_dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    fn node_path(&self) -> PathBuf {
        let dir = self
            .config
            .node_project_dir
            .canonicalize()
            .unwrap_or_else(|_| self.config.node_project_dir.clone());
        dir.join("node_modules")
    }

    fn init_message(&self, project: &Project) -> Value {
        json!({
            "browser": project.browser.as_str(),
            "headless": self.config.headless,
            "slow_mo_ms": self.config.slow_mo_ms,
            "viewport": self.config.viewport,
            "javascript_enabled": project.javascript_enabled,
            "action_timeout_ms": self.config.action_timeout_ms,
            "navigation_timeout_ms": self.config.navigation_timeout_ms,
        })
    }
}

#[async_trait]
impl DriverFactory for PlaywrightFactory {
    type Driver = PlaywrightDriver;

    async fn open(&self, project: &Project) -> E2eResult<PlaywrightDriver> {
        let mut child = TokioCommand::new("node")
            .arg(&self.script_path)
            .current_dir(&self.config.node_project_dir)
            .env("NODE_PATH", self.node_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            let project_name = project.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[bridge:{}] {}", project_name, line);
                }
            });
        }

        let mut driver = PlaywrightDriver {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            action_timeout: self.config.action_timeout() + TIMEOUT_GRACE,
            navigation_timeout: self.config.navigation_timeout() + TIMEOUT_GRACE,
            scan_timeout: self.config.test_timeout(),
            closed: false,
        };

        info!(
            "Launching {} for project '{}' (headless: {})",
            project.browser.as_str(),
            project.name,
            self.config.headless
        );
        let init = self.init_message(project);
        driver.send(init, 0, self.config.test_timeout()).await?;
        Ok(driver)
    }
}

/// A live browser page behind the bridge
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    action_timeout: Duration,
    navigation_timeout: Duration,
    scan_timeout: Duration,
    closed: bool,
}

impl PlaywrightDriver {
    async fn roundtrip(&mut self, line: &str, id: u64) -> E2eResult<BridgeResponse> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        read_reply(&mut self.stdout, id).await
    }

    async fn send(&mut self, mut body: Value, id: u64, timeout: Duration) -> E2eResult<Value> {
        body["id"] = json!(id);
        let what = body
            .get("cmd")
            .and_then(Value::as_str)
            .unwrap_or("launch")
            .to_string();
        let line = serde_json::to_string(&body)?;
        debug!("bridge <- {}", line);

        let response = match tokio::time::timeout(timeout, self.roundtrip(&line, id)).await {
            Ok(response) => response?,
            Err(_) => return Err(E2eError::Timeout(format!("{} after {:?}", what, timeout))),
        };

        if response.ok {
            return Ok(response.value);
        }

        let message = response.error.unwrap_or_else(|| "unknown error".to_string());
        if response.timeout {
            Err(E2eError::Timeout(format!("{}: {}", what, message)))
        } else {
            Err(E2eError::Playwright(format!("{}: {}", what, message)))
        }
    }

    async fn command(&mut self, body: Value, timeout: Duration) -> E2eResult<Value> {
        if self.closed {
            return Err(E2eError::Bridge("page already closed".to_string()));
        }
        self.next_id += 1;
        let id = self.next_id;
        self.send(body, id, timeout).await
    }

    async fn action(&mut self, body: Value) -> E2eResult<Value> {
        let timeout = self.action_timeout;
        self.command(body, timeout).await
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        let timeout = self.navigation_timeout;
        self.command(json!({ "cmd": "goto", "url": url }), timeout).await?;
        Ok(())
    }

    async fn title(&mut self) -> E2eResult<String> {
        let value = self.action(json!({ "cmd": "title" })).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        let value = self.action(json!({ "cmd": "count", "locator": locator })).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Bridge(format!("count returned {}", value)))
    }

    async fn text_content(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        let value = self.action(json!({ "cmd": "text_content", "locator": locator })).await?;
        Ok(value.as_str().map(String::from))
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        let value = self.action(json!({ "cmd": "is_visible", "locator": locator })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn get_attribute(&mut self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .action(json!({ "cmd": "get_attribute", "locator": locator, "name": name }))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        debug!("click {}", locator);
        self.action(json!({ "cmd": "click", "locator": locator })).await?;
        Ok(())
    }

    async fn hover(&mut self, locator: &Locator) -> E2eResult<()> {
        debug!("hover {}", locator);
        self.action(json!({ "cmd": "hover", "locator": locator })).await?;
        Ok(())
    }

    async fn mouse_down(&mut self) -> E2eResult<()> {
        self.action(json!({ "cmd": "mouse_down" })).await?;
        Ok(())
    }

    async fn mouse_move(&mut self, x: f64, y: f64) -> E2eResult<()> {
        self.action(json!({ "cmd": "mouse_move", "x": x, "y": y })).await?;
        Ok(())
    }

    async fn mouse_up(&mut self) -> E2eResult<()> {
        self.action(json!({ "cmd": "mouse_up" })).await?;
        Ok(())
    }

    async fn accessibility_scan(&mut self, tags: &[String]) -> E2eResult<Vec<Violation>> {
        let timeout = self.scan_timeout;
        let value = self.command(json!({ "cmd": "axe", "tags": tags }), timeout).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path = path.to_string_lossy();
        self.action(json!({ "cmd": "screenshot", "path": path })).await?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.action(json!({ "cmd": "close" })).await;
        self.closed = true;

        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("Bridge exited with {}", status),
            _ => {
                warn!("Bridge did not exit, killing it");
                let _ = self.child.kill().await;
            }
        }
        result.map(|_| ())
    }
}

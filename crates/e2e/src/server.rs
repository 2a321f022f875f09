//! Local web server management - spawning and readiness checking

use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::WebServerConfig;
use crate::error::{E2eError, E2eResult};

/// Handle to the page-under-test server
pub struct ServerHandle {
    /// None when an already running server was reused
    child: Option<Child>,
    pub url: String,
}

impl ServerHandle {
    /// Start the configured server, or attach to one that already answers
    pub async fn start(config: &WebServerConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        if config.reuse_existing && Self::is_ready(&client, &config.url).await {
            info!("Reusing web server already listening at {}", config.url);
            return Ok(Self { child: None, url: config.url.clone() });
        }

        info!("Spawning web server: {}", config.command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(&config.command)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                E2eError::ServerStartup(format!("Failed to spawn '{}': {}", config.command, e))
            })?;

        let mut handle = ServerHandle {
            child: Some(child),
            url: config.url.clone(),
        };

        // Wait for server to answer
        if let Err(e) = handle.wait_until_ready(&client, config.startup_timeout()).await {
            handle.stop();
            return Err(e);
        }

        info!("Web server is ready at {}", handle.url);
        Ok(handle)
    }

    async fn is_ready(client: &reqwest::Client, url: &str) -> bool {
        matches!(client.get(url).send().await, Ok(resp) if resp.status().is_success())
    }

    /// Poll the server URL until it answers with success
    async fn wait_until_ready(
        &mut self,
        client: &reqwest::Client,
        timeout_duration: Duration,
    ) -> E2eResult<()> {
        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(E2eError::ServerStartup(format!(
                        "server command exited early with {}",
                        status
                    )));
                }
            }

            match client.get(&self.url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Readiness check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for web server to start...");
                    }
                    // Connection refused is expected while server is starting
                    if !e.is_connect() {
                        warn!("Readiness check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Stop the server if this handle started it
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        info!("Stopping web server (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                // Give it a moment to shut down gracefully
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_that_exits_fails_fast() {
        let config = WebServerConfig {
            command: "exit 3".to_string(),
            url: "http://127.0.0.1:9/".to_string(),
            startup_timeout_ms: 10_000,
            reuse_existing: false,
        };
        let start = std::time::Instant::now();
        let err = ServerHandle::start(&config).await.err().expect("startup must fail");
        assert!(matches!(err, E2eError::ServerStartup(_)), "{err}");
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}

//! Chromium process launch and lifetime observation.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::cdp::CdpClient;
use super::finder;
use super::page::ChromiumPage;
use super::probe;
use crate::driver::{BrowserHandle, PageHandle, connected_channel};
use crate::error::{EngineError, Result};

const PROBE_INTERVAL: Duration = Duration::from_millis(200);
const MAX_PROBE_ATTEMPTS: u32 = 25;

/// One launched Chromium process plus its browser-level CDP channel.
pub(super) struct ChromiumSession {
	pid: u32,
	port: u16,
	client: Arc<CdpClient>,
	connected: Arc<watch::Sender<bool>>,
}

/// Spawns Chromium against `user_data_dir` and waits for its DevTools
/// endpoint to come up.
pub(super) async fn spawn_chromium(user_data_dir: &Path, headless: bool) -> Result<ChromiumSession> {
	let executable = finder::find_chromium_executable()
		.ok_or_else(|| EngineError::Launch("no Chrome/Chromium executable found; install one or put it on PATH".to_string()))?;
	let port = pick_debug_port()?;

	let mut cmd = tokio::process::Command::new(&executable);
	cmd.arg(format!("--remote-debugging-port={port}"))
		.arg(format!("--user-data-dir={}", user_data_dir.display()))
		.arg("--no-first-run")
		.arg("--no-default-browser-check")
		.arg("--disable-blink-features=AutomationControlled")
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null());
	if headless {
		cmd.arg("--headless=new");
	}
	#[cfg(unix)]
	cmd.process_group(0);

	let mut child = cmd
		.spawn()
		.map_err(|e| EngineError::Launch(format!("failed to launch {executable}: {e}")))?;
	let pid = child.id().unwrap_or(0);
	debug!(target = "tickwatch.chrome", %executable, pid, port, "browser process spawned");

	// Poll until the endpoint answers or the process gives up first.
	let mut last_error = "endpoint not probed yet".to_string();
	let mut version = None;
	for _ in 0..MAX_PROBE_ATTEMPTS {
		tokio::time::sleep(PROBE_INTERVAL).await;

		if let Ok(Some(status)) = child.try_wait() {
			return Err(EngineError::Launch(format!(
				"browser exited before the debugging endpoint became available (status: {status})"
			)));
		}

		match probe::fetch_cdp_endpoint(port).await {
			Ok(info) => {
				version = Some(info);
				break;
			}
			Err(err) => last_error = err.to_string(),
		}
	}

	let Some(version) = version else {
		let _ = child.start_kill();
		return Err(EngineError::Launch(format!(
			"browser started but its debugging endpoint never came up on port {port}: {last_error}"
		)));
	};
	if let Some(browser) = &version.browser {
		debug!(target = "tickwatch.chrome", %browser, "debugging endpoint up");
	}

	let client = CdpClient::connect(&version.web_socket_debugger_url)
		.await
		.map_err(|e| EngineError::Launch(format!("failed to open browser CDP channel: {e}")))?;

	let (connected_tx, _connected_rx) = connected_channel();
	let connected = Arc::new(connected_tx);

	// Exit watcher owns the child; it fires the disconnect observer
	// exactly once, whether the browser crashed or was closed by us.
	let watch = Arc::clone(&connected);
	tokio::spawn(async move {
		match child.wait().await {
			Ok(status) => debug!(target = "tickwatch.chrome", pid, %status, "browser process exited"),
			Err(err) => warn!(target = "tickwatch.chrome", pid, error = %err, "waiting on browser process failed"),
		}
		watch.send_replace(false);
	});

	Ok(ChromiumSession {
		pid,
		port,
		client: Arc::new(client),
		connected,
	})
}

#[async_trait]
impl BrowserHandle for ChromiumSession {
	fn is_connected(&self) -> bool {
		*self.connected.borrow()
	}

	fn watch_connected(&self) -> watch::Receiver<bool> {
		self.connected.subscribe()
	}

	async fn open_page(&self) -> Result<Arc<dyn PageHandle>> {
		let created = self
			.client
			.call("Target.createTarget", json!({ "url": "about:blank" }))
			.await
			.map_err(|e| EngineError::Page(format!("failed to create page target: {e}")))?;
		let target_id = created["targetId"]
			.as_str()
			.ok_or_else(|| EngineError::Page("Target.createTarget returned no targetId".to_string()))?
			.to_string();

		let ws_url = format!("ws://127.0.0.1:{}/devtools/page/{}", self.port, target_id);
		let page_client = CdpClient::connect(&ws_url)
			.await
			.map_err(|e| EngineError::Page(format!("failed to attach to page target: {e}")))?;

		debug!(target = "tickwatch.chrome", %target_id, "page target created");
		Ok(Arc::new(ChromiumPage::new(Arc::clone(&self.client), page_client, target_id)))
	}

	async fn close(&self) -> Result<()> {
		if self.client.call("Browser.close", json!({})).await.is_err() {
			// Channel already dead; fall back to killing the process.
			kill_pid(self.pid);
		}
		Ok(())
	}
}

fn pick_debug_port() -> Result<u16> {
	let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}

fn kill_pid(pid: u32) {
	if pid == 0 {
		return;
	}

	#[cfg(unix)]
	{
		let _ = std::process::Command::new("kill").args(["-TERM", &pid.to_string()]).status();
	}

	#[cfg(windows)]
	{
		let _ = std::process::Command::new("taskkill").args(["/PID", &pid.to_string(), "/F"]).status();
	}
}

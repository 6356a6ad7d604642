//! DevTools endpoint probing over `/json/version`.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{EngineError, Result};

const PROBE_TIMEOUT: Duration = Duration::from_millis(400);

/// Subset of the `/json/version` response we care about.
#[derive(Debug, Deserialize)]
pub struct CdpVersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
}

/// Resolves DevTools metadata from `port`, trying each loopback
/// spelling in turn.
pub(super) async fn fetch_cdp_endpoint(port: u16) -> Result<CdpVersionInfo> {
	let client = reqwest::Client::builder()
		.timeout(PROBE_TIMEOUT)
		.build()
		.map_err(|e| EngineError::Launch(format!("failed to build probe client: {e}")))?;

	let mut last_error = "no response".to_string();
	for url in [
		format!("http://127.0.0.1:{port}/json/version"),
		format!("http://localhost:{port}/json/version"),
		format!("http://[::1]:{port}/json/version"),
	] {
		let response = match client.get(&url).send().await {
			Ok(response) => response,
			Err(err) => {
				last_error = err.to_string();
				continue;
			}
		};

		if !response.status().is_success() {
			last_error = format!("unexpected status {}", response.status());
			continue;
		}

		return response
			.json::<CdpVersionInfo>()
			.await
			.map_err(|e| EngineError::Launch(format!("malformed /json/version response: {e}")));
	}

	Err(EngineError::Launch(format!("debugging endpoint not reachable on port {port}: {last_error}")))
}

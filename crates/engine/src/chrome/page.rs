//! Page operations over the CDP channel: navigation, settle sweep,
//! and board-row queries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::cdp::CdpClient;
use crate::driver::{PageHandle, RowFields};
use crate::error::{EngineError, QueryError, Result};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_READY_POLLS: u32 = 75;
/// Settling pause after the document reports complete, giving late
/// XHR-driven rows a chance to land.
const QUIESCE_PAUSE: Duration = Duration::from_millis(500);

const PROBE_JS: &str = "true";
const READY_STATE_JS: &str = "document.readyState";
const SCROLL_TOP_JS: &str = "window.scrollTo(0, 0)";

/// Incremental scroll to the bottom of the document; resolves once the
/// accumulated distance covers the scroll height.
const SCROLL_SWEEP_JS: &str = r#"
new Promise(resolve => {
	let totalHeight = 0;
	const distance = 100;
	const timer = setInterval(() => {
		const scrollHeight = document.body.scrollHeight;
		window.scrollBy(0, distance);
		totalHeight += distance;
		if (totalHeight >= scrollHeight) {
			clearInterval(timer);
			resolve(true);
		}
	}, 50);
})
"#;

/// Rows carry one cell tagged `short-symbol`; the identifier sits in
/// cell 0, price/change/percent in cells 10/12/13.
const LIST_CODES_JS: &str = r#"
(() => {
	const codes = [];
	for (const row of document.querySelectorAll('table tbody tr')) {
		const cells = row.querySelectorAll('td');
		const tagged = Array.from(cells).some(td => td.classList.contains('short-symbol'));
		if (cells.length > 0 && tagged) {
			const code = cells[0].innerText.trim();
			if (code) {
				codes.push(code);
			}
		}
	}
	return codes;
})()
"#;

fn query_row_js(code: &str) -> String {
	let wanted = json!(code).to_string();
	format!(
		r#"
(() => {{
	const wanted = {wanted};
	for (const row of document.querySelectorAll('table tbody tr')) {{
		const cells = row.querySelectorAll('td');
		const tagged = Array.from(cells).some(td => td.classList.contains('short-symbol'));
		if (cells.length > 13 && tagged) {{
			const code = cells[0].innerText.trim();
			if (code === wanted) {{
				return {{
					code,
					price: cells[10].innerText.trim(),
					change: cells[12].innerText.trim(),
					percentChange: cells[13].innerText.trim(),
				}};
			}}
		}}
	}}
	return null;
}})()
"#
	)
}

pub(super) struct ChromiumPage {
	browser: Arc<CdpClient>,
	client: CdpClient,
	target_id: String,
}

impl ChromiumPage {
	pub(super) fn new(browser: Arc<CdpClient>, client: CdpClient, target_id: String) -> Self {
		Self { browser, client, target_id }
	}

	async fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value, QueryError> {
		let result = self
			.client
			.call(
				"Runtime.evaluate",
				json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": await_promise,
				}),
			)
			.await?;

		if let Some(details) = result.get("exceptionDetails") {
			let text = details["text"].as_str().unwrap_or("unknown page exception");
			return Err(QueryError::other(format!("page exception: {text}")));
		}
		Ok(result["result"]["value"].clone())
	}
}

#[async_trait]
impl PageHandle for ChromiumPage {
	async fn probe(&self) -> Result<(), QueryError> {
		self.evaluate(PROBE_JS, false).await.map(|_| ())
	}

	async fn navigate(&self, url: &str) -> Result<()> {
		self.client
			.call("Page.navigate", json!({ "url": url }))
			.await
			.map_err(|e| EngineError::Page(format!("navigation to {url} failed: {e}")))?;

		// CDP reports navigation started, not finished; poll readiness
		// and then let the network settle briefly.
		let mut ready = false;
		for _ in 0..MAX_READY_POLLS {
			tokio::time::sleep(READY_POLL_INTERVAL).await;
			let state = self
				.evaluate(READY_STATE_JS, false)
				.await
				.map_err(|e| EngineError::Page(format!("readiness poll failed: {e}")))?;
			if state.as_str() == Some("complete") {
				ready = true;
				break;
			}
		}
		if !ready {
			return Err(EngineError::Page(format!("page at {url} never reached readyState=complete")));
		}

		tokio::time::sleep(QUIESCE_PAUSE).await;
		Ok(())
	}

	async fn settle(&self) -> Result<()> {
		self.evaluate(SCROLL_SWEEP_JS, true)
			.await
			.map_err(|e| EngineError::Page(format!("scroll sweep failed: {e}")))?;
		self.evaluate(SCROLL_TOP_JS, false)
			.await
			.map_err(|e| EngineError::Page(format!("scroll reset failed: {e}")))?;
		Ok(())
	}

	async fn query_record(&self, code: &str) -> Result<Option<RowFields>, QueryError> {
		let value = self.evaluate(&query_row_js(code), false).await?;
		if value.is_null() {
			return Ok(None);
		}

		let field = |name: &str| -> Result<String, QueryError> {
			value[name]
				.as_str()
				.map(str::to_string)
				.ok_or_else(|| QueryError::other(format!("row for {code} missing field {name}")))
		};
		Ok(Some(RowFields {
			code: field("code")?,
			price: field("price")?,
			change: field("change")?,
			percent_change: field("percentChange")?,
		}))
	}

	async fn list_codes(&self) -> Result<Vec<String>, QueryError> {
		let value = self.evaluate(LIST_CODES_JS, false).await?;
		let codes = value
			.as_array()
			.ok_or_else(|| QueryError::other("code listing did not return an array"))?
			.iter()
			.filter_map(|code| code.as_str().map(str::to_string))
			.collect();
		Ok(codes)
	}

	async fn close(&self) -> Result<()> {
		debug!(target = "tickwatch.chrome", target_id = %self.target_id, "closing page target");
		self.browser
			.call("Target.closeTarget", json!({ "targetId": self.target_id }))
			.await
			.map_err(|e| EngineError::Page(format!("failed to close page target: {e}")))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_row_js_escapes_the_code() {
		let js = query_row_js(r#"A"B"#);
		assert!(js.contains(r#"const wanted = "A\"B";"#));
	}

	#[test]
	fn query_row_js_targets_the_tagged_rows() {
		let js = query_row_js("FPT");
		assert!(js.contains("short-symbol"));
		assert!(js.contains("table tbody tr"));
	}
}

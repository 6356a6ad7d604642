//! Minimal DevTools protocol channel.
//!
//! One id-correlated command in flight at a time; event notifications
//! arriving in between are skipped. The engine serializes all page
//! work over the single page resource, so this is sufficient.

use std::sync::atomic::{AtomicI64, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::QueryError;

pub(super) struct CdpClient {
	stream: Mutex<WebSocketStream<MaybeTlsStream<TcpStream>>>,
	next_id: AtomicI64,
}

impl CdpClient {
	pub(super) async fn connect(url: &str) -> Result<Self, QueryError> {
		let (stream, _) = connect_async(url)
			.await
			.map_err(|e| QueryError::connection_lost(format!("websocket connect to {url} failed: {e}")))?;
		Ok(Self {
			stream: Mutex::new(stream),
			next_id: AtomicI64::new(1),
		})
	}

	/// Sends one command and waits for its matching response.
	pub(super) async fn call(&self, method: &str, params: Value) -> Result<Value, QueryError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let payload = json!({ "id": id, "method": method, "params": params });

		let mut stream = self.stream.lock().await;
		stream
			.send(Message::Text(payload.to_string().into()))
			.await
			.map_err(|e| QueryError::connection_lost(format!("{method}: send failed: {e}")))?;

		loop {
			let message = stream
				.next()
				.await
				.ok_or_else(|| QueryError::connection_lost(format!("{method}: channel closed")))?
				.map_err(|e| QueryError::connection_lost(format!("{method}: receive failed: {e}")))?;

			let text = match message {
				Message::Text(text) => text,
				Message::Close(_) => return Err(QueryError::connection_lost(format!("{method}: target closed"))),
				_ => continue,
			};

			let value: Value = match serde_json::from_str(&text) {
				Ok(value) => value,
				Err(_) => continue,
			};
			if value["id"].as_i64() != Some(id) {
				// Event notification or a response we no longer wait for.
				continue;
			}
			if let Some(error) = value.get("error") {
				return Err(QueryError::other(format!("{method}: {error}")));
			}
			return Ok(value.get("result").cloned().unwrap_or(Value::Null));
		}
	}
}

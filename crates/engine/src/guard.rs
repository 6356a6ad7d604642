//! Connectivity guard owning the exclusive session for one identity.
//!
//! State machine `Disconnected -> Connecting -> Connected`. The
//! transition back to `Disconnected` is driven by the disconnect
//! observer registered at launch time; the guard never reconnects in
//! the background, only on the next `ensure_connected` call.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as ReconnectLatch;
use tracing::{debug, info};

use crate::driver::{BrowserHandle, Identity};
use crate::error::{EngineError, Result};
use crate::launcher::LaunchSerializer;

/// Observable connection state of the guarded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Disconnected,
	Connecting,
	Connected,
}

struct Inner {
	state: SessionState,
	session: Option<Arc<dyn BrowserHandle>>,
}

/// Tracks connectivity of the one session for `identity` and exposes
/// an idempotent ensure-connected operation.
pub struct SessionGuard {
	identity: Identity,
	serializer: Arc<LaunchSerializer>,
	inner: Arc<Mutex<Inner>>,
	/// Held for the duration of one reconnect attempt. Callers that
	/// arrive mid-flight wait here, then re-validate instead of
	/// launching their own session.
	reconnect: ReconnectLatch<()>,
}

impl SessionGuard {
	pub fn new(identity: Identity, serializer: Arc<LaunchSerializer>) -> Self {
		Self {
			identity,
			serializer,
			inner: Arc::new(Mutex::new(Inner {
				state: SessionState::Disconnected,
				session: None,
			})),
			reconnect: ReconnectLatch::new(()),
		}
	}

	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	/// Current state. A handle whose process has silently died reports
	/// `Disconnected` even before the observer fires.
	pub fn state(&self) -> SessionState {
		let inner = self.inner.lock();
		match (&inner.state, &inner.session) {
			(SessionState::Connected, Some(session)) if session.is_connected() => SessionState::Connected,
			(SessionState::Connecting, _) => SessionState::Connecting,
			_ => SessionState::Disconnected,
		}
	}

	/// The live session handle, if connected.
	pub fn session(&self) -> Option<Arc<dyn BrowserHandle>> {
		let inner = self.inner.lock();
		inner.session.as_ref().filter(|session| session.is_connected()).map(Arc::clone)
	}

	/// Ensures the session is connected, reconnecting at most once no
	/// matter how many callers arrive concurrently. Waiters observe the
	/// outcome of the in-flight attempt and re-validate it rather than
	/// assuming it succeeded.
	///
	/// The wait is bounded only by the launch serializer's own
	/// per-request progress; there is no independent timeout yet.
	pub async fn ensure_connected(&self) -> Result<Arc<dyn BrowserHandle>> {
		if let Some(session) = self.session() {
			return Ok(session);
		}

		let _latch = self.reconnect.lock().await;

		// Re-validate: the attempt we waited on may have restored the
		// session already.
		if let Some(session) = self.session() {
			debug!(target = "tickwatch.session", identity = %self.identity, "session restored by in-flight reconnect");
			return Ok(session);
		}

		self.reconnect_holding_latch().await
	}

	/// Closes the current session, if any, and parks the guard in
	/// `Disconnected`. Used on explicit shutdown.
	pub async fn shutdown(&self) {
		let _latch = self.reconnect.lock().await;
		let stale = {
			let mut inner = self.inner.lock();
			inner.state = SessionState::Disconnected;
			inner.session.take()
		};
		if let Some(session) = stale {
			if let Err(err) = session.close().await {
				debug!(target = "tickwatch.session", identity = %self.identity, error = %err, "close on shutdown failed");
			}
		}
	}

	async fn reconnect_holding_latch(&self) -> Result<Arc<dyn BrowserHandle>> {
		// Discard any stale handle from the previous connected state
		// before requesting a new one.
		let stale = {
			let mut inner = self.inner.lock();
			inner.state = SessionState::Connecting;
			inner.session.take()
		};
		if let Some(stale) = stale {
			if let Err(err) = stale.close().await {
				debug!(target = "tickwatch.session", identity = %self.identity, error = %err, "failed to close stale session");
			}
		}

		info!(target = "tickwatch.session", identity = %self.identity, "session not connected; requesting launch");
		match self.serializer.enqueue_launch(&self.identity).await {
			Ok(session) => {
				{
					let mut inner = self.inner.lock();
					inner.state = SessionState::Connected;
					inner.session = Some(Arc::clone(&session));
				}
				self.observe_disconnect(&session);
				info!(target = "tickwatch.session", identity = %self.identity, "session connected");
				Ok(session)
			}
			Err(err) => {
				self.inner.lock().state = SessionState::Disconnected;
				Err(EngineError::Connection(format!("launch did not produce a session: {err}")))
			}
		}
	}

	/// Flips the guard to `Disconnected` when the session's disconnect
	/// observer fires, provided the guard still owns that same session.
	fn observe_disconnect(&self, session: &Arc<dyn BrowserHandle>) {
		let mut connected = session.watch_connected();
		let inner = Arc::clone(&self.inner);
		let session = Arc::clone(session);
		let identity = self.identity.clone();
		tokio::spawn(async move {
			loop {
				if !*connected.borrow() {
					break;
				}
				if connected.changed().await.is_err() {
					break;
				}
			}
			let mut inner = inner.lock();
			let owns_it = inner.session.as_ref().is_some_and(|current| Arc::ptr_eq(current, &session));
			if owns_it {
				inner.state = SessionState::Disconnected;
				inner.session = None;
				info!(target = "tickwatch.session", identity = %identity, "session disconnected; will relaunch on next use");
			}
		});
	}
}

//! Capability seam between the engine and the automation backend.
//!
//! The engine coordinates lifecycle and recovery; everything that
//! actually touches a browser lives behind these traits. The concrete
//! Chromium backend is in [`crate::chrome`]; tests drive the engine
//! with an in-memory fake.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{QueryError, Result};

/// Stable key identifying which persistent profile a session belongs
/// to. At most one live session exists per identity at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
	/// Derives an identity from a configured account/profile name,
	/// keeping only the part before any `@`.
	pub fn from_profile(profile: &str) -> Self {
		let name = profile.split('@').next().unwrap_or(profile).trim();
		Self(name.to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Raw field values captured from one board row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFields {
	pub code: String,
	pub price: String,
	pub change: String,
	pub percent_change: String,
}

/// Starts the underlying automation process for an identity.
///
/// Only the launch serializer calls this; consumers go through
/// [`crate::guard::SessionGuard`].
#[async_trait]
pub trait BrowserDriver: Send + Sync {
	async fn launch(&self, identity: &Identity) -> Result<Arc<dyn BrowserHandle>>;
}

/// Live handle to one launched browser process.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
	fn is_connected(&self) -> bool;

	/// Disconnect observer: the receiver yields `false` (or closes)
	/// exactly once when the underlying process goes away.
	fn watch_connected(&self) -> watch::Receiver<bool>;

	/// Opens a fresh navigable page inside this session.
	async fn open_page(&self) -> Result<Arc<dyn PageHandle>>;

	async fn close(&self) -> Result<()>;
}

impl fmt::Debug for dyn BrowserHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BrowserHandle").field("connected", &self.is_connected()).finish()
	}
}

/// The single navigable surface queries run against. Borrowed per
/// call; holders must not cache it across calls without re-validating
/// through the page lifecycle manager.
#[async_trait]
pub trait PageHandle: Send + Sync {
	/// Trivial no-op evaluation proving the page still answers.
	async fn probe(&self) -> Result<(), QueryError>;

	/// Navigates and waits for network quiescence.
	async fn navigate(&self, url: &str) -> Result<()>;

	/// Scrolls to the bottom in fixed increments and back to the top,
	/// forcing lazy-loaded rows to materialize.
	async fn settle(&self) -> Result<()>;

	/// Scans the structured rows for `code`. `Ok(None)` means the code
	/// is absent from the source; errors carry a structured kind.
	async fn query_record(&self, code: &str) -> Result<Option<RowFields>, QueryError>;

	/// Every target identifier discoverable in the structured rows.
	async fn list_codes(&self) -> Result<Vec<String>, QueryError>;

	async fn close(&self) -> Result<()>;
}

/// Pair of sides for the disconnect observer channel. The driver keeps
/// the sender and flips it to `false` when the process dies.
pub fn connected_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
	watch::channel(true)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_from_plain_profile_is_unchanged() {
		assert_eq!(Identity::from_profile("watcher").as_str(), "watcher");
	}

	#[test]
	fn identity_from_account_takes_local_part() {
		assert_eq!(Identity::from_profile(" board.user@example.com ").as_str(), "board.user");
	}

	#[test]
	fn connected_channel_starts_live() {
		let (tx, rx) = connected_channel();
		assert!(*rx.borrow());
		tx.send_replace(false);
		assert!(!*rx.borrow());
	}
}

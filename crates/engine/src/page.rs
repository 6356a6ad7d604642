//! Single-page lifecycle: lazy creation, liveness probing, and
//! day-rollover re-anchoring.
//!
//! The board resets its underlying data model once per calendar day,
//! so a page anchored yesterday must be discarded and re-navigated
//! even when it still answers probes. The rollover signal comes from
//! the persistence collaborator via [`SnapshotLedger`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::driver::{BrowserHandle, PageHandle};
use crate::error::{EngineError, Result};
use crate::guard::SessionGuard;
use crate::record::today;

/// Date source for the day-rollover check, implemented by whatever
/// persists snapshots.
pub trait SnapshotLedger: Send + Sync {
	/// Calendar date of the last persisted snapshot, if any.
	fn last_snapshot_date(&self) -> Option<time::Date>;
}

/// Owns the single navigable page inside the guarded session.
pub struct PageManager {
	config: EngineConfig,
	guard: Arc<SessionGuard>,
	ledger: Option<Arc<dyn SnapshotLedger>>,
	page: Mutex<Option<Arc<dyn PageHandle>>>,
}

impl PageManager {
	pub fn new(config: EngineConfig, guard: Arc<SessionGuard>, ledger: Option<Arc<dyn SnapshotLedger>>) -> Self {
		Self {
			config,
			guard,
			ledger,
			page: Mutex::new(None),
		}
	}

	/// Returns a live, anchored page, creating or recreating one as
	/// needed. Navigation work is paid only when the page is missing,
	/// stale, or rolled over; otherwise this is a cheap probe.
	pub async fn get_valid_page(&self) -> Result<Arc<dyn PageHandle>> {
		let session = self.guard.ensure_connected().await?;

		if self.day_rolled_over() {
			info!(target = "tickwatch.page", "snapshot date differs from today; discarding page for re-anchor");
			self.invalidate().await;
		}

		if let Some(page) = self.current_page() {
			match page.probe().await {
				Ok(()) => return Ok(page),
				Err(err) => {
					debug!(target = "tickwatch.page", error = %err, "liveness probe failed; recreating page");
					self.invalidate().await;
				}
			}
		}

		self.create_page(session.as_ref()).await
	}

	/// Closes and forgets the current page, if any. The next
	/// `get_valid_page` call recreates it.
	pub async fn invalidate(&self) {
		let stale = self.page.lock().take();
		if let Some(page) = stale {
			if let Err(err) = page.close().await {
				debug!(target = "tickwatch.page", error = %err, "failed to close stale page");
			}
		}
	}

	fn current_page(&self) -> Option<Arc<dyn PageHandle>> {
		self.page.lock().as_ref().map(Arc::clone)
	}

	fn day_rolled_over(&self) -> bool {
		let Some(ledger) = &self.ledger else {
			return false;
		};
		let Some(stored) = ledger.last_snapshot_date() else {
			return false;
		};
		stored != today()
	}

	async fn create_page(&self, session: &dyn BrowserHandle) -> Result<Arc<dyn PageHandle>> {
		let page = session.open_page().await.map_err(as_page_error)?;

		if let Err(err) = page.navigate(&self.config.page_url).await {
			warn!(target = "tickwatch.page", url = %self.config.page_url, error = %err, "navigation failed");
			let _ = page.close().await;
			return Err(as_page_error(err));
		}
		info!(target = "tickwatch.page", url = %self.config.page_url, "page navigated");

		if let Err(err) = page.settle().await {
			warn!(target = "tickwatch.page", error = %err, "scroll settle failed");
			let _ = page.close().await;
			return Err(as_page_error(err));
		}
		debug!(target = "tickwatch.page", "page settled (scrolled to bottom and back)");

		*self.page.lock() = Some(Arc::clone(&page));
		Ok(page)
	}
}

fn as_page_error(err: EngineError) -> EngineError {
	match err {
		already @ (EngineError::Page(_) | EngineError::Connection(_) | EngineError::Launch(_)) => already,
		other => EngineError::Page(other.to_string()),
	}
}

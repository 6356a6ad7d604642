//! Facade wiring configuration, driver, serializer, guard, page
//! manager, and extraction engine together.

use std::sync::Arc;

use crate::chrome::ChromiumDriver;
use crate::config::EngineConfig;
use crate::driver::BrowserDriver;
use crate::error::Result;
use crate::extract::ExtractionEngine;
use crate::guard::{SessionGuard, SessionState};
use crate::launcher::LaunchSerializer;
use crate::page::{PageManager, SnapshotLedger};
use crate::record::Snapshot;

/// The assembled extraction engine for one identity.
pub struct Engine {
	guard: Arc<SessionGuard>,
	pages: Arc<PageManager>,
	extraction: ExtractionEngine,
}

impl Engine {
	/// Wires the engine over an arbitrary driver backend.
	pub fn new(config: EngineConfig, driver: Arc<dyn BrowserDriver>, ledger: Option<Arc<dyn SnapshotLedger>>) -> Self {
		let serializer = Arc::new(LaunchSerializer::with_delay(driver, config.inter_launch_delay));
		let guard = Arc::new(SessionGuard::new(config.identity(), serializer));
		let pages = Arc::new(PageManager::new(config, Arc::clone(&guard), ledger));
		let extraction = ExtractionEngine::new(Arc::clone(&pages));
		Self { guard, pages, extraction }
	}

	/// Wires the engine over the bundled Chromium backend.
	///
	/// Fails up front when the host platform cannot run the browser at
	/// all; everything after construction degrades instead of failing.
	pub fn with_chromium(config: EngineConfig) -> Result<Self> {
		let driver: Arc<dyn BrowserDriver> = Arc::new(ChromiumDriver::new(&config)?);
		Ok(Self::new(config, driver, None))
	}

	/// Same as [`Engine::with_chromium`] with a day-rollover ledger.
	pub fn with_chromium_and_ledger(config: EngineConfig, ledger: Arc<dyn SnapshotLedger>) -> Result<Self> {
		let driver: Arc<dyn BrowserDriver> = Arc::new(ChromiumDriver::new(&config)?);
		Ok(Self::new(config, driver, Some(ledger)))
	}

	/// Runs one extraction cycle. Always yields a snapshot; see
	/// [`ExtractionEngine::run_extraction`].
	pub async fn run_extraction(&self, targets: Option<&[String]>) -> Snapshot {
		self.extraction.run_extraction(targets).await
	}

	pub async fn extract(&self, targets: &[String]) -> Snapshot {
		self.extraction.extract(targets).await
	}

	pub async fn enumerate_all_targets(&self) -> Vec<String> {
		self.extraction.enumerate_all_targets().await
	}

	/// Pre-warms the session and page so the first scheduled cycle does
	/// not pay launch plus navigation cost.
	pub async fn warm_up(&self) -> Result<()> {
		self.pages.get_valid_page().await.map(|_| ())
	}

	pub fn session_state(&self) -> SessionState {
		self.guard.state()
	}

	/// Closes page and session. The engine can be used again
	/// afterwards; the next extraction relaunches from scratch.
	pub async fn shutdown(&self) {
		self.pages.invalidate().await;
		self.guard.shutdown().await;
	}
}

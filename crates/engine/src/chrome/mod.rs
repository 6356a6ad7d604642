//! Chromium backend for the driver seam.
//!
//! Owns executable discovery, process launch with remote debugging,
//! DevTools endpoint probing, and a minimal CDP channel for page
//! creation, navigation, and row queries.

mod cdp;
mod finder;
mod page;
mod probe;
mod process;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::driver::{BrowserDriver, BrowserHandle, Identity};
use crate::error::Result;

pub use probe::CdpVersionInfo;

/// Launches real Chromium processes bound to per-identity profiles.
pub struct ChromiumDriver {
	config: EngineConfig,
}

impl ChromiumDriver {
	/// Fails only when the host platform cannot run Chromium at all.
	pub fn new(config: &EngineConfig) -> Result<Self> {
		finder::require_supported_platform()?;
		Ok(Self { config: config.clone() })
	}
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
	async fn launch(&self, identity: &Identity) -> Result<Arc<dyn BrowserHandle>> {
		let user_data_dir = self.config.check_user_data_dir(identity)?;
		let session = process::spawn_chromium(&user_data_dir, self.config.headless).await?;
		Ok(Arc::new(session))
	}
}

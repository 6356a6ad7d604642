//! Immutable engine configuration, read once at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::Identity;
use crate::error::{EngineError, Result};

const ENV_PROFILE: &str = "TICKWATCH_PROFILE";
const ENV_PAGE: &str = "TICKWATCH_PAGE";
const ENV_PROFILE_ROOT: &str = "TICKWATCH_PROFILE_ROOT";

/// Default profile name when none is configured.
pub const DEFAULT_PROFILE: &str = "default.user";

/// Minimum pause between two consecutive browser launches.
pub const DEFAULT_INTER_LAUNCH_DELAY: Duration = Duration::from_secs(1);

/// Startup configuration for the extraction engine. Built once and
/// never re-read mid-run; every component borrows it immutably.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Account/profile name the session identity derives from.
	pub profile: String,
	/// URL of the board page extraction runs against.
	pub page_url: String,
	/// Base directory holding per-profile browser user-data dirs.
	pub profile_root: PathBuf,
	pub headless: bool,
	/// Pause the launch serializer imposes between launches.
	pub inter_launch_delay: Duration,
}

impl EngineConfig {
	/// Builds a configuration with defaults for everything but the
	/// target URL.
	pub fn new(page_url: impl Into<String>) -> Self {
		Self {
			profile: DEFAULT_PROFILE.to_string(),
			page_url: page_url.into(),
			profile_root: default_profile_root(),
			headless: true,
			inter_launch_delay: DEFAULT_INTER_LAUNCH_DELAY,
		}
	}

	/// Reads configuration from `TICKWATCH_*` environment variables.
	/// The target page URL is the only required setting.
	pub fn from_env() -> Result<Self> {
		let page_url = std::env::var(ENV_PAGE).map_err(|_| EngineError::Config(format!("{ENV_PAGE} is not set")))?;
		let mut config = Self::new(page_url);
		if let Ok(profile) = std::env::var(ENV_PROFILE) {
			config.profile = profile;
		}
		if let Ok(root) = std::env::var(ENV_PROFILE_ROOT) {
			config.profile_root = PathBuf::from(root);
		}
		Ok(config)
	}

	pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
		self.profile = profile.into();
		self
	}

	pub fn with_profile_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.profile_root = root.into();
		self
	}

	pub fn with_headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}

	pub fn with_inter_launch_delay(mut self, delay: Duration) -> Self {
		self.inter_launch_delay = delay;
		self
	}

	/// Session identity derived from the configured profile name.
	pub fn identity(&self) -> Identity {
		Identity::from_profile(&self.profile)
	}

	/// Per-identity user-data directory under the profile root.
	pub fn user_data_dir(&self, identity: &Identity) -> PathBuf {
		self.profile_root.join(identity.as_str())
	}

	/// Verifies the user-data directory exists and is a directory.
	/// Launching against a missing profile dir would silently create a
	/// blank browser profile, so this is checked up front.
	pub fn check_user_data_dir(&self, identity: &Identity) -> Result<PathBuf> {
		let dir = self.user_data_dir(identity);
		if !dir.is_dir() {
			return Err(EngineError::Profile(dir.display().to_string()));
		}
		Ok(dir)
	}
}

fn default_profile_root() -> PathBuf {
	dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".chrome-automation")
}

/// Creates the user-data directory tree when it does not exist yet.
pub fn ensure_profile_dir(dir: &Path) -> Result<()> {
	std::fs::create_dir_all(dir)?;
	Ok(())
}

//! Chromium executable discovery.

use std::path::PathBuf;

use crate::error::{EngineError, Result};

/// The one fatal check: a platform we cannot launch a browser on.
pub(super) fn require_supported_platform() -> Result<()> {
	if cfg!(any(target_os = "linux", target_os = "macos", target_os = "windows")) {
		Ok(())
	} else {
		Err(EngineError::UnsupportedPlatform(std::env::consts::OS.to_string()))
	}
}

/// Looks for a usable Chromium-family executable: absolute candidates
/// checked for existence, bare names resolved through `PATH`.
pub(super) fn find_chromium_executable() -> Option<String> {
	let candidates: Vec<String> = if cfg!(target_os = "macos") {
		vec![
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_candidates()
	} else {
		vec![
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium-browser",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	};

	for candidate in candidates {
		if candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':') {
			if std::path::Path::new(&candidate).exists() {
				return Some(candidate);
			}
		} else if which::which(&candidate).is_ok() {
			return Some(candidate);
		}
	}

	None
}

fn windows_candidates() -> Vec<String> {
	let mut roots = Vec::new();
	for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
		if let Ok(value) = std::env::var(key) {
			roots.push(PathBuf::from(value));
		}
	}
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[
		&["Google", "Chrome", "Application", "chrome.exe"],
		&["Chromium", "Application", "chrome.exe"],
		&["Microsoft", "Edge", "Application", "msedge.exe"],
	];

	let mut candidates = Vec::new();
	for root in roots {
		for suffix in suffixes {
			let mut path = root.clone();
			for component in *suffix {
				path.push(component);
			}
			candidates.push(path.to_string_lossy().to_string());
		}
	}

	candidates.extend(["chrome.exe".to_string(), "msedge.exe".to_string(), "chromium.exe".to_string()]);
	candidates
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn supported_platform_check_passes_here() {
		assert!(require_supported_platform().is_ok());
	}

	#[cfg(target_os = "windows")]
	#[test]
	fn windows_candidates_include_bare_names() {
		let candidates = windows_candidates();
		assert!(candidates.contains(&"chrome.exe".to_string()));
		assert!(candidates.contains(&"msedge.exe".to_string()));
	}
}

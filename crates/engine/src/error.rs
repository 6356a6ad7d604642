//! Error taxonomy for session lifecycle and extraction.

use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Batch-level failures. None of these cross the `extract` boundary;
/// the extraction engine degrades them into placeholder records.
#[derive(Debug, Error)]
pub enum EngineError {
	/// The browser process could not be started or refused to start.
	#[error("browser launch failed: {0}")]
	Launch(String),

	/// The session could not reach the connected state.
	#[error("session connection failed: {0}")]
	Connection(String),

	/// Page navigation or validity failure not tied to a single target.
	#[error("page failure: {0}")]
	Page(String),

	/// Engine configuration is missing or invalid.
	#[error("configuration error: {0}")]
	Config(String),

	/// The profile (user data) directory is missing or inaccessible.
	#[error("profile directory not accessible: {0}")]
	Profile(String),

	/// The host platform cannot run the automation process at all.
	/// This is the only condition callers should treat as fatal.
	#[error("unsupported host platform: {0}")]
	UnsupportedPlatform(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Structured classification for a single in-page query, decided by the
/// driver that implements the automation primitive rather than by
/// message inspection in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
	/// The underlying process or session target went away mid-query.
	/// Eligible for one recovery attempt.
	ConnectionLost,
	/// The target identifier is absent from the source rows.
	NotFound,
	/// Any other per-target failure.
	Other,
}

impl std::fmt::Display for QueryErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			QueryErrorKind::ConnectionLost => write!(f, "connection lost"),
			QueryErrorKind::NotFound => write!(f, "target not found"),
			QueryErrorKind::Other => write!(f, "query failed"),
		}
	}
}

/// Per-target query failure raised at the driver seam.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct QueryError {
	pub kind: QueryErrorKind,
	pub message: String,
}

impl QueryError {
	pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into() }
	}

	pub fn connection_lost(message: impl Into<String>) -> Self {
		Self::new(QueryErrorKind::ConnectionLost, message)
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		Self::new(QueryErrorKind::NotFound, message)
	}

	pub fn other(message: impl Into<String>) -> Self {
		Self::new(QueryErrorKind::Other, message)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_error_display_includes_kind() {
		let err = QueryError::connection_lost("target closed");
		assert_eq!(err.to_string(), "connection lost: target closed");
		assert_eq!(err.kind, QueryErrorKind::ConnectionLost);
	}

	#[test]
	fn engine_error_wraps_io() {
		let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
		let err = EngineError::from(io);
		assert!(matches!(err, EngineError::Io(_)));
	}
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tickwatch_engine::page::SnapshotLedger;
use tickwatch_engine::record::Snapshot;
use tracing::{debug, warn};

pub const SNAPSHOT_FILE: &str = "latest-snapshot.json";

/// Persists the most recent snapshot as pretty-printed JSON and serves
/// its date back to the engine's day-rollover check.
pub struct SnapshotSink {
	path: PathBuf,
}

impl SnapshotSink {
	pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
		let dir: PathBuf = data_dir.into();
		fs::create_dir_all(&dir).with_context(|| format!("creating data directory {}", dir.display()))?;
		Ok(Self { path: dir.join(SNAPSHOT_FILE) })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Replaces the stored snapshot with this one.
	pub fn write(&self, snapshot: &Snapshot) -> Result<()> {
		let body = serde_json::to_string_pretty(snapshot).context("serializing snapshot")?;
		fs::write(&self.path, body).with_context(|| format!("writing {}", self.path.display()))?;
		debug!(target = "tickwatch.sink", path = %self.path.display(), records = snapshot.data.len(), "snapshot written");
		Ok(())
	}

	fn read_latest(&self) -> Option<Snapshot> {
		let body = fs::read_to_string(&self.path).ok()?;
		match serde_json::from_str(&body) {
			Ok(snapshot) => Some(snapshot),
			Err(err) => {
				warn!(target = "tickwatch.sink", error = %err, "stored snapshot is unreadable; ignoring it");
				None
			}
		}
	}
}

impl SnapshotLedger for SnapshotSink {
	fn last_snapshot_date(&self) -> Option<time::Date> {
		self.read_latest().and_then(|snapshot| snapshot.date())
	}
}

#[cfg(test)]
mod tests {
	use tickwatch_engine::record::ExtractionRecord;

	use super::*;

	fn snapshot() -> Snapshot {
		Snapshot::completed(vec![ExtractionRecord::quoted("FPT", "121.3", "1.2", "1.00%")])
	}

	#[test]
	fn ledger_is_empty_before_any_write() {
		let dir = tempfile::tempdir().unwrap();
		let sink = SnapshotSink::new(dir.path()).unwrap();
		assert_eq!(sink.last_snapshot_date(), None);
	}

	#[test]
	fn write_then_read_reports_the_snapshot_date() {
		let dir = tempfile::tempdir().unwrap();
		let sink = SnapshotSink::new(dir.path()).unwrap();
		let snapshot = snapshot();
		sink.write(&snapshot).unwrap();
		assert_eq!(sink.last_snapshot_date(), snapshot.date());
	}

	#[test]
	fn garbage_on_disk_is_treated_as_no_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let sink = SnapshotSink::new(dir.path()).unwrap();
		fs::write(sink.path(), "not json").unwrap();
		assert_eq!(sink.last_snapshot_date(), None);
	}

	#[test]
	fn new_creates_a_missing_data_directory() {
		let dir = tempfile::tempdir().unwrap();
		let nested = dir.path().join("var").join("snapshots");
		let sink = SnapshotSink::new(&nested).unwrap();
		assert!(nested.is_dir());
		sink.write(&snapshot()).unwrap();
		assert!(sink.path().is_file());
	}
}

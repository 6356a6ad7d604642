use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tickwatch_engine::Engine;
use time::macros::time;
use time::{OffsetDateTime, Time, Weekday};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::sink::SnapshotSink;

/// Codes crawled when the page yields nothing discoverable and
/// `TICKWATCH_CODES` is unset.
pub const DEFAULT_CODES: &[&str] = &["VHM", "VNM", "FPT", "MWG", "HPG", "VCB", "VIC"];

const ENV_CODES: &str = "TICKWATCH_CODES";

const MARKET_OPEN: Time = time!(8:30);
const MARKET_CLOSE: Time = time!(15:30);
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Whether `now` falls inside the crawling window: weekdays from
/// 08:30 through 15:30, inclusive on both ends.
pub fn market_open(now: OffsetDateTime) -> bool {
	if matches!(now.weekday(), Weekday::Saturday | Weekday::Sunday) {
		return false;
	}
	let clock = now.time();
	clock >= MARKET_OPEN && clock <= MARKET_CLOSE
}

/// Fixed-interval extraction loop gated on market hours.
pub struct Scheduler {
	engine: Arc<Engine>,
	sink: Arc<SnapshotSink>,
	codes: Vec<String>,
	interval: Duration,
	always_on: bool,
}

impl Scheduler {
	pub fn new(engine: Arc<Engine>, sink: Arc<SnapshotSink>, codes: Vec<String>, interval: Duration, always_on: bool) -> Self {
		Self { engine, sink, codes, interval, always_on }
	}

	/// Runs cycles until the surrounding task is cancelled. A failed
	/// cycle backs off longer than the regular interval.
	pub async fn run(&self) {
		loop {
			if !self.always_on && !market_open(now_local()) {
				debug!(target = "tickwatch.schedule", "outside market hours; idling");
				sleep(self.interval).await;
				continue;
			}
			match self.cycle().await {
				Ok(records) => {
					info!(target = "tickwatch.schedule", records, "cycle complete");
					sleep(self.interval).await;
				}
				Err(err) => {
					warn!(target = "tickwatch.schedule", error = %err, "cycle failed; backing off");
					sleep(ERROR_BACKOFF).await;
				}
			}
		}
	}

	async fn cycle(&self) -> Result<usize> {
		let snapshot = if self.codes.is_empty() {
			let discovered = self.engine.enumerate_all_targets().await;
			if discovered.is_empty() {
				let fallback = fallback_codes();
				warn!(target = "tickwatch.schedule", count = fallback.len(), "discovery yielded no codes; using the fallback list");
				self.engine.extract(&fallback).await
			} else {
				self.engine.extract(&discovered).await
			}
		} else {
			self.engine.extract(&self.codes).await
		};
		self.sink.write(&snapshot)?;
		Ok(snapshot.data.len())
	}
}

/// Fallback target list: `TICKWATCH_CODES` (comma separated) when set,
/// otherwise the built-in defaults.
fn fallback_codes() -> Vec<String> {
	if let Ok(list) = std::env::var(ENV_CODES) {
		let codes: Vec<String> = list.split(',').map(|code| code.trim().to_uppercase()).filter(|code| !code.is_empty()).collect();
		if !codes.is_empty() {
			return codes;
		}
	}
	DEFAULT_CODES.iter().map(|code| code.to_string()).collect()
}

fn now_local() -> OffsetDateTime {
	OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

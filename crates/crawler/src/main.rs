mod cli;
mod logging;
mod schedule;
mod sink;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tickwatch_engine::config::ensure_profile_dir;
use tickwatch_engine::{Engine, EngineConfig};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::schedule::Scheduler;
use crate::sink::SnapshotSink;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let mut config = match &cli.url {
		Some(url) => EngineConfig::new(url.clone()),
		None => EngineConfig::from_env().context("no --url given and TICKWATCH_PAGE is unset")?,
	};
	if let Some(profile) = &cli.profile {
		config = config.with_profile(profile.clone());
	}
	config = config.with_headless(!cli.headful);

	let identity = config.identity();
	ensure_profile_dir(&config.user_data_dir(&identity)).context("preparing the browser profile directory")?;

	let sink = Arc::new(SnapshotSink::new(&cli.data_dir)?);
	let engine = Arc::new(Engine::with_chromium_and_ledger(config, sink.clone())?);
	let scheduler = Scheduler::new(engine.clone(), Arc::clone(&sink), cli.codes.clone(), Duration::from_secs(cli.interval), cli.always_on);

	// Pay the first launch and navigation up front; a failure here is
	// not fatal, the scheduler keeps retrying.
	if let Err(err) = engine.warm_up().await {
		warn!(target = "tickwatch", error = %err, "initial session warm-up failed; will retry on the first cycle");
	}

	info!(target = "tickwatch", interval_secs = cli.interval, snapshot = %sink.path().display(), "crawler started");
	tokio::select! {
		_ = scheduler.run() => {}
		_ = tokio::signal::ctrl_c() => {
			info!(target = "tickwatch", "interrupt received; shutting down");
		}
	}
	engine.shutdown().await;
	Ok(())
}

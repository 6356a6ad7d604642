use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tickwatch")]
#[command(about = "Periodic stock-board snapshot crawler")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Board page URL (overrides TICKWATCH_PAGE)
	#[arg(long, value_name = "URL")]
	pub url: Option<String>,

	/// Browser profile the session identity derives from (overrides TICKWATCH_PROFILE)
	#[arg(long)]
	pub profile: Option<String>,

	/// Seconds between extraction cycles
	#[arg(long, default_value = "5")]
	pub interval: u64,

	/// Comma-separated codes to extract (discovered from the page when omitted)
	#[arg(long, value_delimiter = ',', value_name = "CODES")]
	pub codes: Vec<String>,

	/// Run the browser with a visible window
	#[arg(long)]
	pub headful: bool,

	/// Directory snapshots are written to
	#[arg(long, default_value = "data", value_name = "DIR")]
	pub data_dir: PathBuf,

	/// Crawl regardless of market hours
	#[arg(long)]
	pub always_on: bool,
}

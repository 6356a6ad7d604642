//! Batch extraction with per-target classification, bounded recovery,
//! and placeholder fallback.
//!
//! Targets in one batch are processed sequentially: they share the
//! single page resource, and exclusivity over that handle is the
//! deliberate trade-off here, not throughput.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::QueryErrorKind;
use crate::page::PageManager;
use crate::record::{ExtractionRecord, PlaceholderReason, Snapshot};

/// Runs per-target queries against the managed page and aggregates a
/// snapshot. Never returns an error: batch-level failures degrade to
/// all-placeholder snapshots so an unattended scheduler can run
/// indefinitely.
pub struct ExtractionEngine {
	pages: Arc<PageManager>,
}

impl ExtractionEngine {
	pub fn new(pages: Arc<PageManager>) -> Self {
		Self { pages }
	}

	/// Scheduler entry point. With no (or empty) targets, discovers the
	/// target set from the page first.
	pub async fn run_extraction(&self, targets: Option<&[String]>) -> Snapshot {
		match targets {
			Some(targets) if !targets.is_empty() => self.extract(targets).await,
			_ => {
				let discovered = self.enumerate_all_targets().await;
				self.extract(&discovered).await
			}
		}
	}

	/// Extracts one record per target, in request order. Exactly
	/// `targets.len()` records come back, quoted or placeholder.
	pub async fn extract(&self, targets: &[String]) -> Snapshot {
		let mut page = match self.pages.get_valid_page().await {
			Ok(page) => page,
			Err(err) => {
				warn!(target = "tickwatch.extract", error = %err, "no valid page after recovery attempt");
				return placeholder_snapshot(targets, PlaceholderReason::PageUnavailable);
			}
		};

		let mut records = Vec::with_capacity(targets.len());
		for code in targets {
			// Normalized once so quoted and placeholder records for the
			// same target always carry the same key.
			let code = code.to_uppercase();
			match page.query_record(&code).await {
				Ok(Some(fields)) => {
					records.push(ExtractionRecord::quoted(fields.code, fields.price, fields.change, fields.percent_change));
				}
				Ok(None) => {
					debug!(target = "tickwatch.extract", code = %code, "target not present in source rows");
					records.push(ExtractionRecord::placeholder(&code, PlaceholderReason::NotFound));
				}
				Err(err) if err.kind == QueryErrorKind::NotFound => {
					debug!(target = "tickwatch.extract", code = %code, "target not present in source rows");
					records.push(ExtractionRecord::placeholder(&code, PlaceholderReason::NotFound));
				}
				Err(err) if err.kind == QueryErrorKind::ConnectionLost => {
					warn!(target = "tickwatch.extract", code = %code, error = %err, "connection lost mid-query; attempting recovery");
					match self.pages.get_valid_page().await {
						Ok(recovered) => {
							info!(target = "tickwatch.extract", "recovery succeeded; continuing batch on fresh page");
							// The current target missed its window; the
							// rest of the batch runs on the new page.
							records.push(ExtractionRecord::placeholder(&code, PlaceholderReason::Reconnecting));
							page = recovered;
						}
						Err(recover_err) => {
							warn!(target = "tickwatch.extract", error = %recover_err, "recovery failed; degrading whole batch");
							return placeholder_snapshot(targets, PlaceholderReason::ConnectionLost);
						}
					}
				}
				Err(err) => {
					warn!(target = "tickwatch.extract", code = %code, error = %err, "query failed");
					records.push(ExtractionRecord::placeholder(&code, PlaceholderReason::QueryFailed));
				}
			}
		}

		Snapshot::completed(records)
	}

	/// Every target identifier discoverable in the source rows. Empty
	/// on any failure; the scheduler decides what to fall back to.
	pub async fn enumerate_all_targets(&self) -> Vec<String> {
		let page = match self.pages.get_valid_page().await {
			Ok(page) => page,
			Err(err) => {
				warn!(target = "tickwatch.extract", error = %err, "cannot enumerate targets without a valid page");
				return Vec::new();
			}
		};

		match page.list_codes().await {
			Ok(codes) => {
				info!(target = "tickwatch.extract", count = codes.len(), "targets discovered from source rows");
				codes
			}
			Err(err) => {
				warn!(target = "tickwatch.extract", error = %err, "target enumeration query failed");
				Vec::new()
			}
		}
	}
}

fn placeholder_snapshot(targets: &[String], reason: PlaceholderReason) -> Snapshot {
	Snapshot::completed(targets.iter().map(|code| ExtractionRecord::placeholder(code.to_uppercase(), reason)).collect())
}

//! Extraction result value types handed to persistence collaborators.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

/// Field value used when a target could not be quoted.
pub const FIELD_UNAVAILABLE: &str = "N/A";

/// Why a record carries placeholder values instead of quoted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderReason {
	/// No valid page could be obtained for the batch.
	#[serde(rename = "page unavailable")]
	PageUnavailable,
	/// Connection was lost on this target; recovery succeeded and the
	/// batch continued on a fresh page.
	#[serde(rename = "reconnecting")]
	Reconnecting,
	/// The target identifier is not present in the source rows.
	#[serde(rename = "not found")]
	NotFound,
	/// Generic per-target query failure.
	#[serde(rename = "query failed")]
	QueryFailed,
	/// Connection was lost and recovery failed; the whole batch degraded.
	#[serde(rename = "connection lost")]
	ConnectionLost,
}

/// One row of the snapshot, keyed by target identifier. Every requested
/// target yields exactly one record, quoted or placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
	pub code: String,
	pub price: String,
	pub change: String,
	pub percent_change: String,
	/// Capture time, RFC 3339 UTC.
	pub timestamp: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<PlaceholderReason>,
}

impl ExtractionRecord {
	/// Builds a successfully quoted record, stamping the capture time.
	pub fn quoted(code: impl Into<String>, price: impl Into<String>, change: impl Into<String>, percent_change: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			price: price.into(),
			change: change.into(),
			percent_change: percent_change.into(),
			timestamp: now_rfc3339(),
			error: None,
		}
	}

	/// Builds a placeholder record for a target that could not be quoted.
	pub fn placeholder(code: impl Into<String>, reason: PlaceholderReason) -> Self {
		Self {
			code: code.into(),
			price: FIELD_UNAVAILABLE.to_string(),
			change: FIELD_UNAVAILABLE.to_string(),
			percent_change: FIELD_UNAVAILABLE.to_string(),
			timestamp: now_rfc3339(),
			error: Some(reason),
		}
	}

	/// `true` when the record carries quoted fields rather than a placeholder.
	pub fn is_quoted(&self) -> bool {
		self.error.is_none()
	}
}

/// One completed extraction cycle: every requested target in request
/// order, stamped with the wall-clock completion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
	/// RFC 3339 UTC time the extraction completed (not when requested).
	pub timestamp: String,
	pub data: Vec<ExtractionRecord>,
}

impl Snapshot {
	/// Wraps finished records, stamping the completion time.
	pub fn completed(data: Vec<ExtractionRecord>) -> Self {
		Self { timestamp: now_rfc3339(), data }
	}

	/// Calendar date of the completion timestamp, resolved in the same
	/// offset [`today`] uses so the day-rollover comparison never mixes
	/// the UTC and local calendars.
	pub fn date(&self) -> Option<time::Date> {
		date_at(&self.timestamp, local_offset())
	}
}

fn date_at(timestamp: &str, offset: UtcOffset) -> Option<time::Date> {
	OffsetDateTime::parse(timestamp, &Rfc3339).ok().map(|ts| ts.to_offset(offset).date())
}

pub(crate) fn now_rfc3339() -> String {
	// Rfc3339 formatting of a UTC timestamp cannot fail.
	OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// The host's local offset, falling back to UTC when it cannot be
/// determined (e.g. multi-threaded unix processes).
fn local_offset() -> UtcOffset {
	UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Today's date in the resolved local offset.
pub(crate) fn today() -> time::Date {
	OffsetDateTime::now_utc().to_offset(local_offset()).date()
}

#[cfg(test)]
mod tests {
	use time::macros::date;

	use super::*;

	#[test]
	fn quoted_record_has_no_error_field_in_json() {
		let record = ExtractionRecord::quoted("FPT", "91.3", "+0.4", "0.44%");
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["code"], "FPT");
		assert_eq!(json["percentChange"], "0.44%");
		assert!(json.get("error").is_none());
		assert!(record.is_quoted());
	}

	#[test]
	fn placeholder_serializes_reason_as_human_string() {
		let record = ExtractionRecord::placeholder("VNM", PlaceholderReason::NotFound);
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["price"], FIELD_UNAVAILABLE);
		assert_eq!(json["error"], "not found");
		assert!(!record.is_quoted());
	}

	#[test]
	fn snapshot_date_resolves_in_the_given_offset_not_utc() {
		// 23:00 on Jan 1 at UTC-5 stamps as 04:00 Jan 2 in UTC.
		let stamp = "2026-01-02T04:00:00Z";
		let behind = UtcOffset::from_hms(-5, 0, 0).unwrap();
		assert_eq!(date_at(stamp, behind), Some(date!(2026 - 01 - 01)));
		assert_eq!(date_at(stamp, UtcOffset::UTC), Some(date!(2026 - 01 - 02)));
	}

	#[test]
	fn fresh_snapshot_date_matches_the_rollover_today() {
		let snapshot = Snapshot::completed(vec![]);
		assert_eq!(snapshot.date(), Some(today()));
	}

	#[test]
	fn snapshot_round_trips_through_json() {
		let snapshot = Snapshot::completed(vec![
			ExtractionRecord::quoted("HPG", "27.5", "-0.1", "-0.36%"),
			ExtractionRecord::placeholder("XXX", PlaceholderReason::QueryFailed),
		]);
		let text = serde_json::to_string(&snapshot).unwrap();
		let back: Snapshot = serde_json::from_str(&text).unwrap();
		assert_eq!(back.data.len(), 2);
		assert_eq!(back.data[1].error, Some(PlaceholderReason::QueryFailed));
	}
}

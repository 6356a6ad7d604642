//! Exclusive browser-session lifecycle and resilient board extraction.
//!
//! One identity owns at most one live browser session. Launches are
//! FIFO-serialized, connectivity is guarded with at-most-one reconnect
//! in flight, the single page is validated (and re-anchored on day
//! rollover) before every use, and every extraction batch degrades to
//! labeled placeholder records instead of failing.
//!
//! Layering, leaf first: [`chrome`] (or any [`driver::BrowserDriver`])
//! -> [`launcher::LaunchSerializer`] -> [`guard::SessionGuard`] ->
//! [`page::PageManager`] -> [`extract::ExtractionEngine`], assembled
//! by [`engine::Engine`].

pub mod chrome;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod extract;
pub mod guard;
pub mod launcher;
pub mod page;
pub mod record;

pub use config::EngineConfig;
pub use driver::{BrowserDriver, BrowserHandle, Identity, PageHandle, RowFields};
pub use engine::Engine;
pub use error::{EngineError, QueryError, QueryErrorKind, Result};
pub use extract::ExtractionEngine;
pub use guard::{SessionGuard, SessionState};
pub use launcher::LaunchSerializer;
pub use page::{PageManager, SnapshotLedger};
pub use record::{ExtractionRecord, PlaceholderReason, Snapshot};

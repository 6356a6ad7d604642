//! In-memory fake driver for exercising the engine without a browser.
//!
//! Built as a builder plus a controller handle: tests script failures
//! (dead launches, broken pages, per-query errors) through the
//! controller while the engine only ever sees the driver traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tickwatch_engine::driver::{BrowserDriver, BrowserHandle, Identity, PageHandle, RowFields, connected_channel};
use tickwatch_engine::error::{EngineError, QueryError, QueryErrorKind, Result};
use tickwatch_engine::page::SnapshotLedger;
use tokio::sync::watch;

pub fn row(code: &str, price: &str, change: &str, percent: &str) -> RowFields {
	RowFields {
		code: code.to_string(),
		price: price.to_string(),
		change: change.to_string(),
		percent_change: percent.to_string(),
	}
}

#[derive(Default)]
struct Shared {
	rows: Vec<RowFields>,
	launch_count: usize,
	launch_log: Vec<String>,
	open_page_count: usize,
	navigation_count: usize,
	fail_launches: usize,
	launch_delay: Option<Duration>,
	scripted_query_failures: VecDeque<QueryErrorKind>,
	current_session: Option<Arc<watch::Sender<bool>>>,
	current_page_broken: Option<Arc<AtomicBool>>,
}

pub struct FakeDriverBuilder {
	shared: Shared,
}

impl FakeDriverBuilder {
	pub fn new() -> Self {
		Self { shared: Shared::default() }
	}

	pub fn rows(mut self, rows: Vec<RowFields>) -> Self {
		self.shared.rows = rows;
		self
	}

	pub fn fail_launches(mut self, count: usize) -> Self {
		self.shared.fail_launches = count;
		self
	}

	pub fn launch_delay(mut self, delay: Duration) -> Self {
		self.shared.launch_delay = Some(delay);
		self
	}

	pub fn build(self) -> (Arc<FakeDriver>, FakeController) {
		let shared = Arc::new(Mutex::new(self.shared));
		let driver = Arc::new(FakeDriver { shared: Arc::clone(&shared) });
		(driver, FakeController { shared })
	}
}

/// Test-side handle for scripting failures and inspecting activity.
pub struct FakeController {
	shared: Arc<Mutex<Shared>>,
}

impl FakeController {
	fn lock(&self) -> MutexGuard<'_, Shared> {
		self.shared.lock().expect("fake driver state poisoned")
	}

	pub fn launch_count(&self) -> usize {
		self.lock().launch_count
	}

	pub fn launch_log(&self) -> Vec<String> {
		self.lock().launch_log.clone()
	}

	pub fn open_page_count(&self) -> usize {
		self.lock().open_page_count
	}

	pub fn navigation_count(&self) -> usize {
		self.lock().navigation_count
	}

	pub fn fail_next_launches(&self, count: usize) {
		self.lock().fail_launches = count;
	}

	pub fn fail_next_query(&self, kind: QueryErrorKind) {
		self.lock().scripted_query_failures.push_back(kind);
	}

	/// Makes the current page answer every probe/query with a
	/// connection-lost error, as a crashed render target would.
	pub fn break_page(&self) {
		if let Some(flag) = &self.lock().current_page_broken {
			flag.store(true, Ordering::SeqCst);
		}
	}

	/// Simulates the browser process dying: fires the disconnect
	/// observer of the current session.
	pub fn kill_session(&self) {
		let session = self.lock().current_session.clone();
		if let Some(session) = session {
			session.send_replace(false);
		}
	}
}

pub struct FakeDriver {
	shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl BrowserDriver for FakeDriver {
	async fn launch(&self, identity: &Identity) -> Result<Arc<dyn BrowserHandle>> {
		let delay = self.shared.lock().expect("fake driver state poisoned").launch_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let mut shared = self.shared.lock().expect("fake driver state poisoned");
		shared.launch_count += 1;
		shared.launch_log.push(identity.to_string());
		if shared.fail_launches > 0 {
			shared.fail_launches -= 1;
			return Err(EngineError::Launch("scripted launch failure".to_string()));
		}

		let (tx, _rx) = connected_channel();
		let connected = Arc::new(tx);
		shared.current_session = Some(Arc::clone(&connected));
		Ok(Arc::new(FakeSession {
			shared: Arc::clone(&self.shared),
			connected,
		}))
	}
}

pub struct FakeSession {
	shared: Arc<Mutex<Shared>>,
	connected: Arc<watch::Sender<bool>>,
}

#[async_trait]
impl BrowserHandle for FakeSession {
	fn is_connected(&self) -> bool {
		*self.connected.borrow()
	}

	fn watch_connected(&self) -> watch::Receiver<bool> {
		self.connected.subscribe()
	}

	async fn open_page(&self) -> Result<Arc<dyn PageHandle>> {
		if !self.is_connected() {
			return Err(EngineError::Page("session is disconnected".to_string()));
		}
		let broken = Arc::new(AtomicBool::new(false));
		let mut shared = self.shared.lock().expect("fake driver state poisoned");
		shared.open_page_count += 1;
		shared.current_page_broken = Some(Arc::clone(&broken));
		Ok(Arc::new(FakePage {
			shared: Arc::clone(&self.shared),
			session: Arc::clone(&self.connected),
			broken,
		}))
	}

	async fn close(&self) -> Result<()> {
		self.connected.send_replace(false);
		Ok(())
	}
}

pub struct FakePage {
	shared: Arc<Mutex<Shared>>,
	session: Arc<watch::Sender<bool>>,
	broken: Arc<AtomicBool>,
}

impl FakePage {
	fn check_alive(&self) -> Result<(), QueryError> {
		if self.broken.load(Ordering::SeqCst) || !*self.session.borrow() {
			return Err(QueryError::connection_lost("target closed"));
		}
		Ok(())
	}
}

#[async_trait]
impl PageHandle for FakePage {
	async fn probe(&self) -> Result<(), QueryError> {
		self.check_alive()
	}

	async fn navigate(&self, _url: &str) -> Result<()> {
		self.check_alive().map_err(|e| EngineError::Page(e.to_string()))?;
		self.shared.lock().expect("fake driver state poisoned").navigation_count += 1;
		Ok(())
	}

	async fn settle(&self) -> Result<()> {
		self.check_alive().map_err(|e| EngineError::Page(e.to_string()))?;
		Ok(())
	}

	async fn query_record(&self, code: &str) -> Result<Option<RowFields>, QueryError> {
		self.check_alive()?;
		let scripted = self.shared.lock().expect("fake driver state poisoned").scripted_query_failures.pop_front();
		if let Some(kind) = scripted {
			// A scripted connection loss behaves like the real thing:
			// the session process is gone, not just this one query.
			if kind == QueryErrorKind::ConnectionLost {
				self.broken.store(true, Ordering::SeqCst);
				self.session.send_replace(false);
			}
			return Err(QueryError::new(kind, "scripted query failure"));
		}
		let shared = self.shared.lock().expect("fake driver state poisoned");
		Ok(shared.rows.iter().find(|fields| fields.code == code).cloned())
	}

	async fn list_codes(&self) -> Result<Vec<String>, QueryError> {
		self.check_alive()?;
		let shared = self.shared.lock().expect("fake driver state poisoned");
		Ok(shared.rows.iter().map(|fields| fields.code.clone()).collect())
	}

	async fn close(&self) -> Result<()> {
		Ok(())
	}
}

/// Ledger whose date tests can move around the day boundary.
#[derive(Default)]
pub struct FakeLedger {
	date: Mutex<Option<time::Date>>,
}

impl FakeLedger {
	pub fn set_date(&self, date: Option<time::Date>) {
		*self.date.lock().expect("ledger state poisoned") = date;
	}
}

impl SnapshotLedger for FakeLedger {
	fn last_snapshot_date(&self) -> Option<time::Date> {
		*self.date.lock().expect("ledger state poisoned")
	}
}

/// Today as the engine sees it (local offset, UTC fallback).
pub fn today() -> time::Date {
	let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
	time::OffsetDateTime::now_utc().to_offset(offset).date()
}

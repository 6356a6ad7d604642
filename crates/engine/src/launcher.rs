//! FIFO-serialized browser launching with an active-session registry.
//!
//! At most one launch is in flight globally. Requests queue in strict
//! FIFO order; a single drain task processes them one at a time with a
//! fixed pause between launches so a crashed browser is never hammered
//! with restart attempts. Before acting on a queued request the drain
//! re-checks the registry: another request may already have produced a
//! live session for the same identity, in which case it is reused
//! instead of double-launched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::config::DEFAULT_INTER_LAUNCH_DELAY;
use crate::driver::{BrowserDriver, BrowserHandle, Identity};
use crate::error::{EngineError, Result};

type Registry = Arc<Mutex<HashMap<Identity, Arc<dyn BrowserHandle>>>>;

struct LaunchRequest {
	identity: Identity,
	reply: oneshot::Sender<Result<Arc<dyn BrowserHandle>>>,
}

/// Serializes all browser launches behind one FIFO queue.
pub struct LaunchSerializer {
	queue: mpsc::UnboundedSender<LaunchRequest>,
	registry: Registry,
}

impl LaunchSerializer {
	pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
		Self::with_delay(driver, DEFAULT_INTER_LAUNCH_DELAY)
	}

	/// Creates a serializer with an explicit inter-launch delay and
	/// spawns its drain task.
	pub fn with_delay(driver: Arc<dyn BrowserDriver>, delay: Duration) -> Self {
		let (queue, rx) = mpsc::unbounded_channel();
		let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
		tokio::spawn(drain_queue(driver, rx, Arc::clone(&registry), delay));
		Self { queue, registry }
	}

	/// Returns the live session for `identity`, enqueueing a launch if
	/// none exists. Resolves when this request's own attempt (or an
	/// earlier satisfying launch) completes; a failed launch rejects
	/// only this request and never blocks later queue entries.
	pub async fn enqueue_launch(&self, identity: &Identity) -> Result<Arc<dyn BrowserHandle>> {
		if let Some(handle) = self.live_handle(identity) {
			return Ok(handle);
		}

		let (reply, rx) = oneshot::channel();
		self.queue
			.send(LaunchRequest { identity: identity.clone(), reply })
			.map_err(|_| EngineError::Launch("launch queue is no longer running".to_string()))?;
		rx.await.map_err(|_| EngineError::Launch("launch request dropped before completion".to_string()))?
	}

	/// Currently registered live session for `identity`, evicting a
	/// registered-but-dead entry on the way.
	pub fn live_handle(&self, identity: &Identity) -> Option<Arc<dyn BrowserHandle>> {
		registered_live(&self.registry, identity)
	}
}

async fn drain_queue(driver: Arc<dyn BrowserDriver>, mut rx: mpsc::UnboundedReceiver<LaunchRequest>, registry: Registry, delay: Duration) {
	while let Some(request) = rx.recv().await {
		let result = attempt_launch(driver.as_ref(), &registry, &request.identity).await;
		if let Err(err) = &result {
			warn!(target = "tickwatch.launch", identity = %request.identity, error = %err, "launch attempt failed");
		}
		// The request leaves the queue only now, after its attempt
		// finished either way. The caller may be gone; that is fine.
		let _ = request.reply.send(result);
		tokio::time::sleep(delay).await;
	}
}

async fn attempt_launch(driver: &dyn BrowserDriver, registry: &Registry, identity: &Identity) -> Result<Arc<dyn BrowserHandle>> {
	// Another path may have satisfied this identity while the request
	// sat in the queue.
	if let Some(handle) = registered_live(registry, identity) {
		debug!(target = "tickwatch.launch", identity = %identity, "reusing live session for queued request");
		return Ok(handle);
	}

	let handle = driver.launch(identity).await?;
	registry.lock().insert(identity.clone(), Arc::clone(&handle));
	debug!(target = "tickwatch.launch", identity = %identity, "session launched and registered");

	// Disconnect observer: evict the registry entry the moment the
	// process goes away so the next ensure-connected call relaunches.
	let mut connected = handle.watch_connected();
	let registry = Arc::clone(registry);
	let identity = identity.clone();
	let observed = Arc::clone(&handle);
	tokio::spawn(async move {
		loop {
			if !*connected.borrow() {
				break;
			}
			if connected.changed().await.is_err() {
				// Sender dropped: the session is gone with it.
				break;
			}
		}
		// Evict only our own entry; a replacement session may already
		// have been registered under the same identity.
		let mut registry = registry.lock();
		if registry.get(&identity).is_some_and(|current| Arc::ptr_eq(current, &observed)) {
			registry.remove(&identity);
			warn!(target = "tickwatch.launch", identity = %identity, "session disconnected; evicted from registry");
		}
	});

	Ok(handle)
}

fn registered_live(registry: &Registry, identity: &Identity) -> Option<Arc<dyn BrowserHandle>> {
	let mut registry = registry.lock();
	match registry.get(identity) {
		Some(handle) if handle.is_connected() => Some(Arc::clone(handle)),
		Some(_) => {
			registry.remove(identity);
			None
		}
		None => None,
	}
}

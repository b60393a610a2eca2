//! Shared helpers for pool integration tests.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use strata_pool::{Pool, PoolConfig};

/// Upper bound for any single wait in these tests.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Config with a short idle backoff so retire/shed paths run quickly.
pub fn config(capacity: usize) -> PoolConfig {
	let _ = tracing_subscriber::fmt::try_init();
	PoolConfig::new(capacity).with_idle_backoff(Duration::from_millis(5))
}

/// Polls `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
	let deadline = Instant::now() + timeout;
	while Instant::now() < deadline {
		if cond() {
			return true;
		}
		thread::sleep(Duration::from_millis(2));
	}
	cond()
}

/// Waits until every accepted task finished and every worker thread exited.
pub fn wait_quiescent(pool: &Pool) -> bool {
	wait_until(TIMEOUT, || {
		let stats = pool.stats();
		stats.is_idle() && stats.running == 0 && stats.waiting == 0 && stats.slots_live == 0
	})
}

/// Blocks the next worker to pick it up until the returned sender fires or
/// is dropped. Returns once the blocker is running.
pub fn occupy(pool: &Pool) -> mpsc::Sender<()> {
	let (release_tx, release_rx) = mpsc::channel::<()>();
	let (started_tx, started_rx) = mpsc::channel();
	pool.submit(move || {
		started_tx.send(()).unwrap();
		let _ = release_rx.recv_timeout(TIMEOUT);
	})
	.unwrap();
	started_rx.recv_timeout(TIMEOUT).expect("blocker never started");
	release_tx
}

/// Ordered log of labelled events with timestamps.
#[derive(Default)]
pub struct Timeline {
	events: Mutex<Vec<(String, Instant)>>,
}

impl Timeline {
	pub fn record(&self, label: impl Into<String>) {
		self.events.lock().push((label.into(), Instant::now()));
	}

	pub fn labels(&self) -> Vec<String> {
		self.events.lock().iter().map(|(label, _)| label.clone()).collect()
	}

	pub fn at(&self, label: &str) -> Option<Instant> {
		self.events.lock().iter().find(|(l, _)| l == label).map(|(_, at)| *at)
	}

	pub fn len(&self) -> usize {
		self.events.lock().len()
	}
}

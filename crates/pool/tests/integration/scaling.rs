use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use strata_pool::{Pool, PoolStats, SpawnThrottle};

use crate::common::{TIMEOUT, config, occupy, wait_quiescent, wait_until};

/// Tracks how many tasks are executing at once.
#[derive(Default)]
struct Concurrency {
	active: AtomicUsize,
	peak: AtomicUsize,
	done: AtomicUsize,
}

impl Concurrency {
	fn run(&self, work: Duration) {
		let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
		thread::sleep(work);
		self.active.fetch_sub(1, Ordering::SeqCst);
		self.done.fetch_add(1, Ordering::SeqCst);
	}
}

fn assert_within_capacity(stats: &PoolStats) {
	assert!(stats.running + stats.waiting <= stats.capacity, "{stats:?}");
}

#[test]
fn workers_grow_to_capacity_and_no_further() {
	let pool = Pool::new(config(4)).unwrap();
	let load = Arc::new(Concurrency::default());
	let hold = occupy(&pool);
	for _ in 0..40 {
		let load = Arc::clone(&load);
		pool.submit(move || load.run(Duration::from_millis(20))).unwrap();
		assert_within_capacity(&pool.stats());
	}
	hold.send(()).unwrap();

	let mut saw_full = false;
	assert!(wait_until(TIMEOUT, || {
		let stats = pool.stats();
		assert_within_capacity(&stats);
		saw_full |= stats.running == stats.capacity;
		load.done.load(Ordering::SeqCst) == 40
	}));
	assert_eq!(load.peak.load(Ordering::SeqCst), 4, "backlog above capacity should fill every worker");
	assert!(saw_full, "running never reached capacity");
	assert!(wait_quiescent(&pool), "surplus workers should retire once idle: {:?}", pool.stats());
}

#[test]
fn idle_pool_shrinks_to_zero_workers() {
	let pool = Pool::new(config(8)).unwrap();
	let load = Arc::new(Concurrency::default());
	for _ in 0..32 {
		let load = Arc::clone(&load);
		pool.submit(move || load.run(Duration::from_millis(2))).unwrap();
	}
	assert!(wait_quiescent(&pool), "{:?}", pool.stats());
	assert_eq!(load.done.load(Ordering::SeqCst), 32);

	let stats = pool.stats();
	assert!(stats.slots_allocated <= stats.capacity, "{stats:?}");
}

#[test]
fn concurrent_submitters_lose_nothing() {
	let pool = Arc::new(Pool::new(config(4).with_queue_sizes(4, 4, 4)).unwrap());
	let load = Arc::new(Concurrency::default());
	let barrier = Arc::new(Barrier::new(8));

	let submitters: Vec<_> = (0..8)
		.map(|n| {
			let pool = Arc::clone(&pool);
			let load = Arc::clone(&load);
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				for i in 0..100 {
					let load = Arc::clone(&load);
					pool.submit_with_priority(move || load.run(Duration::ZERO), (n + i) % 4).unwrap();
				}
			})
		})
		.collect();
	for submitter in submitters {
		submitter.join().unwrap();
	}

	assert!(wait_until(TIMEOUT, || load.done.load(Ordering::SeqCst) == 800));
	assert!(wait_quiescent(&pool));
	let stats = pool.stats();
	assert_eq!((stats.submitted, stats.completed), (800, 800));
	assert!(load.peak.load(Ordering::SeqCst) <= 4);
}

#[test]
fn eager_throttle_stays_within_capacity() {
	for throttle in [SpawnThrottle::Lottery { threshold: 0 }, SpawnThrottle::Damped { threshold: 0 }, SpawnThrottle::Off] {
		let pool = Pool::new(config(3).with_spawn_throttle(throttle)).unwrap();
		let load = Arc::new(Concurrency::default());
		for _ in 0..30 {
			let load = Arc::clone(&load);
			pool.submit(move || load.run(Duration::from_millis(2))).unwrap();
		}
		assert!(wait_until(TIMEOUT, || {
			assert_within_capacity(&pool.stats());
			load.done.load(Ordering::SeqCst) == 30
		}));
		assert!(load.peak.load(Ordering::SeqCst) <= 3, "{throttle:?}");
		assert!(wait_quiescent(&pool), "{throttle:?}: {:?}", pool.stats());
	}
}

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use strata_pool::{Pool, PoolError, Tier, URGENT_PRIORITY, VIP_PRIORITY};

use crate::common::{TIMEOUT, config, occupy, wait_quiescent, wait_until};

#[test]
fn tiers_drain_strictly_in_order() {
	let pool = Pool::new(config(1)).unwrap();
	let release = occupy(&pool);

	let order: Arc<Mutex<Vec<(Tier, usize)>>> = Arc::default();
	let priorities = [0, URGENT_PRIORITY, VIP_PRIORITY, 1, URGENT_PRIORITY, -5, VIP_PRIORITY, 0, URGENT_PRIORITY, 42];
	for (seq, priority) in priorities.into_iter().enumerate() {
		let order = Arc::clone(&order);
		pool.submit_with_priority(move || order.lock().push((Tier::from_priority(priority), seq)), priority)
			.unwrap();
	}
	release.send(()).unwrap();
	assert!(wait_until(TIMEOUT, || order.lock().len() == priorities.len()));

	let order = order.lock().clone();
	let tiers: Vec<Tier> = order.iter().map(|(tier, _)| *tier).collect();
	let mut sorted = tiers.clone();
	sorted.sort();
	assert_eq!(tiers, sorted, "tiers ran out of order: {order:?}");

	for tier in Tier::ALL {
		let seqs: Vec<usize> = order.iter().filter(|(t, _)| *t == tier).map(|(_, seq)| *seq).collect();
		assert!(seqs.windows(2).all(|w| w[0] < w[1]), "{tier} ran out of FIFO order: {seqs:?}");
	}
}

#[test]
fn urgent_never_runs_after_a_later_lower_tier_task() {
	let pool = Pool::new(config(1)).unwrap();
	let release = occupy(&pool);
	let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();

	for (label, priority) in [("urgent-1", URGENT_PRIORITY), ("common-1", 0), ("vip-1", VIP_PRIORITY), ("urgent-2", URGENT_PRIORITY)] {
		let order = Arc::clone(&order);
		pool.submit_with_priority(move || order.lock().push(label), priority).unwrap();
	}
	release.send(()).unwrap();
	assert!(wait_until(TIMEOUT, || order.lock().len() == 4));
	assert_eq!(*order.lock(), vec!["urgent-1", "urgent-2", "vip-1", "common-1"]);
}

#[test]
fn full_queue_applies_backpressure() {
	let pool = Arc::new(Pool::new(config(1).with_queue_sizes(2, 0, 0)).unwrap());
	let release = occupy(&pool);
	let order: Arc<Mutex<Vec<usize>>> = Arc::default();

	for i in 0..2 {
		let order = Arc::clone(&order);
		pool.submit_with_priority(move || order.lock().push(i), URGENT_PRIORITY).unwrap();
	}
	assert!(matches!(pool.try_submit_with_priority(|| {}, URGENT_PRIORITY), Err(PoolError::QueueFull(Tier::Urgent))));

	let blocked = {
		let pool = Arc::clone(&pool);
		let order = Arc::clone(&order);
		thread::spawn(move || pool.submit_with_priority(move || order.lock().push(2), URGENT_PRIORITY))
	};
	thread::sleep(Duration::from_millis(30));
	assert!(!blocked.is_finished(), "submit must wait for queue space");

	release.send(()).unwrap();
	blocked.join().unwrap().unwrap();
	assert!(wait_until(TIMEOUT, || order.lock().len() == 3));
	assert_eq!(*order.lock(), vec![0, 1, 2], "backpressure must not reorder or drop");
	assert!(wait_quiescent(&pool));
}

#[test]
fn submit_after_close_is_closed_for_any_priority() {
	let pool = Pool::new(config(3)).unwrap();
	pool.close();
	for priority in -3..=6 {
		assert!(matches!(pool.submit_with_priority(|| {}, priority), Err(PoolError::Closed)));
	}
	assert!(matches!(pool.submit(|| {}), Err(PoolError::Closed)));
}

#[test]
fn repeated_close_matches_a_single_close() {
	let pool = Pool::new(config(3)).unwrap();
	let done = Arc::new(Mutex::new(0));
	for _ in 0..6 {
		let done = Arc::clone(&done);
		pool.submit(move || *done.lock() += 1).unwrap();
	}
	for _ in 0..5 {
		pool.close();
	}
	assert!(pool.is_closed());
	assert!(wait_until(TIMEOUT, || *done.lock() == 6));
	assert!(wait_quiescent(&pool));
	let stats = pool.stats();
	assert!(stats.closed);
	assert_eq!(stats.completed, 6);
}

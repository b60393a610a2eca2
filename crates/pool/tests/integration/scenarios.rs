use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use strata_pool::{Cluster, Pool, TaskPanic, URGENT_PRIORITY};

use crate::common::{TIMEOUT, Timeline, config, occupy, wait_quiescent, wait_until};

#[test]
fn common_tasks_all_complete() {
	let pool = Pool::new(config(4).with_queue_sizes(2, 0, 0)).unwrap();
	let done = Arc::new(AtomicUsize::new(0));
	for _ in 0..10 {
		let done = Arc::clone(&done);
		pool.submit(move || {
			thread::sleep(Duration::from_millis(10));
			done.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
	}

	assert!(wait_until(TIMEOUT, || done.load(Ordering::SeqCst) == 10));
	assert!(wait_until(TIMEOUT, || pool.stats().pending == 0));
	let stats = pool.stats();
	assert_eq!(stats.submitted, 10);
	assert_eq!(stats.completed, 10);
}

#[test]
fn urgent_task_overtakes_queued_common_task() {
	let pool = Arc::new(Pool::new(config(1)).unwrap());
	let timeline = Arc::new(Timeline::default());
	let release = occupy(&pool);

	let submitters: Vec<_> = [("common", 0), ("urgent", URGENT_PRIORITY)]
		.into_iter()
		.map(|(label, priority)| {
			let pool = Arc::clone(&pool);
			let timeline = Arc::clone(&timeline);
			thread::spawn(move || {
				pool.submit_with_priority(
					move || {
						timeline.record(format!("{label}.start"));
						thread::sleep(Duration::from_millis(5));
						timeline.record(format!("{label}.end"));
					},
					priority,
				)
			})
		})
		.collect();
	for submitter in submitters {
		submitter.join().unwrap().unwrap();
	}
	release.send(()).unwrap();

	assert!(wait_until(TIMEOUT, || timeline.len() == 4));
	let urgent_end = timeline.at("urgent.end").unwrap();
	let common_start = timeline.at("common.start").unwrap();
	assert!(urgent_end <= common_start, "{:?}", timeline.labels());
}

#[test]
fn cluster_spreads_one_task_per_shard() {
	let cluster = Cluster::new(config(100).with_cluster(30)).unwrap();
	assert_eq!(cluster.shards().len(), 4);
	assert!(cluster.shards().iter().all(|pool| pool.capacity() == 25));

	let done = Arc::new(AtomicUsize::new(0));
	for _ in 0..4 {
		let done = Arc::clone(&done);
		cluster
			.submit(move || {
				done.fetch_add(1, Ordering::SeqCst);
			})
			.unwrap();
	}

	assert!(wait_until(TIMEOUT, || done.load(Ordering::SeqCst) == 4));
	let submitted: Vec<u64> = cluster.stats().iter().map(|stats| stats.submitted).collect();
	assert_eq!(submitted, vec![1, 1, 1, 1]);
	cluster.close();
	assert!(cluster.is_closed());
}

#[test]
fn task_panic_reaches_sink_once_and_pool_keeps_working() {
	let panics: Arc<Mutex<Vec<TaskPanic>>> = Arc::default();
	let sink = Arc::clone(&panics);
	let pool = Pool::new(config(2).with_name("faulty").with_failure_sink(move |panic: &TaskPanic| sink.lock().push(panic.clone()))).unwrap();

	pool.submit(|| panic!("task exploded")).unwrap();
	assert!(wait_until(TIMEOUT, || panics.lock().len() == 1));

	let done = Arc::new(AtomicUsize::new(0));
	for _ in 0..5 {
		let done = Arc::clone(&done);
		pool.submit(move || {
			done.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
	}
	assert!(wait_until(TIMEOUT, || done.load(Ordering::SeqCst) == 5));
	assert!(wait_quiescent(&pool));

	let panics = panics.lock();
	assert_eq!(panics.len(), 1);
	assert_eq!(panics[0].pool, "faulty");
	assert_eq!(panics[0].message, "task exploded");
	let stats = pool.stats();
	assert_eq!((stats.panicked, stats.completed, stats.pending), (1, 5, 0));
}

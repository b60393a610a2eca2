//! The pool handle and the state its workers share.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use crate::admission::{Load, SpawnThrottle};
use crate::config::{PanicPolicy, PoolConfig};
use crate::error::{PoolError, Result};
use crate::scheduler::{self, SendMode};
use crate::sink::FailureSink;
use crate::slots::WorkerSlots;
use crate::sync::{Condvar, SpinLock};
use crate::task::Task;
use crate::tier::{TierCapacity, TierDepth, TierQueues};
use crate::worker;


/// Lifetime counters. Relaxed: they feed [`PoolStats`] only.
#[derive(Debug, Default)]
pub(crate) struct Counters {
	pub submitted: AtomicU64,
	pub completed: AtomicU64,
	pub panicked: AtomicU64,
	pub spawned: AtomicU64,
}

/// State shared between the [`Pool`] handle and every worker thread.
///
/// `running`, `waiting` and `pending` are atomics so stats and the fast paths
/// can read them without the gate; every decision that combines them, and
/// every change to the set of live workers, happens with `gate` held.
pub(crate) struct Shared {
	pub name: String,
	pub capacity: usize,
	pub running: AtomicUsize,
	pub waiting: AtomicUsize,
	pub pending: AtomicUsize,
	open: AtomicBool,
	close_once: Once,
	pub queues: TierQueues,
	pub slots: WorkerSlots,
	pub gate: SpinLock<()>,
	pub cond: Condvar,
	pub throttle: SpawnThrottle,
	pub panic_policy: PanicPolicy,
	pub idle_backoff: Duration,
	pub sink: Arc<dyn FailureSink>,
	pub counters: Counters,
}

impl Shared {
	fn new(config: PoolConfig) -> Self {
		let queues = TierQueues::new(config.queue_capacity());
		let idle_backoff = config.idle_backoff();
		Self {
			capacity: config.capacity,
			running: AtomicUsize::new(0),
			waiting: AtomicUsize::new(0),
			pending: AtomicUsize::new(0),
			open: AtomicBool::new(true),
			close_once: Once::new(),
			queues,
			slots: WorkerSlots::new(),
			gate: SpinLock::new(()),
			cond: Condvar::new(),
			throttle: config.spawn_throttle,
			panic_policy: config.panic_policy,
			idle_backoff,
			sink: config.failure_sink,
			counters: Counters::default(),
			name: config.name,
		}
	}

	pub fn is_closed(&self) -> bool {
		!self.open.load(Ordering::Acquire)
	}

	/// Counter snapshot; only meaningful as a decision input while the gate is held.
	pub fn load(&self) -> Load {
		Load {
			running: self.running.load(Ordering::Acquire),
			waiting: self.waiting.load(Ordering::Acquire),
			pending: self.pending.load(Ordering::Acquire),
		}
	}

	fn close(&self) {
		self.close_once.call_once(|| {
			self.open.store(false, Ordering::Release);
			self.queues.close();
			let woken = {
				let _gate = self.gate.lock();
				self.cond.notify_all()
			};
			let depth = self.queues.depth();
			tracing::debug!(pool = %self.name, woken, draining = depth.total(), "pool.close");
		});
	}
}

/// Point-in-time view of a pool.
///
/// `running` and `waiting` are read together under the gate, so
/// `running + waiting <= capacity` holds for every snapshot. The other
/// fields are read independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
	pub name: String,
	pub capacity: usize,
	pub running: usize,
	pub waiting: usize,
	pub pending: usize,
	pub closed: bool,
	pub depth: TierDepth,
	pub queue_capacity: TierCapacity,
	/// Tasks accepted by a submit call.
	pub submitted: u64,
	/// Tasks that returned normally.
	pub completed: u64,
	/// Tasks that panicked.
	pub panicked: u64,
	/// Worker threads started over the pool's lifetime.
	pub spawned: u64,
	pub slots_allocated: usize,
	/// Slots held by worker threads that have not exited yet.
	pub slots_live: usize,
	pub slots_reused: u64,
}

impl PoolStats {
	/// Whether every accepted task has finished.
	pub fn is_idle(&self) -> bool {
		self.pending == 0 && self.depth.total() == 0
	}
}

/// A priority-tiered, self-scaling pool of worker threads.
///
/// A pool starts with one worker and grows toward `capacity` while backlog
/// outpaces the running workers; surplus workers park on the condition
/// variable or retire. Tasks run in strict tier order: urgent, then vip,
/// then common.
///
/// Dropping the pool closes it. Tasks accepted before the close still run.
pub struct Pool {
	shared: Arc<Shared>,
}

impl Pool {
	/// Validates `config` and starts the seed worker.
	pub fn new(config: PoolConfig) -> Result<Self> {
		config.validate()?;
		let shared = Arc::new(Shared::new(config));
		{
			let gate = shared.gate.lock();
			worker::spawn(&shared, &gate)?;
		}
		tracing::debug!(pool = %shared.name, capacity = shared.capacity, "pool.open");
		Ok(Self { shared })
	}

	pub fn name(&self) -> &str {
		&self.shared.name
	}

	pub fn capacity(&self) -> usize {
		self.shared.capacity
	}

	/// Submits `f` at the common tier, blocking while that queue is full.
	pub fn submit<F>(&self, f: F) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit_task(Task::new(f))
	}

	/// Submits `f` at the tier selected by `priority`, blocking while that
	/// queue is full.
	pub fn submit_with_priority<F>(&self, f: F, priority: i32) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit_task(Task::new(f).with_priority(priority))
	}

	/// Like [`submit_with_priority`](Self::submit_with_priority), but fails
	/// with [`PoolError::QueueFull`] instead of waiting for space.
	pub fn try_submit_with_priority<F>(&self, f: F, priority: i32) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		self.dispatch(Task::new(f).with_priority(priority), SendMode::NonBlocking)
	}

	/// Submits a prepared task. A task without a callable is accepted and ignored.
	pub fn submit_task(&self, task: Task) -> Result<()> {
		self.dispatch(task, SendMode::Blocking)
	}

	fn dispatch(&self, task: Task, mode: SendMode) -> Result<()> {
		if self.shared.is_closed() {
			return Err(PoolError::Closed);
		}
		scheduler::dispatch(&self.shared, task, mode)
	}

	/// Stops accepting submissions and wakes parked workers so they can drain
	/// the queues and exit. Later calls do nothing.
	pub fn close(&self) {
		self.shared.close();
	}

	pub fn is_closed(&self) -> bool {
		self.shared.is_closed()
	}

	pub fn stats(&self) -> PoolStats {
		let shared = &*self.shared;
		let Load { running, waiting, pending } = {
			let _gate = shared.gate.lock();
			shared.load()
		};
		let slots = shared.slots.stats();
		PoolStats {
			name: shared.name.clone(),
			capacity: shared.capacity,
			running,
			waiting,
			pending,
			closed: shared.is_closed(),
			depth: shared.queues.depth(),
			queue_capacity: shared.queues.capacity(),
			submitted: shared.counters.submitted.load(Ordering::Relaxed),
			completed: shared.counters.completed.load(Ordering::Relaxed),
			panicked: shared.counters.panicked.load(Ordering::Relaxed),
			spawned: shared.counters.spawned.load(Ordering::Relaxed),
			slots_allocated: slots.allocated,
			slots_live: slots.live,
			slots_reused: slots.reused,
		}
	}
}

impl std::fmt::Debug for Pool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let Load { running, waiting, pending } = self.shared.load();
		f.debug_struct("Pool")
			.field("name", &self.shared.name)
			.field("capacity", &self.shared.capacity)
			.field("running", &running)
			.field("waiting", &waiting)
			.field("pending", &pending)
			.field("closed", &self.shared.is_closed())
			.finish()
	}
}

impl Drop for Pool {
	fn drop(&mut self) {
		self.close();
	}
}

//! Worker threads: polling, admission control, execution, and the
//! park/retire decisions that size the pool to its backlog.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use rand::Rng;

use crate::admission::{self, Admission};
use crate::config::PanicPolicy;
use crate::pool::Shared;
use crate::sink::{TaskPanic, panic_message};
use crate::slots::WorkerSlot;
use crate::sync::SpinLockGuard;
use crate::task::Job;
use crate::tier::Tier;

type Gate<'a> = SpinLockGuard<'a, ()>;

/// Continuation directive after one step of the worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
	Continue,
	/// The worker has already given up its `running` count and must exit.
	Exit,
}

/// Starts a worker thread. The caller holds the gate.
pub(crate) fn spawn(shared: &Arc<Shared>, _gate: &Gate<'_>) -> io::Result<WorkerSlot> {
	shared.running.fetch_add(1, Ordering::AcqRel);
	let (slot, generation) = shared.slots.checkout();
	let worker = Arc::clone(shared);
	let spawned = thread::Builder::new()
		.name(format!("{}-worker-{slot}", shared.name))
		.spawn(move || run(worker, slot));

	match spawned {
		Ok(_) => {
			shared.counters.spawned.fetch_add(1, Ordering::Relaxed);
			tracing::trace!(pool = %shared.name, worker = slot.index(), generation, "pool.worker.spawn");
			Ok(slot)
		}
		Err(err) => {
			shared.running.fetch_sub(1, Ordering::AcqRel);
			shared.slots.release(slot);
			tracing::error!(pool = %shared.name, worker = slot.index(), error = %err, "pool.worker.spawn_failed");
			Err(err)
		}
	}
}

/// Makes sure freshly queued work has someone to run it: starts a worker when
/// none exist, or wakes a parked one when nobody is running.
///
/// Must run under the gate after the enqueue, so a concurrent retire either
/// sees the queued job or is visible here as `running == 0`.
pub(crate) fn ensure_running(shared: &Arc<Shared>) {
	let gate = shared.gate.lock();
	if shared.running.load(Ordering::Acquire) > 0 {
		return;
	}
	if shared.waiting.load(Ordering::Acquire) > 0 {
		shared.cond.notify_one();
		tracing::trace!(pool = %shared.name, "pool.worker.revive_parked");
	} else {
		let _ = spawn(shared, &gate);
	}
}

/// Thread body.
fn run(shared: Arc<Shared>, slot: WorkerSlot) {
	let mut exit = ExitGuard {
		shared: Arc::clone(&shared),
		slot,
		retired: false,
	};
	Worker {
		shared,
		slot,
		idle_rounds: 0,
	}
	.run(&mut rand::thread_rng());
	exit.retired = true;
}

struct Worker {
	shared: Arc<Shared>,
	slot: WorkerSlot,
	/// Consecutive empty polls while peers were alive.
	idle_rounds: u32,
}

impl Worker {
	fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) {
		loop {
			let flow = match self.shared.queues.poll() {
				Some((tier, job)) => {
					self.idle_rounds = 0;
					self.admit(rng);
					let panicked = self.execute(tier, job);
					self.after_task(panicked)
				}
				None => self.idle(),
			};
			if flow == Flow::Exit {
				return;
			}
		}
	}

	/// Admission control for one dequeue. Under very high load the throttle
	/// may grant one extra check ahead of the mandatory one.
	fn admit<R: Rng + ?Sized>(&self, rng: &mut R) {
		let shared = &*self.shared;
		let running = shared.running.load(Ordering::Acquire);
		if running >= shared.capacity {
			return;
		}
		if shared.throttle.draw(running, shared.capacity, rng) {
			self.check();
		}
		self.check();
	}

	fn check(&self) {
		let shared = &self.shared;
		let gate = shared.gate.lock();
		match admission::admit(shared.load(), shared.capacity) {
			Admission::Spawn => {
				let _ = spawn(shared, &gate);
			}
			Admission::WakeOne => {
				shared.cond.notify_one();
			}
			Admission::Hold => {}
		}
	}

	/// Runs one job, converting a panic into a sink event. Returns whether it panicked.
	fn execute(&self, tier: Tier, job: Job) -> bool {
		let shared = &*self.shared;
		let result = catch_unwind(AssertUnwindSafe(job));
		shared.pending.fetch_sub(1, Ordering::AcqRel);

		match result {
			Ok(()) => {
				shared.counters.completed.fetch_add(1, Ordering::Relaxed);
				false
			}
			Err(payload) => {
				shared.counters.panicked.fetch_add(1, Ordering::Relaxed);
				let panic = TaskPanic {
					pool: shared.name.clone(),
					worker: self.slot,
					tier,
					message: panic_message(payload.as_ref()),
				};
				shared.sink.task_panicked(&panic);
				true
			}
		}
	}

	fn after_task(&self, panicked: bool) -> Flow {
		let shared = &*self.shared;
		if panicked && shared.panic_policy == PanicPolicy::RetireWorker {
			let gate = shared.gate.lock();
			return self.retire(&gate, "panic");
		}
		if shared.running.load(Ordering::Acquire) < shared.pending.load(Ordering::Acquire) {
			return Flow::Continue;
		}
		if shared.is_closed() {
			let gate = shared.gate.lock();
			return self.retire(&gate, "closed");
		}
		self.suspend()
	}

	/// All queues were empty on the last poll.
	fn idle(&mut self) -> Flow {
		let shared = &*self.shared;
		let gate = shared.gate.lock();
		let load = shared.load();
		if load.running <= 1 {
			return self.retire(&gate, "idle");
		}
		if shared.is_closed() {
			return self.retire(&gate, "closed");
		}
		if self.idle_rounds > 0 && load.running + load.waiting > load.pending {
			return self.retire(&gate, "shed");
		}
		drop(gate);

		self.idle_rounds += 1;
		thread::sleep(shared.idle_backoff);
		Flow::Continue
	}

	/// Parks on the condition variable unless this is the only running worker.
	fn suspend(&self) -> Flow {
		let shared = &*self.shared;
		let mut gate = shared.gate.lock();
		if shared.running.load(Ordering::Acquire) == 1 {
			return Flow::Continue;
		}
		if shared.is_closed() {
			return self.retire(&gate, "closed");
		}

		shared.running.fetch_sub(1, Ordering::AcqRel);
		shared.waiting.fetch_add(1, Ordering::AcqRel);
		tracing::trace!(pool = %shared.name, worker = self.slot.index(), "pool.worker.park");
		gate = shared.cond.wait(gate);
		shared.waiting.fetch_sub(1, Ordering::AcqRel);
		shared.running.fetch_add(1, Ordering::AcqRel);
		tracing::trace!(pool = %shared.name, worker = self.slot.index(), "pool.worker.wake");

		if shared.is_closed() {
			return self.retire(&gate, "closed");
		}
		let load = shared.load();
		if load.running + load.waiting > load.pending {
			return self.retire(&gate, "shed");
		}
		Flow::Continue
	}

	/// Gives up this worker's `running` count.
	///
	/// The last running worker refuses while anything is still queued and no
	/// parked peer could take over. If it does retire with parked peers, it
	/// wakes all of them.
	fn retire(&self, _gate: &Gate<'_>, reason: &'static str) -> Flow {
		let shared = &*self.shared;
		let running = shared.running.load(Ordering::Acquire);
		let waiting = shared.waiting.load(Ordering::Acquire);
		if running == 1 && waiting == 0 && !shared.queues.is_empty() {
			return Flow::Continue;
		}

		shared.running.fetch_sub(1, Ordering::AcqRel);
		let handed_off = if running == 1 && waiting > 0 { shared.cond.notify_all() } else { 0 };
		tracing::trace!(pool = %shared.name, worker = self.slot.index(), reason, handed_off, "pool.worker.retire");
		Flow::Exit
	}
}

/// Returns the slot on every exit path. A worker that unwinds without having
/// retired also gives back its `running` count and, if it was the last one,
/// hands the remaining work to a parked peer or a replacement.
struct ExitGuard {
	shared: Arc<Shared>,
	slot: WorkerSlot,
	retired: bool,
}

impl Drop for ExitGuard {
	fn drop(&mut self) {
		let shared = &self.shared;
		if !self.retired {
			let gate = shared.gate.lock();
			let running = shared.running.fetch_sub(1, Ordering::AcqRel) - 1;
			tracing::warn!(pool = %shared.name, worker = self.slot.index(), running, "pool.worker.abort");
			if running == 0 {
				if shared.waiting.load(Ordering::Acquire) > 0 {
					shared.cond.notify_all();
				} else if !shared.queues.is_empty() {
					let _ = spawn(shared, &gate);
				}
			}
		}
		shared.slots.release(self.slot);
	}
}

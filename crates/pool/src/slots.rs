use std::fmt;

use parking_lot::Mutex;

/// Handle to one slot of the worker recycle pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerSlot(pub(crate) usize);

impl WorkerSlot {
	pub const fn index(self) -> usize {
		self.0
	}
}

impl fmt::Display for WorkerSlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Recycle pool usage snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SlotStats {
	/// Slots ever allocated; the arena never shrinks.
	pub allocated: usize,
	/// Slots currently checked out by live workers.
	pub live: usize,
	/// Checkouts served from the free list instead of a fresh slot.
	pub reused: u64,
}

#[derive(Default)]
struct SlotArena {
	/// Incarnation count per slot.
	generations: Vec<u64>,
	free: Vec<usize>,
	reused: u64,
}

/// Free-list arena of worker slots shared by every worker of a pool.
///
/// Spawning checks a slot out (preferring the most recently freed one) and
/// termination returns it, so the arena only grows to the peak number of
/// simultaneously live workers.
#[derive(Default)]
pub(crate) struct WorkerSlots {
	inner: Mutex<SlotArena>,
}

impl WorkerSlots {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Checks out a slot and returns it with its incarnation number.
	pub(crate) fn checkout(&self) -> (WorkerSlot, u64) {
		let mut arena = self.inner.lock();
		if let Some(index) = arena.free.pop() {
			arena.reused += 1;
			arena.generations[index] += 1;
			return (WorkerSlot(index), arena.generations[index]);
		}
		arena.generations.push(0);
		(WorkerSlot(arena.generations.len() - 1), 0)
	}

	/// Returns a slot to the free list.
	pub(crate) fn release(&self, slot: WorkerSlot) {
		let mut arena = self.inner.lock();
		debug_assert!(slot.0 < arena.generations.len(), "slot {slot} was never checked out");
		debug_assert!(!arena.free.contains(&slot.0), "slot {slot} released twice");
		arena.free.push(slot.0);
	}

	pub(crate) fn stats(&self) -> SlotStats {
		let arena = self.inner.lock();
		SlotStats {
			allocated: arena.generations.len(),
			live: arena.generations.len() - arena.free.len(),
			reused: arena.reused,
		}
	}
}

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

use super::{SpinLock, SpinLockGuard};

/// One parked thread and its wake flag.
struct Waiter {
	thread: Thread,
	notified: AtomicBool,
}

impl Waiter {
	fn wake(&self) {
		self.notified.store(true, Ordering::Release);
		self.thread.unpark();
	}
}

/// Condition variable paired with a [`SpinLock`].
///
/// A waiter registers itself while still holding the caller's lock, so a
/// notification issued after the lock is released can never be lost. Waiters
/// are woken in FIFO order by [`notify_one`](Self::notify_one), or all at once
/// by [`notify_all`](Self::notify_all). There are no spurious returns from
/// [`wait`](Self::wait).
pub struct Condvar {
	waiters: SpinLock<VecDeque<Arc<Waiter>>>,
}

impl Condvar {
	/// Creates a condition variable with no waiters.
	pub const fn new() -> Self {
		Self {
			waiters: SpinLock::new(VecDeque::new()),
		}
	}

	/// Releases `guard`, parks until notified, then reacquires the same lock.
	pub fn wait<'a, T: ?Sized>(&self, guard: SpinLockGuard<'a, T>) -> SpinLockGuard<'a, T> {
		let waiter = Arc::new(Waiter {
			thread: thread::current(),
			notified: AtomicBool::new(false),
		});
		self.waiters.lock().push_back(Arc::clone(&waiter));

		let lock = SpinLockGuard::source(&guard);
		drop(guard);
		while !waiter.notified.load(Ordering::Acquire) {
			thread::park();
		}
		lock.lock()
	}

	/// Wakes the longest-parked waiter. Returns whether one was parked.
	pub fn notify_one(&self) -> bool {
		let next = self.waiters.lock().pop_front();
		match next {
			Some(waiter) => {
				waiter.wake();
				true
			}
			None => false,
		}
	}

	/// Wakes every parked waiter and returns how many there were.
	pub fn notify_all(&self) -> usize {
		let drained = std::mem::take(&mut *self.waiters.lock());
		for waiter in &drained {
			waiter.wake();
		}
		drained.len()
	}

	/// Returns the number of threads currently parked.
	pub fn waiters(&self) -> usize {
		self.waiters.lock().len()
	}
}

impl Default for Condvar {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Condvar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Condvar").field("waiters", &self.waiters()).finish()
	}
}

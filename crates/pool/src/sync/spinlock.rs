use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// Upper bound on the number of yields between two acquisition attempts.
const MAX_BACKOFF: u32 = 16;

/// Busy-wait mutual exclusion with bounded exponential backoff.
///
/// On contention the caller yields its time slice `backoff` times, doubling
/// `backoff` after every failed round until it reaches [`MAX_BACKOFF`], then
/// retries indefinitely. Acquisition never fails and is not reentrant.
///
/// Critical sections must stay short: counter reads, counter writes and the
/// decisions derived from them.
pub struct SpinLock<T: ?Sized> {
	locked: AtomicBool,
	data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by `locked`.
unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
// SAFETY: see above; the guard hands out `&mut T` to one thread at a time.
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
	/// Creates an unlocked spin lock.
	pub const fn new(value: T) -> Self {
		Self {
			locked: AtomicBool::new(false),
			data: UnsafeCell::new(value),
		}
	}

	/// Consumes the lock and returns the protected value.
	pub fn into_inner(self) -> T {
		self.data.into_inner()
	}
}

impl<T: ?Sized> SpinLock<T> {
	/// Acquires the lock, spinning until it is free.
	pub fn lock(&self) -> SpinLockGuard<'_, T> {
		let mut backoff = 1;
		while self.locked.compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed).is_err() {
			for _ in 0..backoff {
				std::thread::yield_now();
			}
			if backoff < MAX_BACKOFF {
				backoff <<= 1;
			}
		}
		SpinLockGuard::new(self)
	}

	/// Attempts a single acquisition without spinning.
	pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
		self.locked
			.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
			.ok()
			.map(|_| SpinLockGuard::new(self))
	}

	/// Returns whether some thread currently holds the lock.
	pub fn is_locked(&self) -> bool {
		self.locked.load(Ordering::Relaxed)
	}

	fn unlock(&self) {
		self.locked.store(false, Ordering::Release);
	}
}

impl<T: Default> Default for SpinLock<T> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

impl<T: ?Sized> fmt::Debug for SpinLock<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SpinLock").field("locked", &self.is_locked()).finish_non_exhaustive()
	}
}

/// RAII guard; the lock is released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinLockGuard<'a, T: ?Sized> {
	lock: &'a SpinLock<T>,
	_marker: PhantomData<&'a mut T>,
}

impl<'a, T: ?Sized> SpinLockGuard<'a, T> {
	fn new(lock: &'a SpinLock<T>) -> Self {
		Self { lock, _marker: PhantomData }
	}

	/// Returns the lock this guard holds.
	pub(crate) fn source(guard: &Self) -> &'a SpinLock<T> {
		guard.lock
	}
}

impl<T: ?Sized> Deref for SpinLockGuard<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		// SAFETY: the guard proves exclusive ownership of the lock.
		unsafe { &*self.lock.data.get() }
	}
}

impl<T: ?Sized> DerefMut for SpinLockGuard<'_, T> {
	fn deref_mut(&mut self) -> &mut T {
		// SAFETY: the guard proves exclusive ownership of the lock.
		unsafe { &mut *self.lock.data.get() }
	}
}

impl<T: ?Sized> Drop for SpinLockGuard<'_, T> {
	fn drop(&mut self) {
		self.lock.unlock();
	}
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SpinLockGuard<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

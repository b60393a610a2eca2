//! Low-level synchronization used by the pool gate.
//!
//! [`SpinLock`] guards short counter decisions; [`Condvar`] parks workers
//! against it and wakes them either one at a time or all at once.

mod condvar;
mod spinlock;

pub use condvar::Condvar;
pub use spinlock::{SpinLock, SpinLockGuard};

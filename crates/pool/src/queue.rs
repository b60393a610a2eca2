use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// Queue send error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueueSendError {
	/// Queue is closed.
	Closed,
	/// Queue is full and non-blocking send was used.
	Full,
}

struct QueueState<T> {
	items: VecDeque<T>,
	closed: bool,
}

/// Bounded multi-producer, multi-consumer FIFO with blocking backpressure.
///
/// Producers block in [`send`](Self::send) while the queue is at capacity;
/// nothing is ever dropped or reordered. Consumers only take items
/// non-blockingly. Closing happens under the queue lock, so no producer can
/// be half-way through an enqueue when the queue flips to closed; items
/// already queued stay receivable after close.
pub(crate) struct BoundedQueue<T> {
	capacity: usize,
	state: Mutex<QueueState<T>>,
	not_full: Condvar,
}

impl<T> BoundedQueue<T> {
	/// Creates an empty queue.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	pub(crate) fn new(capacity: usize) -> Self {
		assert!(capacity > 0, "queue capacity must be > 0");
		Self {
			capacity,
			state: Mutex::new(QueueState {
				items: VecDeque::new(),
				closed: false,
			}),
			not_full: Condvar::new(),
		}
	}

	/// Enqueues, waiting for capacity when full.
	pub(crate) fn send(&self, item: T) -> Result<(), QueueSendError> {
		let mut state = self.state.lock();
		loop {
			if state.closed {
				return Err(QueueSendError::Closed);
			}
			if state.items.len() < self.capacity {
				state.items.push_back(item);
				return Ok(());
			}
			self.not_full.wait(&mut state);
		}
	}

	/// Non-blocking enqueue.
	pub(crate) fn try_send(&self, item: T) -> Result<(), QueueSendError> {
		let mut state = self.state.lock();
		if state.closed {
			return Err(QueueSendError::Closed);
		}
		if state.items.len() >= self.capacity {
			return Err(QueueSendError::Full);
		}
		state.items.push_back(item);
		Ok(())
	}

	/// Takes the head item without waiting.
	pub(crate) fn try_recv(&self) -> Option<T> {
		let mut state = self.state.lock();
		let item = state.items.pop_front()?;
		drop(state);
		self.not_full.notify_one();
		Some(item)
	}

	/// Closes the queue and fails every blocked producer with `Closed`.
	pub(crate) fn close(&self) {
		let mut state = self.state.lock();
		state.closed = true;
		drop(state);
		self.not_full.notify_all();
	}

	pub(crate) fn len(&self) -> usize {
		self.state.lock().items.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.state.lock().items.is_empty()
	}

	pub(crate) fn capacity(&self) -> usize {
		self.capacity
	}
}

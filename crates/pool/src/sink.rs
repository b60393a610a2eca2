use std::any::Any;
use std::fmt;

use crate::slots::WorkerSlot;
use crate::tier::Tier;

/// Placeholder used when a panic payload is neither `&str` nor `String`.
const OPAQUE_PAYLOAD: &str = "<non-string panic payload>";

/// A task panic recovered at the worker boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPanic {
	pub pool: String,
	pub worker: WorkerSlot,
	pub tier: Tier,
	pub message: String,
}

impl fmt::Display for TaskPanic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} task panicked on {} worker {}: {}", self.tier, self.pool, self.worker, self.message)
	}
}

/// Receives recovered task panics. The pool calls it; delivery is up to the implementor.
pub trait FailureSink: Send + Sync {
	fn task_panicked(&self, panic: &TaskPanic);
}

impl<F> FailureSink for F
where
	F: Fn(&TaskPanic) + Send + Sync,
{
	fn task_panicked(&self, panic: &TaskPanic) {
		self(panic)
	}
}

/// Default sink: one `error` event per panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
	fn task_panicked(&self, panic: &TaskPanic) {
		tracing::error!(
			pool = %panic.pool,
			worker = panic.worker.index(),
			tier = panic.tier.as_str(),
			message = %panic.message,
			"pool.task.panic"
		);
	}
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		OPAQUE_PAYLOAD.to_string()
	}
}

//! Task dispatch: tier classification, enqueue, pending bookkeeping.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::error::{PoolError, Result};
use crate::pool::Shared;
use crate::queue::QueueSendError;
use crate::task::Task;
use crate::worker;

/// Behaviour when the target queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendMode {
	/// Wait for space.
	Blocking,
	/// Fail with [`PoolError::QueueFull`].
	NonBlocking,
}

/// Routes `task` to its tier queue.
///
/// `pending` is raised before the enqueue and rolled back if it fails, so a
/// worker finishing the task first can never drive it below zero.
pub(crate) fn dispatch(shared: &Arc<Shared>, task: Task, mode: SendMode) -> Result<()> {
	let (job, tier) = task.into_parts();
	let Some(job) = job else {
		return Ok(());
	};

	shared.pending.fetch_add(1, Ordering::AcqRel);
	let sent = match mode {
		SendMode::Blocking => shared.queues.send(tier, job),
		SendMode::NonBlocking => shared.queues.try_send(tier, job),
	};
	if let Err(err) = sent {
		shared.pending.fetch_sub(1, Ordering::AcqRel);
		tracing::trace!(pool = %shared.name, %tier, ?err, "pool.submit.rejected");
		return Err(match err {
			QueueSendError::Closed => PoolError::Closed,
			QueueSendError::Full => PoolError::QueueFull(tier),
		});
	}

	shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
	worker::ensure_running(shared);
	Ok(())
}

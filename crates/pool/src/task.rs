use std::fmt;

use crate::tier::Tier;

/// Boxed zero-argument callable executed by a worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work plus its raw priority tag.
///
/// Tasks are fire-and-forget: no identity, no deadline, no result channel.
/// A task without a callable is accepted and ignored.
#[derive(Default)]
pub struct Task {
	job: Option<Job>,
	priority: i32,
}

impl Task {
	/// Creates a common-tier task.
	pub fn new<F>(f: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		Self {
			job: Some(Box::new(f)),
			priority: 0,
		}
	}

	/// Creates a task with no callable.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Sets the raw priority tag.
	#[must_use]
	pub fn with_priority(mut self, priority: i32) -> Self {
		self.priority = priority;
		self
	}

	pub fn priority(&self) -> i32 {
		self.priority
	}

	/// Tier this task is routed to.
	pub fn tier(&self) -> Tier {
		Tier::from_priority(self.priority)
	}

	pub fn is_empty(&self) -> bool {
		self.job.is_none()
	}

	pub(crate) fn into_parts(self) -> (Option<Job>, Tier) {
		let tier = self.tier();
		(self.job, tier)
	}
}

impl fmt::Debug for Task {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task")
			.field("priority", &self.priority)
			.field("tier", &self.tier())
			.field("empty", &self.is_empty())
			.finish()
	}
}

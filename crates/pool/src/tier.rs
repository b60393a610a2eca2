use std::fmt;

use crate::queue::{BoundedQueue, QueueSendError};
use crate::task::Job;

/// Priority tag that routes to [`Tier::Urgent`].
pub const URGENT_PRIORITY: i32 = 3;
/// Priority tag that routes to [`Tier::Vip`].
pub const VIP_PRIORITY: i32 = 2;

/// The three fixed priority classes, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
	/// Served before everything else.
	Urgent,
	/// Served once the urgent queue is empty.
	Vip,
	/// Everything else, including unknown priority tags.
	Common,
}

impl Tier {
	/// All tiers in dequeue order.
	pub const ALL: [Tier; 3] = [Tier::Urgent, Tier::Vip, Tier::Common];

	/// Classifies a raw priority tag: `3` is urgent, `2` is vip, anything else is common.
	pub const fn from_priority(priority: i32) -> Self {
		match priority {
			URGENT_PRIORITY => Self::Urgent,
			VIP_PRIORITY => Self::Vip,
			_ => Self::Common,
		}
	}

	/// Canonical priority tag for this tier.
	pub const fn priority(self) -> i32 {
		match self {
			Self::Urgent => URGENT_PRIORITY,
			Self::Vip => VIP_PRIORITY,
			Self::Common => 0,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Urgent => "urgent",
			Self::Vip => "vip",
			Self::Common => "common",
		}
	}
}

impl From<i32> for Tier {
	fn from(priority: i32) -> Self {
		Self::from_priority(priority)
	}
}

impl fmt::Display for Tier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Per-tier queue depth snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierDepth {
	pub urgent: usize,
	pub vip: usize,
	pub common: usize,
}

impl TierDepth {
	pub fn total(&self) -> usize {
		self.urgent + self.vip + self.common
	}
}

/// Queue capacities for the three tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierCapacity {
	pub urgent: usize,
	pub vip: usize,
	pub common: usize,
}

/// The urgent, vip and common queues of one pool.
pub(crate) struct TierQueues {
	urgent: BoundedQueue<Job>,
	vip: BoundedQueue<Job>,
	common: BoundedQueue<Job>,
}

impl TierQueues {
	pub(crate) fn new(capacity: TierCapacity) -> Self {
		Self {
			urgent: BoundedQueue::new(capacity.urgent),
			vip: BoundedQueue::new(capacity.vip),
			common: BoundedQueue::new(capacity.common),
		}
	}

	fn queue(&self, tier: Tier) -> &BoundedQueue<Job> {
		match tier {
			Tier::Urgent => &self.urgent,
			Tier::Vip => &self.vip,
			Tier::Common => &self.common,
		}
	}

	/// Blocking enqueue onto `tier`.
	pub(crate) fn send(&self, tier: Tier, job: Job) -> Result<(), QueueSendError> {
		self.queue(tier).send(job)
	}

	/// Non-blocking enqueue onto `tier`.
	pub(crate) fn try_send(&self, tier: Tier, job: Job) -> Result<(), QueueSendError> {
		self.queue(tier).try_send(job)
	}

	/// Takes the next job in strict tier order: urgent, then vip, then common.
	///
	/// Every call starts again from the urgent queue.
	pub(crate) fn poll(&self) -> Option<(Tier, Job)> {
		Tier::ALL.into_iter().find_map(|tier| self.queue(tier).try_recv().map(|job| (tier, job)))
	}

	pub(crate) fn close(&self) {
		for tier in Tier::ALL {
			self.queue(tier).close();
		}
	}

	pub(crate) fn is_empty(&self) -> bool {
		Tier::ALL.into_iter().all(|tier| self.queue(tier).is_empty())
	}

	pub(crate) fn depth(&self) -> TierDepth {
		TierDepth {
			urgent: self.urgent.len(),
			vip: self.vip.len(),
			common: self.common.len(),
		}
	}

	pub(crate) fn capacity(&self) -> TierCapacity {
		TierCapacity {
			urgent: self.urgent.capacity(),
			vip: self.vip.capacity(),
			common: self.common.capacity(),
		}
	}
}

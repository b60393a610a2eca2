//! In-process sharding: several independent pools behind one round-robin
//! submit surface.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::pool::{Pool, PoolStats};
use crate::task::Task;

/// Shared routing cursor. Oblivious to shard load.
#[derive(Debug, Default)]
pub struct RoundRobin {
	cursor: AtomicUsize,
}

impl RoundRobin {
	pub const fn new() -> Self {
		Self {
			cursor: AtomicUsize::new(0),
		}
	}

	/// Advances the cursor and returns the next index in `0..len`, or `None`
	/// when there is nothing to route to.
	pub fn next(&self, len: usize) -> Option<usize> {
		if len == 0 {
			return None;
		}
		Some(self.cursor.fetch_add(1, Ordering::Relaxed) % len)
	}
}

/// Ordered set of pools fed round-robin.
///
/// With clustering disabled this wraps one pool built from the config as is.
/// Otherwise the config's `capacity` is split across
/// `ceil(capacity / node_capacity)` shards.
#[derive(Debug)]
pub struct Cluster {
	pools: Vec<Pool>,
	cursor: RoundRobin,
}

impl Cluster {
	pub fn new(config: PoolConfig) -> Result<Self> {
		config.validate()?;
		let pools = match config.shard_plan() {
			None => vec![Pool::new(config)?],
			Some(plan) => (0..plan.shards)
				.map(|index| Pool::new(config.shard(index, plan.capacity_each)))
				.collect::<Result<Vec<_>>>()?,
		};
		tracing::debug!(shards = pools.len(), "cluster.open");
		Ok(Self::from_pools(pools))
	}

	/// Wraps pools built elsewhere. An empty vector yields a cluster that
	/// rejects every submission with [`PoolError::NoPoolsAvailable`].
	pub fn from_pools(pools: Vec<Pool>) -> Self {
		Self {
			pools,
			cursor: RoundRobin::new(),
		}
	}

	pub fn shards(&self) -> &[Pool] {
		&self.pools
	}

	pub fn submit<F>(&self, f: F) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit_task(Task::new(f))
	}

	pub fn submit_with_priority<F>(&self, f: F, priority: i32) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit_task(Task::new(f).with_priority(priority))
	}

	/// Routes `task` to the next shard in cyclic order.
	pub fn submit_task(&self, task: Task) -> Result<()> {
		let index = self.cursor.next(self.pools.len()).ok_or(PoolError::NoPoolsAvailable)?;
		tracing::trace!(shard = index, tier = %task.tier(), "cluster.submit");
		self.pools[index].submit_task(task)
	}

	/// Closes every shard, last-built first.
	pub fn close(&self) {
		for pool in self.pools.iter().rev() {
			pool.close();
		}
	}

	/// Whether every shard is closed. An empty cluster counts as closed.
	pub fn is_closed(&self) -> bool {
		self.pools.iter().all(Pool::is_closed)
	}

	/// One snapshot per shard, in shard order.
	pub fn stats(&self) -> Vec<PoolStats> {
		self.pools.iter().map(Pool::stats).collect()
	}
}

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::admission::SpawnThrottle;
use crate::error::ConfigError;
use crate::sink::{FailureSink, TracingSink};
use crate::tier::TierCapacity;

pub const DEFAULT_COMMON_QUEUE: usize = 3_000_000;
pub const DEFAULT_VIP_QUEUE: usize = 1_000_000;
pub const DEFAULT_URGENT_QUEUE: usize = 500;
pub const DEFAULT_IDLE_BACKOFF_MS: u64 = 500;
pub const DEFAULT_POOL_NAME: &str = "strata";

/// What happens to a worker whose task panicked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicPolicy {
	/// The worker retires; capacity shrinks until admission control regrows it.
	#[default]
	RetireWorker,
	/// The worker keeps polling.
	KeepWorker,
}

/// Construction parameters for a [`Pool`](crate::Pool) or [`Cluster`](crate::Cluster).
///
/// Every field is optional when deserialized; zero queue sizes fall back to
/// the defaults.
///
/// ```toml
/// capacity = 64
/// urgent_queue = 50
/// idle_backoff_ms = 100
/// panic_policy = "keep_worker"
/// spawn_throttle = { mode = "lottery", threshold = 30000 }
/// ```
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
	/// Maximum concurrently active workers.
	pub capacity: usize,
	pub common_queue: usize,
	pub vip_queue: usize,
	pub urgent_queue: usize,
	/// Shard `capacity` across several pools.
	pub enable_cluster: bool,
	/// Per-shard capacity; required when `enable_cluster` is set.
	pub node_capacity: usize,
	/// Thread-name prefix and log field.
	pub name: String,
	/// Passive-backoff sleep while polling with live peers.
	pub idle_backoff_ms: u64,
	pub spawn_throttle: SpawnThrottle,
	pub panic_policy: PanicPolicy,
	#[serde(skip, default = "default_sink")]
	pub(crate) failure_sink: Arc<dyn FailureSink>,
}

fn default_sink() -> Arc<dyn FailureSink> {
	Arc::new(TracingSink)
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			capacity: 0,
			common_queue: 0,
			vip_queue: 0,
			urgent_queue: 0,
			enable_cluster: false,
			node_capacity: 0,
			name: DEFAULT_POOL_NAME.to_string(),
			idle_backoff_ms: DEFAULT_IDLE_BACKOFF_MS,
			spawn_throttle: SpawnThrottle::default(),
			panic_policy: PanicPolicy::default(),
			failure_sink: default_sink(),
		}
	}
}

impl fmt::Debug for PoolConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PoolConfig")
			.field("capacity", &self.capacity)
			.field("common_queue", &self.common_queue)
			.field("vip_queue", &self.vip_queue)
			.field("urgent_queue", &self.urgent_queue)
			.field("enable_cluster", &self.enable_cluster)
			.field("node_capacity", &self.node_capacity)
			.field("name", &self.name)
			.field("idle_backoff_ms", &self.idle_backoff_ms)
			.field("spawn_throttle", &self.spawn_throttle)
			.field("panic_policy", &self.panic_policy)
			.finish_non_exhaustive()
	}
}

/// How a clustered configuration splits into shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardPlan {
	pub shards: usize,
	pub capacity_each: usize,
}

impl PoolConfig {
	/// Creates a configuration with the given worker capacity and defaults elsewhere.
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			..Self::default()
		}
	}

	/// Parses and validates a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	#[must_use]
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	#[must_use]
	pub fn with_queue_sizes(mut self, urgent: usize, vip: usize, common: usize) -> Self {
		self.urgent_queue = urgent;
		self.vip_queue = vip;
		self.common_queue = common;
		self
	}

	/// Enables sharding with the given per-shard capacity.
	#[must_use]
	pub fn with_cluster(mut self, node_capacity: usize) -> Self {
		self.enable_cluster = true;
		self.node_capacity = node_capacity;
		self
	}

	/// Sets the idle backoff. Resolution is one millisecond; non-zero
	/// durations are rounded up.
	#[must_use]
	pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
		self.idle_backoff_ms = u64::try_from(backoff.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
		self
	}

	#[must_use]
	pub fn with_spawn_throttle(mut self, throttle: SpawnThrottle) -> Self {
		self.spawn_throttle = throttle;
		self
	}

	#[must_use]
	pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
		self.panic_policy = policy;
		self
	}

	/// Injects the sink that receives recovered task panics.
	#[must_use]
	pub fn with_failure_sink(mut self, sink: impl FailureSink + 'static) -> Self {
		self.failure_sink = Arc::new(sink);
		self
	}

	/// Checks the invariants construction relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.capacity == 0 {
			return Err(ConfigError::ZeroCapacity);
		}
		if self.enable_cluster && self.node_capacity == 0 {
			return Err(ConfigError::MissingNodeCapacity);
		}
		if self.idle_backoff_ms == 0 {
			return Err(ConfigError::ZeroIdleBackoff);
		}
		Ok(())
	}

	/// Queue sizes with zero entries replaced by the defaults.
	pub fn queue_capacity(&self) -> TierCapacity {
		fn or_default(size: usize, default: usize) -> usize {
			if size == 0 { default } else { size }
		}
		TierCapacity {
			urgent: or_default(self.urgent_queue, DEFAULT_URGENT_QUEUE),
			vip: or_default(self.vip_queue, DEFAULT_VIP_QUEUE),
			common: or_default(self.common_queue, DEFAULT_COMMON_QUEUE),
		}
	}

	pub fn idle_backoff(&self) -> Duration {
		Duration::from_millis(self.idle_backoff_ms)
	}

	/// Shard layout when clustering is enabled: `ceil(capacity / node_capacity)`
	/// shards sharing `capacity` evenly.
	pub fn shard_plan(&self) -> Option<ShardPlan> {
		if !self.enable_cluster || self.node_capacity == 0 || self.capacity == 0 {
			return None;
		}
		let shards = self.capacity.div_ceil(self.node_capacity);
		Some(ShardPlan {
			shards,
			capacity_each: self.capacity / shards,
		})
	}

	/// Per-shard configuration derived from this one.
	pub(crate) fn shard(&self, index: usize, capacity: usize) -> Self {
		Self {
			capacity,
			enable_cluster: false,
			node_capacity: 0,
			name: format!("{}-{index}", self.name),
			..self.clone()
		}
	}
}

//! Error types surfaced at the pool API boundary.

use thiserror::Error;

use crate::tier::Tier;

/// Errors returned by [`Pool`](crate::Pool) and [`Cluster`](crate::Cluster).
#[derive(Debug, Error)]
pub enum PoolError {
	/// The pool (or shard) no longer accepts submissions.
	#[error("pool is closed")]
	Closed,

	/// The cluster has no shards to route to.
	#[error("no pools available in the cluster")]
	NoPoolsAvailable,

	/// Non-blocking submit found the target queue at capacity.
	#[error("{0} queue is full")]
	QueueFull(Tier),

	/// Construction was given an invalid configuration.
	#[error("invalid configuration: {0}")]
	Config(#[from] ConfigError),

	/// The OS refused to start the seed worker thread.
	#[error("failed to start worker thread: {0}")]
	Spawn(#[from] std::io::Error),
}

/// Errors produced while loading or validating a [`PoolConfig`](crate::PoolConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// `capacity` must allow at least one worker.
	#[error("capacity must be at least 1")]
	ZeroCapacity,

	/// Clustering needs a per-shard capacity.
	#[error("node_capacity must be at least 1 when enable_cluster is set")]
	MissingNodeCapacity,

	/// The idle backoff must be a positive duration.
	#[error("idle_backoff_ms must be at least 1")]
	ZeroIdleBackoff,

	/// The configuration document could not be parsed.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Result type for pool operations.
pub type Result<T, E = PoolError> = std::result::Result<T, E>;

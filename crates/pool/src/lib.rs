//! Priority-tiered, self-scaling worker pool.
//!
//! A [`Pool`] runs fire-and-forget closures on OS threads. Each submission is
//! classified into one of three bounded queues ([`Tier`]); workers always
//! drain urgent before vip before common. The pool starts with one worker and
//! grows toward its capacity while backlog outpaces the running workers.
//! Surplus workers park on a spinlock-guarded condition variable or retire.
//!
//! A [`Cluster`] shards capacity over several independent pools and feeds
//! them round-robin.
//!
//! ```no_run
//! use strata_pool::{Pool, PoolConfig, URGENT_PRIORITY};
//!
//! let pool = Pool::new(PoolConfig::new(8).with_queue_sizes(50, 0, 0))?;
//! pool.submit(|| println!("common"))?;
//! pool.submit_with_priority(|| println!("urgent"), URGENT_PRIORITY)?;
//! pool.close();
//! # Ok::<(), strata_pool::PoolError>(())
//! ```

mod admission;
mod cluster;
mod config;
mod error;
mod pool;
mod queue;
mod scheduler;
mod sink;
mod slots;
pub mod sync;
mod task;
mod tier;
mod worker;

pub use admission::{DEFAULT_THROTTLE_THRESHOLD, SpawnThrottle};
pub use cluster::{Cluster, RoundRobin};
pub use config::{
	DEFAULT_COMMON_QUEUE, DEFAULT_IDLE_BACKOFF_MS, DEFAULT_POOL_NAME, DEFAULT_URGENT_QUEUE, DEFAULT_VIP_QUEUE, PanicPolicy, PoolConfig, ShardPlan,
};
pub use error::{ConfigError, PoolError, Result};
pub use pool::{Pool, PoolStats};
pub use sink::{FailureSink, TaskPanic, TracingSink};
pub use slots::WorkerSlot;
pub use task::{Job, Task};
pub use tier::{Tier, TierCapacity, TierDepth, URGENT_PRIORITY, VIP_PRIORITY};

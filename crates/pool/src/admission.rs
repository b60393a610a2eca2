//! Admission control: whether a dequeue should grow the pool or wake a
//! parked worker.

use rand::Rng;
use serde::Deserialize;

/// Running-worker count above which the spawn throttle engages.
pub const DEFAULT_THROTTLE_THRESHOLD: usize = 30_000;

/// Counter snapshot taken under the pool gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Load {
	pub running: usize,
	pub waiting: usize,
	pub pending: usize,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
	/// Start another worker from the recycle pool.
	Spawn,
	/// Wake exactly one parked worker.
	WakeOne,
	/// Leave the worker set as it is.
	Hold,
}

/// Decides how to react to backlog.
///
/// Spawning requires more pending tasks than runners, nobody parked, and
/// headroom below `capacity`. Parked workers are always preferred over new ones.
pub(crate) fn admit(load: Load, capacity: usize) -> Admission {
	if load.pending > load.running && load.waiting == 0 && load.running + load.waiting < capacity {
		Admission::Spawn
	} else if load.waiting > 0 {
		Admission::WakeOne
	} else {
		Admission::Hold
	}
}

/// Gate for the extra admission check performed under very high load.
///
/// The mandatory check runs once per dequeue regardless; the throttle only
/// decides whether a second one runs first.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpawnThrottle {
	/// Never run the extra check.
	Off,
	/// Above `threshold` running workers, run the extra check with
	/// probability `min(1, running / (capacity - running))`.
	Lottery { threshold: usize },
	/// Above `threshold` running workers, run the extra check with
	/// probability `(capacity - running) / capacity`.
	Damped { threshold: usize },
}

impl Default for SpawnThrottle {
	fn default() -> Self {
		Self::Lottery {
			threshold: DEFAULT_THROTTLE_THRESHOLD,
		}
	}
}

impl SpawnThrottle {
	/// Probability that the extra check runs at this load.
	pub fn probability(&self, running: usize, capacity: usize) -> f64 {
		let spare = capacity.saturating_sub(running);
		match *self {
			Self::Off => 0.0,
			Self::Lottery { threshold } => {
				if running <= threshold || spare == 0 {
					0.0
				} else {
					(running as f64 / spare as f64).min(1.0)
				}
			}
			Self::Damped { threshold } => {
				if running <= threshold || capacity == 0 {
					0.0
				} else {
					spare as f64 / capacity as f64
				}
			}
		}
	}

	/// Draws once against [`probability`](Self::probability).
	pub fn draw<R: Rng + ?Sized>(&self, running: usize, capacity: usize, rng: &mut R) -> bool {
		let p = self.probability(running, capacity);
		p > 0.0 && rng.gen_bool(p)
	}
}

use std::time::Duration;

use crate::session::step_race::DEFAULT_STOPPED_DRAIN_TIMEOUT;

/// Timing knobs for one adapter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSettings {
	/// How long a `stopped` event waits for outstanding stepping commands.
	pub stopped_drain_timeout: Duration,
	/// How long teardown waits for in-flight operations before `terminated`.
	pub settle_timeout: Duration,
}

impl Default for AdapterSettings {
	fn default() -> Self {
		Self {
			stopped_drain_timeout: DEFAULT_STOPPED_DRAIN_TIMEOUT,
			settle_timeout: Duration::from_millis(300),
		}
	}
}

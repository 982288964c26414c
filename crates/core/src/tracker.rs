//! Tracking of outstanding operations.
//!
//! An [`InFlightTracker`] is the "outstanding set" the step-race decorator
//! consults before forwarding a `stopped` event, and the set the terminate
//! sequence waits on. Entries are removed when their [`InFlightGuard`] is
//! dropped, so an operation that fails, succeeds or is cancelled always
//! leaves the set.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

#[derive(Default)]
struct TrackerInner {
	next_id: AtomicU64,
	outstanding: Mutex<HashMap<u64, String>>,
	changed: Notify,
}

/// Shared set of in-flight operations. Cloning shares the set.
#[derive(Clone, Default)]
pub struct InFlightTracker {
	inner: Arc<TrackerInner>,
}

impl InFlightTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an operation; it stays outstanding until the guard drops.
	pub fn begin(&self, label: impl Into<String>) -> InFlightGuard {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		let label = label.into();
		trace!(target: "cdap.tracker", id, label = %label, "operation started");
		self.inner.outstanding.lock().insert(id, label);
		self.inner.changed.notify_waiters();
		InFlightGuard {
			inner: Arc::clone(&self.inner),
			id,
		}
	}

	pub fn len(&self) -> usize {
		self.inner.outstanding.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.outstanding.lock().is_empty()
	}

	/// Labels of the operations currently outstanding, in no particular order.
	pub fn outstanding(&self) -> Vec<String> {
		self.inner.outstanding.lock().values().cloned().collect()
	}

	/// Resolves once the set is empty.
	///
	/// The set is re-read after every change, so operations registered while
	/// waiting extend the wait.
	pub async fn drained(&self) {
		loop {
			let notified = self.inner.changed.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			if self.is_empty() {
				return;
			}
			notified.await;
		}
	}

	/// Waits for [`drained`](Self::drained) up to `timeout`. Returns `true` if the set drained.
	pub async fn wait_drained(&self, timeout: Duration) -> bool {
		tokio::time::timeout(timeout, self.drained()).await.is_ok()
	}
}

impl std::fmt::Debug for InFlightTracker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InFlightTracker").field("outstanding", &self.outstanding()).finish()
	}
}

/// Keeps one operation registered in its tracker until dropped.
#[must_use = "the operation leaves the tracker as soon as the guard is dropped"]
pub struct InFlightGuard {
	inner: Arc<TrackerInner>,
	id: u64,
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		let removed = self.inner.outstanding.lock().remove(&self.id);
		trace!(target: "cdap.tracker", id = self.id, label = ?removed, "operation settled");
		self.inner.changed.notify_waiters();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guard_drop_removes_entry() {
		let tracker = InFlightTracker::new();
		let first = tracker.begin("next");
		let second = tracker.begin("continue");
		assert_eq!(tracker.len(), 2);

		drop(first);
		assert_eq!(tracker.outstanding(), vec!["continue".to_string()]);
		drop(second);
		assert!(tracker.is_empty());
	}

	#[tokio::test]
	async fn drained_resolves_immediately_when_empty() {
		let tracker = InFlightTracker::new();
		assert!(tracker.wait_drained(Duration::from_millis(1)).await);
	}

	#[tokio::test(start_paused = true)]
	async fn wait_drained_times_out_while_outstanding() {
		let tracker = InFlightTracker::new();
		let _guard = tracker.begin("pause");
		let started = tokio::time::Instant::now();
		assert!(!tracker.wait_drained(Duration::from_millis(300)).await);
		assert!(started.elapsed() >= Duration::from_millis(300));
	}

	#[tokio::test(start_paused = true)]
	async fn wait_extends_when_new_operations_arrive() {
		let tracker = InFlightTracker::new();
		let first = tracker.begin("next");

		let background = tracker.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(50)).await;
			let second = background.begin("stepIn");
			drop(first);
			tokio::time::sleep(Duration::from_millis(100)).await;
			drop(second);
		});

		let started = tokio::time::Instant::now();
		assert!(tracker.wait_drained(Duration::from_millis(300)).await);
		let elapsed = started.elapsed();
		assert!(elapsed >= Duration::from_millis(150), "drained too early: {elapsed:?}");
		assert!(elapsed < Duration::from_millis(300));
	}
}

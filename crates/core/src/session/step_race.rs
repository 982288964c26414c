//! Keeps `stopped` from overtaking the response to the step that caused it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdap_protocol::{Event, Request, Response, commands, events};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ForwardingSession, Session};
use crate::error::Result;
use crate::tracker::InFlightTracker;

/// Default bound on how long a `stopped` event waits for stepping commands.
pub const DEFAULT_STOPPED_DRAIN_TIMEOUT: Duration = Duration::from_millis(300);

/// Tracks stepping commands dispatched through it and withholds `stopped`
/// until they settle or the drain timeout elapses.
pub struct StepRaceSession {
	base: ForwardingSession,
	in_flight: InFlightTracker,
	drain_timeout: Duration,
}

impl StepRaceSession {
	pub fn new(inner: Arc<dyn Session>, in_flight: InFlightTracker, drain_timeout: Duration) -> Self {
		Self {
			base: ForwardingSession::new(inner),
			in_flight,
			drain_timeout,
		}
	}

	pub fn in_flight(&self) -> &InFlightTracker {
		&self.in_flight
	}
}

#[async_trait]
impl Session for StepRaceSession {
	async fn send_event(&self, event: Event) {
		if event.is(events::STOPPED) && !self.in_flight.is_empty() {
			debug!(target: "cdap.session", outstanding = ?self.in_flight.outstanding(), "stopped event waiting for stepping requests");
			if !self.in_flight.wait_drained(self.drain_timeout).await {
				warn!(
					target: "cdap.session",
					outstanding = ?self.in_flight.outstanding(),
					timeout_ms = self.drain_timeout.as_millis() as u64,
					"stepping requests still outstanding, sending stopped anyway"
				);
			}
		}
		self.base.send_event(event).await
	}

	async fn send_request(&self, command: &str, arguments: Value, timeout: Duration) -> Result<Response> {
		self.base.send_request(command, arguments, timeout).await
	}

	async fn dispatch_request(&self, request: Request) -> Result<Value> {
		if !commands::is_stepping_command(&request.command) {
			return self.base.dispatch_request(request).await;
		}
		let _guard = self.in_flight.begin(request.command.clone());
		self.base.dispatch_request(request).await
	}

	fn convert_client_line_to_debugger(&self, line: i64) -> i64 {
		self.base.convert_client_line_to_debugger(line)
	}

	fn convert_debugger_line_to_client(&self, line: i64) -> i64 {
		self.base.convert_debugger_line_to_client(line)
	}

	fn convert_client_column_to_debugger(&self, column: i64) -> i64 {
		self.base.convert_client_column_to_debugger(column)
	}

	fn convert_debugger_column_to_client(&self, column: i64) -> i64 {
		self.base.convert_debugger_column_to_client(column)
	}

	async fn shutdown(&self) {
		self.base.shutdown().await
	}
}

use std::sync::Arc;

use cdap_protocol::events::{self, OutputEventBody};
use cdap_protocol::{DisconnectArguments, Event};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{AdapterDependencies, Disconnected, Terminated};
use crate::configuration::{Scenario, SessionConfiguration, TerminatingReason};

/// Tearing down one connection attempt.
///
/// Only lives for the duration of the transition that created it.
pub struct Terminating {
	deps: Arc<AdapterDependencies>,
	configuration: Arc<SessionConfiguration>,
	reason: TerminatingReason,
}

impl Terminating {
	pub fn new(deps: Arc<AdapterDependencies>, configuration: Arc<SessionConfiguration>, reason: TerminatingReason) -> Self {
		Self { deps, configuration, reason }
	}

	/// Stops the debuggee, shuts the session down and tells the client.
	///
	/// Collaborator failures are logged; teardown always reaches [`Disconnected`].
	pub async fn disconnect(self, arguments: DisconnectArguments) -> Disconnected {
		info!(target: "cdap.state", reason = %self.reason, restart = ?arguments.restart, "terminating session");
		self.stop_debuggee().await;
		self.deps.session.shutdown().await;
		self.terminate_session(arguments.restart).await;
		Disconnected::new(&self.deps)
	}

	/// Releases collaborators without the client-facing sequence.
	pub async fn shutdown(self) -> Terminated {
		info!(target: "cdap.state", reason = %self.reason, "shutting down session");
		self.stop_debuggee().await;
		self.close_target().await;
		Terminated::enter(&self.deps).await
	}

	async fn stop_debuggee(&self) {
		if let Err(error) = self.deps.runner.stop().await {
			warn!(target: "cdap.state", error = %error, "failed to stop debuggee runner");
		}
		if self.configuration.scenario() == Scenario::Launch {
			if let Err(error) = self.deps.launcher.stop().await {
				warn!(target: "cdap.state", error = %error, "failed to stop launched debuggee");
			}
		}
	}

	async fn terminate_session(&self, restart: Option<bool>) {
		info!(target: "cdap.state", reason = %self.reason, "{}", self.reason.message());
		if self.reason == TerminatingReason::DisconnectedFromWebsocket {
			let body = OutputEventBody::console(format!("{}\n", self.reason.message()));
			self.deps.session.send_event(Event::new(events::OUTPUT, serde_json::to_value(body).ok())).await;
		}

		let settle = self.deps.settings.settle_timeout;
		if !self.deps.in_flight.wait_drained(settle).await {
			debug!(
				target: "cdap.state",
				outstanding = ?self.deps.in_flight.outstanding(),
				"operations still in flight at termination"
			);
		}

		// Only a noDebug session tells the client it terminated.
		if self.configuration.is_no_debug() {
			self.deps.session.send_event(Event::terminated(restart.map(Value::Bool))).await;
		}
		self.close_target().await;
	}

	async fn close_target(&self) {
		if !self.deps.target.is_attached() {
			return;
		}
		if let Err(error) = self.deps.target.close().await {
			warn!(target: "cdap.state", error = %error, "failed to close target connection");
		}
	}
}

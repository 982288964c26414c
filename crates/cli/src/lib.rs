//! The `cdap` binary's library half: framing, the connection loop and the
//! wiring of one adapter instance.

pub mod cli;
pub mod framing;
pub mod logging;
pub mod server;

use std::sync::Arc;

use cdap::protocol::ProtocolMessage;
use cdap::{
	AdapterDependencies, AdapterSettings, ClientConnection, CommandHandlerDeclarer, DebugAdapter, DebuggeeLauncher, DebuggeeRunner,
	InFlightTracker, InitializationOrderSession, RequestHandler, Session, StepRaceSession, TargetConnection,
};
use cdap_runtime::{ChildProcessLauncher, ChildProcessRunner, DebuggeeProcess, WebSocketTarget};
use tokio::sync::mpsc;

/// One wired adapter, ready for [`server::serve`].
pub struct Assembly {
	pub adapter: Arc<DebugAdapter>,
	pub client: Arc<ClientConnection>,
	/// Outermost session; inbound requests enter here.
	pub session: Arc<dyn Session>,
	pub outgoing: mpsc::UnboundedReceiver<ProtocolMessage>,
}

/// The launcher, runner and target connection an adapter drives.
pub struct Collaborators {
	pub launcher: Arc<dyn DebuggeeLauncher>,
	pub runner: Arc<dyn DebuggeeRunner>,
	pub target: Arc<dyn TargetConnection>,
}

impl Collaborators {
	/// Child-process launcher and runner sharing one process slot, over one websocket target.
	pub fn child_process() -> Self {
		let process = DebuggeeProcess::new();
		let target = Arc::new(WebSocketTarget::new());
		Self {
			launcher: Arc::new(ChildProcessLauncher::new(process.clone())),
			runner: Arc::new(ChildProcessRunner::new(process, target.clone())),
			target,
		}
	}
}

/// Wires an adapter over the child-process runtime.
pub fn assemble(settings: AdapterSettings) -> Assembly {
	assemble_with(settings, Collaborators::child_process(), Vec::new())
}

/// Wires `ClientConnection -> InitializationOrderSession -> StepRaceSession`,
/// the controller on top, and binds the controller as the request handler.
pub fn assemble_with(settings: AdapterSettings, collaborators: Collaborators, declarers: Vec<Arc<dyn CommandHandlerDeclarer>>) -> Assembly {
	let (client, outgoing) = ClientConnection::new();
	let client = Arc::new(client);
	let in_flight = InFlightTracker::new();

	let ordered: Arc<dyn Session> = Arc::new(InitializationOrderSession::new(client.clone()));
	let session: Arc<dyn Session> = Arc::new(StepRaceSession::new(ordered, in_flight.clone(), settings.stopped_drain_timeout));

	let Collaborators { launcher, runner, target } = collaborators;
	let deps = declarers.into_iter().fold(
		AdapterDependencies::new(session.clone(), launcher, runner, target)
			.with_in_flight(in_flight)
			.with_settings(settings),
		AdapterDependencies::with_declarer,
	);

	let adapter = DebugAdapter::new(deps);
	let handler: Arc<dyn RequestHandler> = adapter.clone();
	client.bind_handler(Arc::downgrade(&handler));

	Assembly {
		adapter,
		client,
		session,
		outgoing,
	}
}

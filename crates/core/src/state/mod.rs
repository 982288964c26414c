//! The session lifecycle state machine.
//!
//! ```text
//! Unconnected --launch/attach--> Connecting --connect--> Connected
//!      |                             |                      |
//!      |                             +--disconnect--+       +--disconnect / target closed
//!      |                                            v       v
//!      +--shutdown--> Terminated               Terminating --> Disconnected
//! ```
//!
//! `Terminating` is never installed as the current state: it is built and
//! run to `Disconnected` (or `Terminated`) inside the transition that
//! created it, so no request can observe it.
//!
//! Each state is its own struct and transitions consume it, so a state that
//! has been left cannot be used again. A transition that fails hands the
//! state back inside [`Rejected`].

mod connected;
mod connecting;
mod terminal;
mod terminating;
mod unconnected;

use std::fmt;
use std::sync::Arc;

use cdap_protocol::commands;
use serde_json::json;

pub use connected::Connected;
pub use connecting::{ConnectFailure, Connecting};
pub use terminal::{Disconnected, Terminated};
pub use terminating::Terminating;
pub use unconnected::{Unconnected, adapter_capabilities};

use crate::collaborators::{ArgumentsRewriter, DebuggeeLauncher, DebuggeeRunner, IdentityRewriter, TargetConnection};
use crate::dispatcher::{CommandDispatcher, CommandHandlerDeclaration, CommandHandlerDeclarer};
use crate::error::Error;
use crate::session::Session;
use crate::settings::AdapterSettings;
use crate::tracker::InFlightTracker;

/// Everything the states share across transitions.
pub struct AdapterDependencies {
	/// Outermost layer of the session chain.
	pub session: Arc<dyn Session>,
	pub launcher: Arc<dyn DebuggeeLauncher>,
	pub runner: Arc<dyn DebuggeeRunner>,
	pub target: Arc<dyn TargetConnection>,
	pub rewriter: Arc<dyn ArgumentsRewriter>,
	/// Business-logic declarers installed on top of the built-ins in Connected.
	pub declarers: Vec<Arc<dyn CommandHandlerDeclarer>>,
	/// Shared with the step-race decorator; teardown waits on it.
	pub in_flight: InFlightTracker,
	pub settings: AdapterSettings,
}

impl AdapterDependencies {
	pub fn new(
		session: Arc<dyn Session>,
		launcher: Arc<dyn DebuggeeLauncher>,
		runner: Arc<dyn DebuggeeRunner>,
		target: Arc<dyn TargetConnection>,
	) -> Self {
		Self {
			session,
			launcher,
			runner,
			target,
			rewriter: Arc::new(IdentityRewriter),
			declarers: Vec::new(),
			in_flight: InFlightTracker::new(),
			settings: AdapterSettings::default(),
		}
	}

	pub fn with_rewriter(mut self, rewriter: Arc<dyn ArgumentsRewriter>) -> Self {
		self.rewriter = rewriter;
		self
	}

	pub fn with_declarer(mut self, declarer: Arc<dyn CommandHandlerDeclarer>) -> Self {
		self.declarers.push(declarer);
		self
	}

	pub fn with_in_flight(mut self, in_flight: InFlightTracker) -> Self {
		self.in_flight = in_flight;
		self
	}

	pub fn with_settings(mut self, settings: AdapterSettings) -> Self {
		self.settings = settings;
		self
	}
}

/// A transition that did not happen: the unchanged state and the reason.
pub struct Rejected<S> {
	pub state: S,
	pub error: Error,
}

impl<S> Rejected<S> {
	pub fn new(state: S, error: Error) -> Self {
		Self { state, error }
	}
}

impl<S> fmt::Debug for Rejected<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Rejected").field("error", &self.error).finish_non_exhaustive()
	}
}

/// Handlers every state installs first.
///
/// `disconnect` shuts the session down; `initialize` is always a duplicate
/// here because only an uninitialized [`Unconnected`] accepts it.
pub(crate) fn base_declarations(session: &Arc<dyn Session>) -> Vec<CommandHandlerDeclaration> {
	let session = Arc::clone(session);
	vec![
		CommandHandlerDeclaration::new(commands::DISCONNECT, move |_| {
			let session = Arc::clone(&session);
			async move {
				session.shutdown().await;
				Ok(json!({}))
			}
		}),
		CommandHandlerDeclaration::new(commands::INITIALIZE, |_| async { Err(Error::AlreadyInitialized) }),
	]
}

/// The current state of a session.
pub enum AdapterState {
	Unconnected(Unconnected),
	Connecting(Connecting),
	Connected(Connected),
	Disconnected(Disconnected),
	Terminated(Terminated),
}

impl AdapterState {
	pub fn name(&self) -> &'static str {
		match self {
			AdapterState::Unconnected(_) => "Unconnected",
			AdapterState::Connecting(_) => "Connecting",
			AdapterState::Connected(_) => "Connected",
			AdapterState::Disconnected(_) => "Disconnected",
			AdapterState::Terminated(_) => "Terminated",
		}
	}

	/// The command table of this state.
	pub fn dispatcher(&self) -> Arc<CommandDispatcher> {
		let dispatcher = match self {
			AdapterState::Unconnected(state) => state.dispatcher(),
			AdapterState::Connecting(state) => state.dispatcher(),
			AdapterState::Connected(state) => state.dispatcher(),
			AdapterState::Disconnected(state) => state.dispatcher(),
			AdapterState::Terminated(state) => state.dispatcher(),
		};
		Arc::clone(dispatcher)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, AdapterState::Disconnected(_) | AdapterState::Terminated(_))
	}

	/// Ends the session without the client-facing terminate sequence.
	///
	/// Non-terminal states release their collaborators and become
	/// [`Terminated`]; terminal states are returned unchanged.
	pub async fn shutdown(self) -> AdapterState {
		match self {
			AdapterState::Unconnected(state) => AdapterState::Terminated(state.shutdown().await),
			AdapterState::Connecting(state) => AdapterState::Terminated(state.shutdown().await),
			AdapterState::Connected(state) => AdapterState::Terminated(state.shutdown().await),
			terminal @ (AdapterState::Disconnected(_) | AdapterState::Terminated(_)) => terminal,
		}
	}
}

impl fmt::Display for AdapterState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl fmt::Debug for AdapterState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "AdapterState::{}", self.name())
	}
}

//! The session controller: owns the current state and routes requests to it.
//!
//! Lifecycle commands (`initialize`, `launch`, `attach`, `disconnect`) take
//! the state out, run a typed transition and put the result back, so two
//! transitions never overlap. Every other command is served from the current
//! state's dispatcher after the state lock is released, so a slow handler
//! (a step waiting on the target) does not block the next request.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use cdap_protocol::{DisconnectArguments, InitializeRequestArguments, Request, commands};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::configuration::Scenario;
use crate::error::{Error, Result};
use crate::session::RequestHandler;
use crate::state::{AdapterDependencies, AdapterState, Connecting, Unconnected};

pub struct DebugAdapter {
	state: Mutex<Option<AdapterState>>,
	me: Weak<DebugAdapter>,
}

impl DebugAdapter {
	/// Starts a controller in [`Unconnected`].
	pub fn new(deps: AdapterDependencies) -> Arc<Self> {
		let initial = AdapterState::Unconnected(Unconnected::new(Arc::new(deps)));
		Arc::new_cyclic(|me| Self {
			state: Mutex::new(Some(initial)),
			me: me.clone(),
		})
	}

	/// Name of the current state.
	pub async fn state_name(&self) -> &'static str {
		self.state.lock().await.as_ref().map(AdapterState::name).unwrap_or("Transitioning")
	}

	/// Ends the session from whatever state it is in.
	pub async fn shutdown(&self) {
		let mut slot = self.state.lock().await;
		if let Some(state) = slot.take() {
			let from = state.name();
			let next = state.shutdown().await;
			info!(target: "cdap.adapter", from, to = next.name(), "adapter shut down");
			*slot = Some(next);
		}
	}

	async fn transition(&self, state: AdapterState, request: Request) -> (AdapterState, Result<Value>) {
		let command = request.command.as_str();
		match (state, command) {
			(AdapterState::Unconnected(state), commands::INITIALIZE) => {
				let arguments: InitializeRequestArguments = match parse_arguments(command, request.arguments) {
					Ok(arguments) => arguments,
					Err(error) => return (AdapterState::Unconnected(state), Err(error)),
				};
				match state.initialize(arguments) {
					Ok((state, capabilities)) => (AdapterState::Unconnected(state), serde_json::to_value(capabilities).map_err(Error::from)),
					Err(rejected) => (AdapterState::Unconnected(rejected.state), Err(rejected.error)),
				}
			}
			(AdapterState::Unconnected(state), commands::LAUNCH | commands::ATTACH) => {
				let started = if command == commands::LAUNCH {
					state.launch(request.arguments)
				} else {
					state.attach(request.arguments)
				};
				match started {
					Ok(connecting) => self.connect(connecting).await,
					Err(rejected) => (AdapterState::Unconnected(rejected.state), Err(rejected.error)),
				}
			}
			(AdapterState::Connecting(state), commands::DISCONNECT) => {
				let arguments = disconnect_arguments(request.arguments);
				(AdapterState::Disconnected(state.disconnect(arguments).await), Ok(Value::Null))
			}
			(AdapterState::Connected(state), commands::DISCONNECT) => {
				let arguments = disconnect_arguments(request.arguments);
				(AdapterState::Disconnected(state.disconnect(arguments).await), Ok(Value::Null))
			}
			(state, _) => {
				let dispatcher = state.dispatcher();
				let result = dispatcher.process_request(command, request.arguments).await;
				(state, result)
			}
		}
	}

	async fn connect(&self, connecting: Connecting) -> (AdapterState, Result<Value>) {
		let scenario: Scenario = connecting.configuration().scenario();
		match connecting.connect().await {
			Ok(connected) => {
				info!(target: "cdap.adapter", %scenario, "connected to target");
				let target = Arc::clone(connected.target());
				let me = self.me.clone();
				tokio::spawn(async move {
					target.closed().await;
					if let Some(adapter) = me.upgrade() {
						adapter.on_target_closed().await;
					}
				});
				(AdapterState::Connected(connected), Ok(Value::Null))
			}
			Err(failure) => {
				warn!(target: "cdap.adapter", %scenario, error = %failure.error, "connect failed");
				(AdapterState::Connecting(failure.state), Err(failure.error))
			}
		}
	}

	async fn on_target_closed(&self) {
		let mut slot = self.state.lock().await;
		match slot.take() {
			Some(AdapterState::Connected(connected)) => {
				warn!(target: "cdap.adapter", "target connection closed unexpectedly");
				*slot = Some(AdapterState::Disconnected(connected.target_closed().await));
			}
			other => {
				debug!(target: "cdap.adapter", state = ?other, "target closed after leaving Connected");
				*slot = other;
			}
		}
	}
}

fn is_lifecycle(state: &AdapterState, command: &str) -> bool {
	match state {
		AdapterState::Unconnected(state) => match command {
			commands::INITIALIZE => !state.is_initialized(),
			commands::LAUNCH | commands::ATTACH => true,
			_ => false,
		},
		AdapterState::Connecting(_) | AdapterState::Connected(_) => command == commands::DISCONNECT,
		AdapterState::Disconnected(_) | AdapterState::Terminated(_) => false,
	}
}

fn parse_arguments<T: DeserializeOwned + Default>(command: &str, arguments: Value) -> Result<T> {
	if arguments.is_null() {
		return Ok(T::default());
	}
	serde_json::from_value(arguments).map_err(|source| Error::InvalidArguments {
		command: command.to_string(),
		source,
	})
}

fn disconnect_arguments(arguments: Value) -> DisconnectArguments {
	parse_arguments(commands::DISCONNECT, arguments).unwrap_or_else(|error| {
		debug!(target: "cdap.adapter", error = %error, "ignoring malformed disconnect arguments");
		DisconnectArguments::default()
	})
}

#[async_trait]
impl RequestHandler for DebugAdapter {
	async fn handle_request(&self, request: Request) -> Result<Value> {
		let dispatcher = {
			let mut slot = self.state.lock().await;
			let current = slot.as_ref().ok_or_else(|| Error::Protocol("adapter state unavailable".into()))?;

			if is_lifecycle(current, &request.command) {
				let Some(state) = slot.take() else {
					return Err(Error::Protocol("adapter state unavailable".into()));
				};
				let from = state.name();
				let command = request.command.clone();
				let (next, result) = self.transition(state, request).await;
				if from != next.name() {
					info!(target: "cdap.adapter", %command, from, to = next.name(), "state transition");
				}
				*slot = Some(next);
				return result;
			}
			current.dispatcher()
		};

		debug!(target: "cdap.adapter", command = %request.command, state = dispatcher.state(), "request");
		dispatcher.process_request(&request.command, request.arguments).await
	}
}

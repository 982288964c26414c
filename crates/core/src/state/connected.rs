use std::sync::Arc;

use cdap_protocol::{DisconnectArguments, commands};
use serde_json::Value;

use super::{AdapterDependencies, Disconnected, Terminated, Terminating, base_declarations};
use crate::collaborators::{DebuggeeRunner, TargetConnection};
use crate::configuration::{SessionConfiguration, TerminatingReason};
use crate::dispatcher::{CommandDispatcher, CommandHandlerDeclaration, CommandHandlerDeclarer, StaticDeclarer};
use crate::error::{Error, Result};

/// Attached to a live target; business-logic commands are served here.
pub struct Connected {
	deps: Arc<AdapterDependencies>,
	configuration: Arc<SessionConfiguration>,
	target: Arc<dyn TargetConnection>,
	dispatcher: Arc<CommandDispatcher>,
}

impl Connected {
	pub(crate) async fn new(deps: Arc<AdapterDependencies>, configuration: Arc<SessionConfiguration>) -> Result<Self> {
		let mut declarers: Vec<Arc<dyn CommandHandlerDeclarer>> = vec![
			Arc::new(StaticDeclarer::new(base_declarations(&deps.session))),
			Arc::new(StaticDeclarer::new(builtin_declarations(&deps.runner))),
		];
		declarers.extend(deps.declarers.iter().cloned());

		let dispatcher = CommandDispatcher::new(declarers, "Connected");
		dispatcher.install().await?;

		Ok(Self {
			target: Arc::clone(&deps.target),
			deps,
			configuration,
			dispatcher: Arc::new(dispatcher),
		})
	}

	pub fn target(&self) -> &Arc<dyn TargetConnection> {
		&self.target
	}

	pub fn configuration(&self) -> &Arc<SessionConfiguration> {
		&self.configuration
	}

	pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
		&self.dispatcher
	}

	/// Client-requested end of the session.
	pub async fn disconnect(self, arguments: DisconnectArguments) -> Disconnected {
		self.terminating(TerminatingReason::ClientRequestedToDisconnect).disconnect(arguments).await
	}

	/// The target connection closed on its own.
	pub async fn target_closed(self) -> Disconnected {
		self.terminating(TerminatingReason::DisconnectedFromWebsocket)
			.disconnect(DisconnectArguments::default())
			.await
	}

	pub async fn shutdown(self) -> Terminated {
		self.terminating(TerminatingReason::ClientRequestedToDisconnect).shutdown().await
	}

	fn terminating(self, reason: TerminatingReason) -> Terminating {
		Terminating::new(self.deps, self.configuration, reason)
	}
}

fn builtin_declarations(runner: &Arc<dyn DebuggeeRunner>) -> Vec<CommandHandlerDeclaration> {
	let runner = Arc::clone(runner);
	vec![
		CommandHandlerDeclaration::new(commands::CONFIGURATION_DONE, move |_| {
			let runner = Arc::clone(&runner);
			async move {
				runner.run().await?;
				Ok(Value::Null)
			}
		}),
		unsupported(commands::SET_FUNCTION_BREAKPOINTS),
		unsupported(commands::SET_VARIABLE),
	]
}

fn unsupported(command: &'static str) -> CommandHandlerDeclaration {
	CommandHandlerDeclaration::new(command, move |_| async move { Err(Error::Unsupported { command: command.to_string() }) })
}

use std::sync::Arc;

use cdap_protocol::{Capabilities, InitializeRequestArguments};
use serde_json::Value;
use tracing::{debug, info};

use super::{AdapterDependencies, Connecting, Rejected, Terminated, base_declarations};
use crate::configuration::{Scenario, SessionConfiguration};
use crate::dispatcher::CommandDispatcher;
use crate::error::Error;

const NATIVE_PATH_FORMAT: &str = "path";

/// Capabilities reported in the `initialize` response.
pub fn adapter_capabilities() -> Capabilities {
	Capabilities {
		supports_configuration_done_request: true,
		supports_restart_frame: true,
		supports_exception_info_request: true,
		supports_loaded_sources_request: true,
		supports_function_breakpoints: false,
		supports_set_variable: false,
		supports_terminate_request: false,
	}
}

/// Before any connection attempt. Accepts `initialize` once, then `launch` or `attach`.
pub struct Unconnected {
	deps: Arc<AdapterDependencies>,
	client: Option<InitializeRequestArguments>,
	dispatcher: Arc<CommandDispatcher>,
}

impl Unconnected {
	pub fn new(deps: Arc<AdapterDependencies>) -> Self {
		let dispatcher = Arc::new(CommandDispatcher::from_declarations(base_declarations(&deps.session), "Unconnected"));
		Self {
			deps,
			client: None,
			dispatcher,
		}
	}

	pub fn is_initialized(&self) -> bool {
		self.client.is_some()
	}

	pub fn client(&self) -> Option<&InitializeRequestArguments> {
		self.client.as_ref()
	}

	pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
		&self.dispatcher
	}

	/// Records the client's capabilities and answers with ours.
	pub fn initialize(self, arguments: InitializeRequestArguments) -> Result<(Unconnected, Capabilities), Rejected<Unconnected>> {
		if self.is_initialized() {
			return Err(Rejected::new(self, Error::AlreadyInitialized));
		}
		info!(
			target: "cdap.state",
			client = ?arguments.client_id,
			adapter = ?arguments.adapter_id,
			path_format = ?arguments.path_format,
			"initialize"
		);
		let next = Unconnected {
			client: Some(arguments),
			..self
		};
		Ok((next, adapter_capabilities()))
	}

	pub fn launch(self, arguments: Value) -> Result<Connecting, Rejected<Unconnected>> {
		self.start(Scenario::Launch, arguments)
	}

	pub fn attach(self, arguments: Value) -> Result<Connecting, Rejected<Unconnected>> {
		self.start(Scenario::Attach, arguments)
	}

	fn start(self, scenario: Scenario, arguments: Value) -> Result<Connecting, Rejected<Unconnected>> {
		let path_format = self.client.as_ref().and_then(|client| client.path_format.as_deref()).unwrap_or(NATIVE_PATH_FORMAT);
		if path_format != NATIVE_PATH_FORMAT {
			let error = Error::UnsupportedPathFormat(path_format.to_string());
			return Err(Rejected::new(self, error));
		}

		let built = SessionConfiguration::build(scenario, arguments, self.deps.rewriter.as_ref());
		let configuration = match built {
			Ok(configuration) => configuration,
			Err(error) => return Err(Rejected::new(self, error)),
		};
		debug!(target: "cdap.state", %scenario, arguments = ?configuration.arguments(), "session configuration resolved");
		Ok(Connecting::new(self.deps, Arc::new(configuration)))
	}

	/// Ends the session before any connection attempt.
	pub async fn shutdown(self) -> Terminated {
		Terminated::enter(&self.deps).await
	}
}

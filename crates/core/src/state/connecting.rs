use std::sync::Arc;

use cdap_protocol::{DisconnectArguments, Event};
use tracing::{info, warn};

use super::{AdapterDependencies, Connected, Disconnected, Rejected, Terminated, Terminating, base_declarations};
use crate::collaborators::AttachTarget;
use crate::configuration::{Scenario, SessionConfiguration, TerminatingReason};
use crate::dispatcher::CommandDispatcher;
use crate::error::{Error, Result};

/// A failed `connect`; the session stays in [`Connecting`].
pub type ConnectFailure = Rejected<Connecting>;

/// Launching and/or attaching with a fixed configuration.
pub struct Connecting {
	deps: Arc<AdapterDependencies>,
	configuration: Arc<SessionConfiguration>,
	dispatcher: Arc<CommandDispatcher>,
}

impl Connecting {
	pub fn new(deps: Arc<AdapterDependencies>, configuration: Arc<SessionConfiguration>) -> Self {
		let dispatcher = Arc::new(CommandDispatcher::from_declarations(base_declarations(&deps.session), "Connecting"));
		Self {
			deps,
			configuration,
			dispatcher,
		}
	}

	pub fn configuration(&self) -> &Arc<SessionConfiguration> {
		&self.configuration
	}

	pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
		&self.dispatcher
	}

	/// Launches (for [`Scenario::Launch`]) and attaches, then announces `initialized`.
	pub async fn connect(self) -> std::result::Result<Connected, ConnectFailure> {
		let resolved = self.resolve_target().await;
		let target = match resolved {
			Ok(target) => target,
			Err(error) => return Err(Rejected::new(self, error)),
		};

		info!(
			target: "cdap.state",
			address = %target.address,
			port = target.port,
			url = ?target.url,
			timeout_ms = target.timeout.as_millis() as u64,
			"attaching to target"
		);
		let attached = self.deps.target.attach(target).await;
		if let Err(error) = attached {
			warn!(target: "cdap.state", error = %error, "attach failed");
			return Err(Rejected::new(self, Error::Attach(Box::new(error))));
		}

		let built = Connected::new(Arc::clone(&self.deps), Arc::clone(&self.configuration)).await;
		let connected = match built {
			Ok(connected) => connected,
			Err(error) => return Err(Rejected::new(self, error)),
		};
		self.deps.session.send_event(Event::initialized()).await;
		Ok(connected)
	}

	async fn resolve_target(&self) -> Result<AttachTarget> {
		let configuration = &self.configuration;
		let extra_channel_port = configuration.arguments().extra_crdp_channel_port;

		match configuration.scenario() {
			Scenario::Launch => {
				info!(target: "cdap.state", program = ?configuration.arguments().program, "launching debuggee");
				let launched = self.deps.launcher.launch(configuration.arguments()).await.map_err(|error| {
					warn!(target: "cdap.state", error = %error, "launch failed");
					Error::Launch(Box::new(error))
				})?;
				Ok(AttachTarget {
					address: launched.address,
					port: launched.port,
					url: launched.url,
					timeout: configuration.attach_timeout(),
					extra_channel_port,
				})
			}
			Scenario::Attach => Ok(AttachTarget {
				address: configuration.address().to_string(),
				port: configuration.port(),
				url: configuration.arguments().url.clone(),
				timeout: configuration.attach_timeout(),
				extra_channel_port,
			}),
		}
	}

	/// Gives up on connecting and tears down whatever was started.
	pub async fn disconnect(self, arguments: DisconnectArguments) -> Disconnected {
		Terminating::new(self.deps, self.configuration, TerminatingReason::ClientRequestedToDisconnect)
			.disconnect(arguments)
			.await
	}

	pub async fn shutdown(self) -> Terminated {
		Terminating::new(self.deps, self.configuration, TerminatingReason::ClientRequestedToDisconnect)
			.shutdown()
			.await
	}
}

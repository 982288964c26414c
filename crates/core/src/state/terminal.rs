use std::sync::Arc;

use tracing::debug;

use super::{AdapterDependencies, base_declarations};
use crate::dispatcher::CommandDispatcher;

/// After a completed teardown.
pub struct Disconnected {
	dispatcher: Arc<CommandDispatcher>,
}

impl Disconnected {
	pub(crate) fn new(deps: &AdapterDependencies) -> Self {
		debug!(target: "cdap.state", "session disconnected");
		Self {
			dispatcher: Arc::new(CommandDispatcher::from_declarations(base_declarations(&deps.session), "Disconnected")),
		}
	}

	pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
		&self.dispatcher
	}
}

/// After a direct shutdown that skipped the terminate sequence.
pub struct Terminated {
	dispatcher: Arc<CommandDispatcher>,
}

impl Terminated {
	pub(crate) async fn enter(deps: &AdapterDependencies) -> Self {
		deps.session.shutdown().await;
		debug!(target: "cdap.state", "session terminated");
		Self {
			dispatcher: Arc::new(CommandDispatcher::from_declarations(base_declarations(&deps.session), "Terminated")),
		}
	}

	pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
		&self.dispatcher
	}
}

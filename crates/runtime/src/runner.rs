//! Lets a debuggee paused by `--inspect-brk` start executing.

use std::sync::Arc;

use async_trait::async_trait;
use cdap::{DebuggeeRunner, TargetConnection};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::RuntimeError;
use crate::launcher::DebuggeeProcess;
use crate::process;
use crate::target::WebSocketTarget;

pub const RUN_IF_WAITING: &str = "Runtime.runIfWaitingForDebugger";

/// [`DebuggeeRunner`] for a child process reached through a [`WebSocketTarget`].
pub struct ChildProcessRunner {
	process: DebuggeeProcess,
	target: Arc<WebSocketTarget>,
}

impl ChildProcessRunner {
	pub fn new(process: DebuggeeProcess, target: Arc<WebSocketTarget>) -> Self {
		Self { process, target }
	}
}

#[async_trait]
impl DebuggeeRunner for ChildProcessRunner {
	async fn run(&self) -> cdap::Result<()> {
		if let Some(status) = self.process.exit_status() {
			return Err(RuntimeError::ExitedEarly { status: status.to_string() }.into());
		}
		if !self.target.is_attached() {
			debug!(target: "cdap.runtime", "no target attached, nothing to resume");
			return Ok(());
		}
		let frame = json!({ "id": self.target.next_message_id(), "method": RUN_IF_WAITING });
		self.target.send(&frame).await?;
		info!(target: "cdap.runtime", "debuggee released");
		Ok(())
	}

	async fn stop(&self) -> cdap::Result<()> {
		let Some(pid) = self.process.pid() else {
			return Ok(());
		};
		if process::pid_is_alive(pid) && !process::terminate(pid) {
			warn!(target: "cdap.runtime", pid, "could not signal debuggee");
		}
		Ok(())
	}
}

//! Spawns the debuggee with its inspector enabled and waits for the endpoint.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdap::{DebuggeeLauncher, LaunchResult};
use cdap_protocol::LaunchAttachArguments;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};
use crate::{probe, process};

const DEFAULT_RUNTIME: &str = "node";
const LOOPBACK: &str = "127.0.0.1";
const PROBE_INTERVAL: Duration = Duration::from_millis(200);
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// The launched debuggee, shared between the launcher and the runner.
#[derive(Clone, Default)]
pub struct DebuggeeProcess {
	child: Arc<Mutex<Option<Child>>>,
}

impl DebuggeeProcess {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn pid(&self) -> Option<u32> {
		self.child.lock().as_ref().and_then(Child::id)
	}

	/// Exit status if the process has exited, `None` while it runs or when nothing was launched.
	pub fn exit_status(&self) -> Option<ExitStatus> {
		self.child.lock().as_mut().and_then(|child| child.try_wait().ok().flatten())
	}

	pub fn is_launched(&self) -> bool {
		self.child.lock().is_some()
	}

	fn set(&self, child: Child) {
		*self.child.lock() = Some(child);
	}

	fn take(&self) -> Option<Child> {
		self.child.lock().take()
	}
}

/// Program and argument vector for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
	pub program: PathBuf,
	pub args: Vec<String>,
}

impl LaunchCommand {
	/// `runtimeExecutable runtimeArgs... --inspect-brk=<address>:<port> program args...`
	pub fn new(program: PathBuf, arguments: &LaunchAttachArguments, address: &str, port: u16) -> Self {
		let mut args = arguments.runtime_args.clone();
		args.push(format!("--inspect-brk={address}:{port}"));
		args.extend(arguments.program.iter().cloned());
		args.extend(arguments.args.iter().cloned());
		Self { program, args }
	}
}

/// Launches the debuggee as a child process.
pub struct ChildProcessLauncher {
	process: DebuggeeProcess,
}

impl ChildProcessLauncher {
	pub fn new(process: DebuggeeProcess) -> Self {
		Self { process }
	}

	fn resolve_runtime(arguments: &LaunchAttachArguments) -> Result<PathBuf> {
		let runtime = arguments.runtime_executable.as_deref().unwrap_or(DEFAULT_RUNTIME);
		let path = PathBuf::from(runtime);
		if path.components().count() > 1 {
			return Ok(path);
		}
		which::which(runtime).map_err(|_| RuntimeError::ExecutableNotFound(runtime.to_string()))
	}

	async fn spawn_and_probe(&self, arguments: &LaunchAttachArguments) -> Result<LaunchResult> {
		let address = arguments.address.clone().unwrap_or_else(|| LOOPBACK.to_string());
		let port = match arguments.port {
			Some(port) => {
				if !process::port_available(&address, port) {
					warn!(target: "cdap.runtime", %address, port, "inspector port already in use");
				}
				port
			}
			None => process::free_port(&address)?,
		};
		let command = LaunchCommand::new(Self::resolve_runtime(arguments)?, arguments, &address, port);
		info!(target: "cdap.runtime", program = %command.program.display(), args = ?command.args, "spawning debuggee");

		let mut cmd = Command::new(&command.program);
		cmd.args(&command.args).stdin(Stdio::null()).kill_on_drop(true);
		if let Some(cwd) = &arguments.cwd {
			cmd.current_dir(cwd);
		}
		cmd.envs(&arguments.env);
		#[cfg(unix)]
		cmd.process_group(0);

		let child = cmd.spawn().map_err(|source| RuntimeError::Spawn {
			program: command.program.display().to_string(),
			source,
		})?;
		self.process.set(child);

		let startup_timeout = arguments.timeout.map(Duration::from_millis).unwrap_or(DEFAULT_STARTUP_TIMEOUT);
		let info = self.wait_for_inspector(&address, port, startup_timeout).await?;
		debug!(target: "cdap.runtime", browser = ?info.browser, protocol = ?info.protocol_version, "inspector ready");

		Ok(LaunchResult {
			address,
			port,
			url: info.web_socket_debugger_url,
		})
	}

	async fn wait_for_inspector(&self, address: &str, port: u16, timeout: Duration) -> Result<probe::VersionInfo> {
		let deadline = Instant::now() + timeout;
		let mut last_error = "endpoint not reachable".to_string();

		loop {
			if let Some(status) = self.process.exit_status() {
				return Err(RuntimeError::ExitedEarly { status: status.to_string() });
			}

			match probe::fetch_version(address, port).await {
				Ok(info) => return Ok(info),
				Err(err) => last_error = err.to_string(),
			}

			if Instant::now() + PROBE_INTERVAL > deadline {
				return Err(RuntimeError::EndpointUnavailable {
					address: address.to_string(),
					port,
					last_error,
				});
			}
			tokio::time::sleep(PROBE_INTERVAL).await;
		}
	}
}

#[async_trait]
impl DebuggeeLauncher for ChildProcessLauncher {
	async fn launch(&self, arguments: &LaunchAttachArguments) -> cdap::Result<LaunchResult> {
		if self.process.is_launched() {
			warn!(target: "cdap.runtime", "a debuggee is already running, stopping it first");
			self.stop().await?;
		}
		Ok(self.spawn_and_probe(arguments).await?)
	}

	async fn stop(&self) -> cdap::Result<()> {
		let Some(mut child) = self.process.take() else {
			return Ok(());
		};
		if let Ok(Some(status)) = child.try_wait() {
			debug!(target: "cdap.runtime", %status, "debuggee already exited");
			return Ok(());
		}
		child.start_kill().map_err(RuntimeError::from)?;
		let status = child.wait().await.map_err(RuntimeError::from)?;
		info!(target: "cdap.runtime", %status, "debuggee stopped");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn command_puts_inspector_flag_between_runtime_and_program_args() {
		let arguments = LaunchAttachArguments {
			runtime_args: vec!["--enable-source-maps".into()],
			program: Some("/srv/app/index.js".into()),
			args: vec!["--port".into(), "8080".into()],
			..Default::default()
		};
		let command = LaunchCommand::new(PathBuf::from("/usr/bin/node"), &arguments, "127.0.0.1", 9230);
		assert_eq!(
			command.args,
			vec!["--enable-source-maps", "--inspect-brk=127.0.0.1:9230", "/srv/app/index.js", "--port", "8080"]
		);
	}

	#[test]
	fn explicit_runtime_path_is_used_as_is() {
		let arguments = LaunchAttachArguments {
			runtime_executable: Some("/opt/node/bin/node".into()),
			..Default::default()
		};
		assert_eq!(ChildProcessLauncher::resolve_runtime(&arguments).unwrap(), PathBuf::from("/opt/node/bin/node"));
	}

	#[test]
	fn unknown_runtime_is_reported() {
		let arguments = LaunchAttachArguments {
			runtime_executable: Some("definitely-not-a-real-runtime-xyz".into()),
			..Default::default()
		};
		assert!(matches!(ChildProcessLauncher::resolve_runtime(&arguments), Err(RuntimeError::ExecutableNotFound(_))));
	}
}

//! Debuggee process and inspector port helpers.

use std::net::TcpListener;

use tracing::debug;

/// Returns `true` when a process with `pid` appears alive.
pub fn pid_is_alive(pid: u32) -> bool {
	if pid == 0 {
		return false;
	}

	#[cfg(unix)]
	{
		if std::path::Path::new("/proc").join(pid.to_string()).exists() {
			return true;
		}
		std::process::Command::new("kill")
			.args(["-0", &pid.to_string()])
			.status()
			.map(|status| status.success())
			.unwrap_or(pid == std::process::id())
	}

	#[cfg(not(unix))]
	{
		pid == std::process::id()
	}
}

/// Returns `true` when `port` can be bound on `address`.
pub fn port_available(address: &str, port: u16) -> bool {
	TcpListener::bind((address, port)).is_ok()
}

/// Asks the OS for an unused port on `address`.
///
/// The port is released before returning, so another process may still take
/// it before the debuggee binds it.
pub fn free_port(address: &str) -> std::io::Result<u16> {
	let listener = TcpListener::bind((address, 0))?;
	Ok(listener.local_addr()?.port())
}

/// Asks `pid` to exit (`SIGTERM` on unix). Returns `false` when the signal could not be delivered.
pub fn terminate(pid: u32) -> bool {
	#[cfg(unix)]
	{
		match std::process::Command::new("kill").args(["-TERM", &pid.to_string()]).status() {
			Ok(status) if status.success() => true,
			Ok(_) => {
				debug!(target: "cdap.runtime", pid, "kill -TERM returned non-zero");
				false
			}
			Err(err) => {
				debug!(target: "cdap.runtime", pid, error = %err, "failed to run kill");
				false
			}
		}
	}

	#[cfg(windows)]
	{
		std::process::Command::new("taskkill")
			.args(["/PID", &pid.to_string()])
			.status()
			.map(|status| status.success())
			.unwrap_or_else(|err| {
				debug!(target: "cdap.runtime", pid, error = %err, "failed to run taskkill");
				false
			})
	}

	#[cfg(not(any(unix, windows)))]
	{
		debug!(target: "cdap.runtime", pid, "graceful termination unsupported on this platform");
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[cfg(unix)]
	#[test]
	fn current_process_is_alive() {
		assert!(pid_is_alive(std::process::id()));
	}

	#[test]
	fn pid_zero_is_never_alive() {
		assert!(!pid_is_alive(0));
	}

	#[test]
	fn bound_port_is_reported_unavailable() {
		let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
		let port = listener.local_addr().unwrap().port();
		assert!(!port_available("127.0.0.1", port));
		drop(listener);
		assert!(port_available("127.0.0.1", port));
	}

	#[test]
	fn free_port_is_bindable() {
		let port = free_port("127.0.0.1").unwrap();
		assert_ne!(port, 0);
		assert!(port_available("127.0.0.1", port));
	}

	#[cfg(unix)]
	#[test]
	fn terminate_stops_a_child() {
		let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
		assert!(terminate(child.id()));
		let status = child.wait().unwrap();
		assert!(!status.success());
	}
}

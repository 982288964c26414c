//! Launch/attach configuration, resolved once per connection attempt.

use std::fmt;
use std::time::Duration;

use cdap_protocol::{LaunchAttachArguments, commands};
use serde_json::Value;

use crate::collaborators::ArgumentsRewriter;
use crate::error::{Error, Result};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9229;
pub const DEFAULT_ATTACH_TIMEOUT: Duration = Duration::from_millis(10_000);

/// How the debuggee is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
	Launch,
	Attach,
}

impl Scenario {
	/// The DAP command that starts this scenario.
	pub fn command(self) -> &'static str {
		match self {
			Scenario::Launch => commands::LAUNCH,
			Scenario::Attach => commands::ATTACH,
		}
	}
}

impl fmt::Display for Scenario {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.command())
	}
}

/// Why a session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatingReason {
	DisconnectedFromWebsocket,
	ClientRequestedToDisconnect,
}

impl TerminatingReason {
	/// Message shown to the user.
	pub fn message(self) -> &'static str {
		match self {
			TerminatingReason::DisconnectedFromWebsocket => "Debugger lost the connection to the target",
			TerminatingReason::ClientRequestedToDisconnect => "Debugging session ended by the client",
		}
	}
}

impl fmt::Display for TerminatingReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			TerminatingReason::DisconnectedFromWebsocket => "disconnected-from-websocket",
			TerminatingReason::ClientRequestedToDisconnect => "client-requested-to-disconnect",
		};
		f.write_str(name)
	}
}

/// Read-only snapshot of the arguments a connection attempt runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfiguration {
	scenario: Scenario,
	arguments: LaunchAttachArguments,
	raw: Value,
}

impl SessionConfiguration {
	/// Runs the rewriter, parses the result and canonicalizes path mappings.
	pub fn build(scenario: Scenario, raw: Value, rewriter: &dyn ArgumentsRewriter) -> Result<Self> {
		let raw = match rewriter.update_arguments(scenario, raw)? {
			Value::Null => Value::Object(Default::default()),
			other => other,
		};
		let mut arguments: LaunchAttachArguments = serde_json::from_value(raw.clone()).map_err(|source| Error::InvalidArguments {
			command: scenario.command().to_string(),
			source,
		})?;
		for path in arguments.path_mapping.values_mut() {
			*path = canonicalize_path(path);
		}
		Ok(Self { scenario, arguments, raw })
	}

	pub fn scenario(&self) -> Scenario {
		self.scenario
	}

	pub fn arguments(&self) -> &LaunchAttachArguments {
		&self.arguments
	}

	/// Arguments as the client sent them, after rewriting.
	pub fn raw(&self) -> &Value {
		&self.raw
	}

	pub fn is_no_debug(&self) -> bool {
		self.arguments.no_debug
	}

	pub fn address(&self) -> &str {
		self.arguments.address.as_deref().unwrap_or(DEFAULT_ADDRESS)
	}

	pub fn port(&self) -> u16 {
		self.arguments.port.unwrap_or(DEFAULT_PORT)
	}

	pub fn attach_timeout(&self) -> Duration {
		self.arguments.timeout.map(Duration::from_millis).unwrap_or(DEFAULT_ATTACH_TIMEOUT)
	}
}

/// Lexically normalizes a local path: `/` separators, lowercase drive letter,
/// `.` and `..` resolved, no duplicate or trailing separators (a root stays).
///
/// Applying it twice gives the same result as applying it once.
pub fn canonicalize_path(path: &str) -> String {
	let unified = path.replace('\\', "/");

	let (prefix, rest) = split_root(&unified);
	let absolute = !prefix.is_empty();

	let mut segments: Vec<&str> = Vec::new();
	for segment in rest.split('/') {
		match segment {
			"" | "." => {}
			".." => match segments.last() {
				Some(&last) if last != ".." => {
					segments.pop();
				}
				// Cannot climb above a root.
				_ if absolute => {}
				_ => segments.push(".."),
			},
			other => segments.push(other),
		}
	}

	let joined = segments.join("/");
	match (prefix.as_str(), joined.is_empty()) {
		("", true) => ".".to_string(),
		("", false) => joined,
		(root, _) => format!("{root}{joined}"),
	}
}

/// Splits off `c:/`, `//` or `/`. The drive letter is lowercased.
fn split_root(path: &str) -> (String, &str) {
	let bytes = path.as_bytes();
	if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
		let drive = (bytes[0] as char).to_ascii_lowercase();
		return (format!("{drive}:/"), &path[2..]);
	}
	if path.starts_with("//") && !path.starts_with("///") {
		return ("//".to_string(), &path[2..]);
	}
	if path.starts_with('/') {
		return ("/".to_string(), path.trim_start_matches('/'));
	}
	(String::new(), path)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::collaborators::IdentityRewriter;

	#[test]
	fn canonicalizes_common_shapes() {
		let cases = [
			("/srv/app/", "/srv/app"),
			("/srv//app/./lib/../src", "/srv/app/src"),
			("C:\\Users\\dev\\project\\", "c:/Users/dev/project"),
			("D:/", "d:/"),
			("/", "/"),
			("/..", "/"),
			("a/b/../../..", ".."),
			("./", "."),
			("\\\\server\\share\\dir", "//server/share/dir"),
		];
		for (input, expected) in cases {
			assert_eq!(canonicalize_path(input), expected, "input {input:?}");
		}
	}

	#[test]
	fn canonicalization_is_idempotent() {
		for input in ["C:\\a\\..\\b\\", "/x/./y//z/", "../../a/./b", "//host/share/../x", "", "c:", "e:\\"] {
			let once = canonicalize_path(input);
			assert_eq!(canonicalize_path(&once), once, "input {input:?}");
		}
	}

	#[test]
	fn build_applies_rewriter_then_canonicalizes() {
		let rewriter = |scenario: Scenario, mut raw: Value| -> Result<Value> {
			assert_eq!(scenario, Scenario::Attach);
			raw["port"] = json!(9333);
			Ok(raw)
		};
		let configuration = SessionConfiguration::build(
			Scenario::Attach,
			json!({ "address": "10.0.0.2", "pathMapping": { "/app": "C:\\work\\app\\" } }),
			&rewriter,
		)
		.unwrap();

		assert_eq!(configuration.scenario(), Scenario::Attach);
		assert_eq!(configuration.port(), 9333);
		assert_eq!(configuration.address(), "10.0.0.2");
		assert_eq!(configuration.arguments().path_mapping["/app"], "c:/work/app");
		assert_eq!(configuration.raw()["port"], 9333);
	}

	#[test]
	fn defaults_apply_to_empty_arguments() {
		let configuration = SessionConfiguration::build(Scenario::Attach, Value::Null, &IdentityRewriter).unwrap();
		assert_eq!(configuration.address(), DEFAULT_ADDRESS);
		assert_eq!(configuration.port(), DEFAULT_PORT);
		assert_eq!(configuration.attach_timeout(), DEFAULT_ATTACH_TIMEOUT);
		assert!(!configuration.is_no_debug());
	}

	#[test]
	fn malformed_arguments_name_the_command() {
		let err = SessionConfiguration::build(Scenario::Launch, json!({ "port": "not-a-port" }), &IdentityRewriter).unwrap_err();
		assert!(err.to_string().contains("launch"));
	}

	#[test]
	fn rewriter_errors_propagate() {
		let rewriter = |_: Scenario, _: Value| -> Result<Value> { Err(Error::collaborator("rejected by policy")) };
		let err = SessionConfiguration::build(Scenario::Launch, json!({}), &rewriter).unwrap_err();
		assert_eq!(err.to_string(), "rejected by policy");
	}
}

//! Error type shared by the session, dispatcher and state machine.

use thiserror::Error;

/// Result alias used across the adapter core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the adapter core.
///
/// Every variant's `Display` text is what the client sees as the DAP
/// response `message`, so each one names the offending command or reason.
#[derive(Debug, Error)]
pub enum Error {
	/// The command is not valid in the current state.
	#[error("Unexpected request: {command} with arguments {arguments} while in state {state}")]
	UnexpectedRequest { command: String, arguments: String, state: String },

	/// `initialize` was sent more than once.
	#[error("The debug adapter is already initialized")]
	AlreadyInitialized,

	/// The command exists in DAP but this adapter does not implement it.
	#[error("The command {command} is not supported by this debug adapter")]
	Unsupported { command: String },

	/// The client asked for a `pathFormat` other than `"path"`.
	#[error("Unsupported path format '{0}': only native paths are supported")]
	UnsupportedPathFormat(String),

	/// Request arguments did not match the expected shape.
	#[error("Invalid arguments for {command}: {source}")]
	InvalidArguments {
		command: String,
		#[source]
		source: serde_json::Error,
	},

	/// Launching the debuggee failed.
	#[error("Failed to launch the debuggee: {0}")]
	Launch(#[source] Box<Error>),

	/// Attaching the target connection failed.
	#[error("Failed to attach to the target: {0}")]
	Attach(#[source] Box<Error>),

	/// An operation did not complete in time.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// The peer violated the protocol (unknown response, missing handler).
	#[error("Protocol error: {0}")]
	Protocol(String),

	/// The client session has been shut down.
	#[error("The client session is shut down")]
	SessionClosed,

	/// A correlation channel was dropped before completion.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Error reported by a launcher, runner, target connection or business-logic handler.
	#[error("{0}")]
	Collaborator(String),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Convenience constructor for collaborator failures.
	pub fn collaborator(message: impl Into<String>) -> Self {
		Error::Collaborator(message.into())
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}
}

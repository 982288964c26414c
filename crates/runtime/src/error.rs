use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("Could not find the runtime executable '{0}' on PATH")]
	ExecutableNotFound(String),

	#[error("Failed to start {program}: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("Debuggee exited before its inspector became available ({status})")]
	ExitedEarly { status: String },

	#[error("Inspector endpoint on {address}:{port} not available: {last_error}")]
	EndpointUnavailable { address: String, port: u16, last_error: String },

	#[error("No debuggable target found on {address}:{port}")]
	NoTarget { address: String, port: u16 },

	#[error("Could not attach to {address}:{port} within {timeout:?}: {last_error}")]
	AttachTimeout {
		address: String,
		port: u16,
		timeout: Duration,
		last_error: String,
	},

	#[error("Target connection is already attached")]
	AlreadyAttached,

	#[error("Target connection is not attached")]
	NotAttached,

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("WebSocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl From<RuntimeError> for cdap::Error {
	fn from(err: RuntimeError) -> Self {
		cdap::Error::Collaborator(err.to_string())
	}
}

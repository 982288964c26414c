//! Interfaces to the pieces the state machine drives but does not implement.

use std::time::Duration;

use async_trait::async_trait;
use cdap_protocol::LaunchAttachArguments;
use serde_json::Value;

use crate::configuration::Scenario;
use crate::error::Result;

/// Where a launched debuggee can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchResult {
	pub address: String,
	pub port: u16,
	pub url: Option<String>,
}

/// Everything the target connection needs to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachTarget {
	pub address: String,
	pub port: u16,
	pub url: Option<String>,
	pub timeout: Duration,
	pub extra_channel_port: Option<u16>,
}

/// Starts and stops the debuggee process.
#[async_trait]
pub trait DebuggeeLauncher: Send + Sync {
	async fn launch(&self, arguments: &LaunchAttachArguments) -> Result<LaunchResult>;
	async fn stop(&self) -> Result<()>;
}

/// Resumes the debuggee once configuration is done.
#[async_trait]
pub trait DebuggeeRunner: Send + Sync {
	async fn run(&self) -> Result<()>;
	async fn stop(&self) -> Result<()>;
}

/// The connection to the debuggee's CRDP endpoint.
#[async_trait]
pub trait TargetConnection: Send + Sync {
	async fn attach(&self, target: AttachTarget) -> Result<()>;
	async fn close(&self) -> Result<()>;
	fn is_attached(&self) -> bool;

	/// Resolves when the connection closes, whether or not we closed it.
	async fn closed(&self);
}

/// Hook to rewrite raw launch/attach arguments before they are interpreted.
pub trait ArgumentsRewriter: Send + Sync {
	fn update_arguments(&self, scenario: Scenario, arguments: Value) -> Result<Value>;
}

/// Leaves arguments unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRewriter;

impl ArgumentsRewriter for IdentityRewriter {
	fn update_arguments(&self, _scenario: Scenario, arguments: Value) -> Result<Value> {
		Ok(arguments)
	}
}

impl<F> ArgumentsRewriter for F
where
	F: Fn(Scenario, Value) -> Result<Value> + Send + Sync,
{
	fn update_arguments(&self, scenario: Scenario, arguments: Value) -> Result<Value> {
		self(scenario, arguments)
	}
}

//! The client-facing session transport and its decorators.
//!
//! The chain is assembled once at startup, innermost first:
//!
//! ```text
//! ClientConnection -> InitializationOrderSession -> StepRaceSession
//! ```
//!
//! Everything that talks to the client (states, business logic) holds the
//! outermost layer as an `Arc<dyn Session>`.

pub mod client;
pub mod init_order;
pub mod step_race;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdap_protocol::{Event, Request, Response};
use serde_json::Value;

pub use client::{ClientConnection, RequestHandler};
pub use init_order::InitializationOrderSession;
pub use step_race::StepRaceSession;

use crate::error::Result;

/// The channel to the DAP client.
#[async_trait]
pub trait Session: Send + Sync {
	/// Pushes an event to the client. Delivery may be deferred by decorators.
	async fn send_event(&self, event: Event);

	/// Sends a reverse request to the client and waits for its response.
	async fn send_request(&self, command: &str, arguments: Value, timeout: Duration) -> Result<Response>;

	/// Routes an inbound client request to the adapter and returns the response body.
	async fn dispatch_request(&self, request: Request) -> Result<Value>;

	fn convert_client_line_to_debugger(&self, line: i64) -> i64;
	fn convert_debugger_line_to_client(&self, line: i64) -> i64;
	fn convert_client_column_to_debugger(&self, column: i64) -> i64;
	fn convert_debugger_column_to_client(&self, column: i64) -> i64;

	/// Ends the session. Idempotent.
	async fn shutdown(&self);
}

/// Identity decorator: forwards every call to the wrapped session.
///
/// Concrete decorators embed one and override only the calls they alter.
#[derive(Clone)]
pub struct ForwardingSession {
	inner: Arc<dyn Session>,
}

impl ForwardingSession {
	pub fn new(inner: Arc<dyn Session>) -> Self {
		Self { inner }
	}
}

#[async_trait]
impl Session for ForwardingSession {
	async fn send_event(&self, event: Event) {
		self.inner.send_event(event).await
	}

	async fn send_request(&self, command: &str, arguments: Value, timeout: Duration) -> Result<Response> {
		self.inner.send_request(command, arguments, timeout).await
	}

	async fn dispatch_request(&self, request: Request) -> Result<Value> {
		self.inner.dispatch_request(request).await
	}

	fn convert_client_line_to_debugger(&self, line: i64) -> i64 {
		self.inner.convert_client_line_to_debugger(line)
	}

	fn convert_debugger_line_to_client(&self, line: i64) -> i64 {
		self.inner.convert_debugger_line_to_client(line)
	}

	fn convert_client_column_to_debugger(&self, column: i64) -> i64 {
		self.inner.convert_client_column_to_debugger(column)
	}

	fn convert_debugger_column_to_client(&self, column: i64) -> i64 {
		self.inner.convert_debugger_column_to_client(column)
	}

	async fn shutdown(&self) {
		self.inner.shutdown().await
	}
}

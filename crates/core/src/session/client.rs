//! Innermost session: the DAP client connection.
//!
//! # Message Flow
//!
//! 1. Outgoing events, responses and reverse requests get the next `seq`
//!    and are pushed onto an unbounded channel drained by the framed writer
//! 2. A reverse request parks a oneshot sender keyed by its `seq`
//! 3. The reader hands every inbound response to [`ClientConnection::handle_response`],
//!    which completes the matching oneshot
//! 4. Inbound requests go through the decorator chain to
//!    [`Session::dispatch_request`], which calls the bound [`RequestHandler`]
//!    and queues the response before returning

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use cdap_protocol::{Event, InitializeRequestArguments, ProtocolMessage, Request, Response, commands};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace, warn};

use super::Session;
use crate::error::{Error, Result};

/// Receives client requests once they have passed through the decorator chain.
#[async_trait]
pub trait RequestHandler: Send + Sync {
	async fn handle_request(&self, request: Request) -> Result<Value>;
}

/// Line/column units announced by the client in `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumnConventions {
	pub lines_start_at1: bool,
	pub columns_start_at1: bool,
}

impl Default for LineColumnConventions {
	fn default() -> Self {
		Self {
			lines_start_at1: true,
			columns_start_at1: true,
		}
	}
}

/// The client-facing end of the session chain.
///
/// The debugger side uses 0-based lines and columns.
pub struct ClientConnection {
	next_seq: AtomicI64,
	outgoing: Mutex<Option<mpsc::UnboundedSender<ProtocolMessage>>>,
	pending: Mutex<HashMap<i64, oneshot::Sender<Response>>>,
	handler: RwLock<Option<Weak<dyn RequestHandler>>>,
	client: OnceLock<InitializeRequestArguments>,
	shutdown: watch::Sender<bool>,
}

impl ClientConnection {
	/// Creates the connection and the receiver the framed writer drains.
	pub fn new() -> (Self, mpsc::UnboundedReceiver<ProtocolMessage>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let (shutdown, _) = watch::channel(false);
		let connection = Self {
			next_seq: AtomicI64::new(1),
			outgoing: Mutex::new(Some(tx)),
			pending: Mutex::new(HashMap::new()),
			handler: RwLock::new(None),
			client: OnceLock::new(),
			shutdown,
		};
		(connection, rx)
	}

	/// Binds the request handler. Held weakly; the controller owns the session chain.
	pub fn bind_handler(&self, handler: Weak<dyn RequestHandler>) {
		*self.handler.write() = Some(handler);
	}

	/// Client arguments from the first `initialize`, if one was seen.
	pub fn client_arguments(&self) -> Option<&InitializeRequestArguments> {
		self.client.get()
	}

	fn conventions(&self) -> LineColumnConventions {
		self.client
			.get()
			.map(|args| LineColumnConventions {
				lines_start_at1: args.lines_start_at1,
				columns_start_at1: args.columns_start_at1,
			})
			.unwrap_or_default()
	}

	fn next_seq(&self) -> i64 {
		self.next_seq.fetch_add(1, Ordering::SeqCst)
	}

	fn push(&self, message: ProtocolMessage) -> Result<()> {
		let outgoing = self.outgoing.lock();
		let Some(tx) = outgoing.as_ref() else {
			debug!(target: "cdap.session", seq = message.seq(), "outgoing channel closed, dropping message");
			return Err(Error::SessionClosed);
		};
		tx.send(message).map_err(|_| Error::ChannelClosed)
	}

	/// Writes the response for `request` built from the handler's result.
	pub fn respond(&self, request: &Request, result: &Result<Value>) {
		let mut response = match result {
			Ok(body) => Response::success(request, body.clone()),
			Err(err) => {
				debug!(target: "cdap.session", command = %request.command, error = %err, "request failed");
				Response::error(request, err.to_string())
			}
		};
		response.seq = self.next_seq();
		if let Err(err) = self.push(ProtocolMessage::Response(response)) {
			warn!(target: "cdap.session", command = %request.command, error = %err, "failed to write response");
		}
	}

	/// Completes the reverse request `response` answers.
	pub fn handle_response(&self, response: Response) -> Result<()> {
		let sender = self.pending.lock().remove(&response.request_seq);
		match sender {
			Some(sender) => {
				// Receiver may already have timed out.
				let _ = sender.send(response);
				Ok(())
			}
			None => Err(Error::Protocol(format!(
				"response for unknown request seq {} ({})",
				response.request_seq, response.command
			))),
		}
	}

	pub fn is_shut_down(&self) -> bool {
		*self.shutdown.borrow()
	}

	/// Resolves once [`Session::shutdown`] has been called.
	pub async fn closed(&self) {
		let mut rx = self.shutdown.subscribe();
		// The sender lives in self, so wait_for only fails if self is gone.
		let _ = rx.wait_for(|closed| *closed).await;
	}

	/// Closes the outgoing channel so the writer can drain and exit.
	pub fn close_outgoing(&self) {
		if self.outgoing.lock().take().is_some() {
			debug!(target: "cdap.session", "outgoing channel closed");
		}
	}
}

#[async_trait]
impl Session for ClientConnection {
	async fn send_event(&self, mut event: Event) {
		event.seq = self.next_seq();
		trace!(target: "cdap.session", event = %event.event, seq = event.seq, "send event");
		if let Err(err) = self.push(ProtocolMessage::Event(event)) {
			debug!(target: "cdap.session", error = %err, "event not delivered");
		}
	}

	async fn send_request(&self, command: &str, arguments: Value, timeout: Duration) -> Result<Response> {
		if self.is_shut_down() {
			return Err(Error::SessionClosed);
		}

		let seq = self.next_seq();
		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(seq, tx);

		let request = Request {
			seq,
			command: command.to_string(),
			arguments,
		};
		if let Err(err) = self.push(ProtocolMessage::Request(request)) {
			self.pending.lock().remove(&seq);
			return Err(err);
		}

		match tokio::time::timeout(timeout, rx).await {
			Ok(Ok(response)) => Ok(response),
			Ok(Err(_)) => Err(Error::ChannelClosed),
			Err(_) => {
				self.pending.lock().remove(&seq);
				Err(Error::Timeout(format!("reverse request {command} got no response within {timeout:?}")))
			}
		}
	}

	async fn dispatch_request(&self, request: Request) -> Result<Value> {
		if request.command == commands::INITIALIZE && self.client.get().is_none() {
			if let Ok(args) = serde_json::from_value::<InitializeRequestArguments>(request.arguments.clone()) {
				debug!(
					target: "cdap.session",
					adapter_id = ?args.adapter_id,
					lines_start_at1 = args.lines_start_at1,
					columns_start_at1 = args.columns_start_at1,
					"client capabilities recorded"
				);
				let _ = self.client.set(args);
			}
		}

		let header = Request {
			seq: request.seq,
			command: request.command.clone(),
			arguments: Value::Null,
		};
		let handler = self.handler.read().as_ref().and_then(Weak::upgrade);
		let result = match handler {
			Some(handler) => handler.handle_request(request).await,
			None => Err(Error::Protocol("no request handler bound".into())),
		};
		// Written before returning so outer layers only see the request settle
		// once its response is queued.
		self.respond(&header, &result);
		result
	}

	fn convert_client_line_to_debugger(&self, line: i64) -> i64 {
		if self.conventions().lines_start_at1 { line - 1 } else { line }
	}

	fn convert_debugger_line_to_client(&self, line: i64) -> i64 {
		if self.conventions().lines_start_at1 { line + 1 } else { line }
	}

	fn convert_client_column_to_debugger(&self, column: i64) -> i64 {
		if self.conventions().columns_start_at1 { column - 1 } else { column }
	}

	fn convert_debugger_column_to_client(&self, column: i64) -> i64 {
		if self.conventions().columns_start_at1 { column + 1 } else { column }
	}

	async fn shutdown(&self) {
		if self.shutdown.send_replace(true) {
			return;
		}
		debug!(target: "cdap.session", "client session shut down");
		// Dropping the senders fails every parked reverse request with ChannelClosed.
		self.pending.lock().clear();
	}
}

//! DAP message envelopes.
//!
//! Every message on the wire carries a `seq` and a `type` discriminator:
//! ```json
//! { "seq": 3, "type": "request", "command": "next", "arguments": { "threadId": 1 } }
//! { "seq": 9, "type": "response", "request_seq": 3, "success": true, "command": "next" }
//! { "seq": 10, "type": "event", "event": "stopped", "body": { "reason": "step" } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events;

/// Discriminated union of DAP messages, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
	Request(Request),
	Response(Response),
	Event(Event),
}

impl ProtocolMessage {
	/// Sequence number of the message regardless of its kind.
	pub fn seq(&self) -> i64 {
		match self {
			ProtocolMessage::Request(request) => request.seq,
			ProtocolMessage::Response(response) => response.seq,
			ProtocolMessage::Event(event) => event.seq,
		}
	}
}

/// A client or reverse request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	pub seq: i64,
	pub command: String,
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub arguments: Value,
}

impl Request {
	pub fn new(command: impl Into<String>, arguments: Value) -> Self {
		Self {
			seq: 0,
			command: command.into(),
			arguments,
		}
	}
}

/// Response to a [`Request`], correlated by `request_seq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	pub seq: i64,
	pub request_seq: i64,
	pub success: bool,
	pub command: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<Value>,
}

impl Response {
	/// Successful response to `request`. A `null` body is omitted.
	pub fn success(request: &Request, body: Value) -> Self {
		Self {
			seq: 0,
			request_seq: request.seq,
			success: true,
			command: request.command.clone(),
			message: None,
			body: (!body.is_null()).then_some(body),
		}
	}

	/// Failed response to `request` carrying a human-readable `message`.
	pub fn error(request: &Request, message: impl Into<String>) -> Self {
		Self {
			seq: 0,
			request_seq: request.seq,
			success: false,
			command: request.command.clone(),
			message: Some(message.into()),
			body: None,
		}
	}
}

/// An event pushed to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub seq: i64,
	pub event: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<Value>,
}

impl Event {
	pub fn new(event: impl Into<String>, body: Option<Value>) -> Self {
		Self {
			seq: 0,
			event: event.into(),
			body,
		}
	}

	/// The one-time readiness signal.
	pub fn initialized() -> Self {
		Self::new(events::INITIALIZED, None)
	}

	/// Session end notification. `restart` is echoed back to the client when present.
	pub fn terminated(restart: Option<Value>) -> Self {
		let body = restart.map(|restart| serde_json::json!({ "restart": restart }));
		Self::new(events::TERMINATED, body)
	}

	/// Returns `true` when this event is named `name`.
	pub fn is(&self, name: &str) -> bool {
		self.event == name
	}
}

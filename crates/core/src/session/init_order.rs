//! Holds back events until the client has seen `initialized`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdap_protocol::{Event, Request, Response, events};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::{ForwardingSession, Session};
use crate::error::Result;

#[derive(Default)]
struct OrderState {
	initialized_sent: bool,
	pending: Vec<Event>,
}

/// Buffers every event sent before `initialized`, then flushes them in
/// arrival order right after it. Nothing is dropped.
pub struct InitializationOrderSession {
	base: ForwardingSession,
	state: Mutex<OrderState>,
}

impl InitializationOrderSession {
	pub fn new(inner: Arc<dyn Session>) -> Self {
		Self {
			base: ForwardingSession::new(inner),
			state: Mutex::new(OrderState::default()),
		}
	}
}

#[async_trait]
impl Session for InitializationOrderSession {
	async fn send_event(&self, event: Event) {
		// Held across forwarding so concurrent senders cannot overtake the flush.
		let mut state = self.state.lock().await;

		if state.initialized_sent {
			self.base.send_event(event).await;
			return;
		}

		if !event.is(events::INITIALIZED) {
			debug!(target: "cdap.session", event = %event.event, "event held until initialized");
			state.pending.push(event);
			return;
		}

		self.base.send_event(event).await;
		state.initialized_sent = true;
		let pending = std::mem::take(&mut state.pending);
		if !pending.is_empty() {
			debug!(target: "cdap.session", count = pending.len(), "flushing held events");
		}
		for event in pending {
			self.base.send_event(event).await;
		}
	}

	async fn send_request(&self, command: &str, arguments: Value, timeout: Duration) -> Result<Response> {
		self.base.send_request(command, arguments, timeout).await
	}

	async fn dispatch_request(&self, request: Request) -> Result<Value> {
		self.base.dispatch_request(request).await
	}

	fn convert_client_line_to_debugger(&self, line: i64) -> i64 {
		self.base.convert_client_line_to_debugger(line)
	}

	fn convert_debugger_line_to_client(&self, line: i64) -> i64 {
		self.base.convert_debugger_line_to_client(line)
	}

	fn convert_client_column_to_debugger(&self, column: i64) -> i64 {
		self.base.convert_client_column_to_debugger(column)
	}

	fn convert_debugger_column_to_client(&self, column: i64) -> i64 {
		self.base.convert_debugger_column_to_client(column)
	}

	async fn shutdown(&self) {
		self.base.shutdown().await
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::session::testing::RecordingSession;

	fn output(text: &str) -> Event {
		Event::new(events::OUTPUT, Some(json!({ "category": "console", "output": text })))
	}

	#[tokio::test]
	async fn events_before_initialized_are_held_and_flushed_in_order() {
		let inner = RecordingSession::new();
		let session = InitializationOrderSession::new(inner.clone());

		session.send_event(output("a")).await;
		session.send_event(Event::new(events::STOPPED, Some(json!({ "reason": "entry" })))).await;
		assert!(inner.event_names().is_empty());

		session.send_event(Event::initialized()).await;
		session.send_event(output("b")).await;

		assert_eq!(inner.event_names(), vec!["initialized", "output", "stopped", "output"]);
		let outputs: Vec<Value> = inner
			.events
			.lock()
			.iter()
			.filter(|event| event.is(events::OUTPUT))
			.map(|event| event.body.clone().unwrap()["output"].clone())
			.collect();
		assert_eq!(outputs, vec![json!("a"), json!("b")]);
	}

	#[tokio::test]
	async fn events_are_never_dropped_when_initialized_never_comes() {
		let inner = RecordingSession::new();
		let session = InitializationOrderSession::new(inner.clone());

		for i in 0..100 {
			session.send_event(output(&i.to_string())).await;
		}
		assert!(inner.event_names().is_empty());
		assert_eq!(session.state.lock().await.pending.len(), 100);
	}

	#[tokio::test]
	async fn concurrent_senders_never_precede_initialized() {
		let inner = RecordingSession::new();
		let session = Arc::new(InitializationOrderSession::new(inner.clone()));

		let mut tasks = Vec::new();
		for i in 0..20 {
			let session = Arc::clone(&session);
			tasks.push(tokio::spawn(async move { session.send_event(output(&i.to_string())).await }));
		}
		let init = Arc::clone(&session);
		tasks.push(tokio::spawn(async move { init.send_event(Event::initialized()).await }));
		for task in tasks {
			task.await.unwrap();
		}

		let names = inner.event_names();
		assert_eq!(names.len(), 21);
		assert_eq!(names[0], "initialized");
	}
}

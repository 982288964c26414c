//! Fakes and a harness shared by the core integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cdap::protocol::{Event, LaunchAttachArguments, ProtocolMessage, Request};
use cdap::{
	AdapterDependencies, AdapterSettings, AttachTarget, ClientConnection, CommandHandlerDeclarer, DebugAdapter, DebuggeeLauncher, DebuggeeRunner,
	Error, InFlightTracker, InitializationOrderSession, LaunchResult, RequestHandler, Result, Session, StepRaceSession, TargetConnection,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

/// Ordered record of collaborator calls shared by all fakes.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
	pub fn push(&self, call: impl Into<String>) {
		self.0.lock().push(call.into());
	}

	pub fn calls(&self) -> Vec<String> {
		self.0.lock().clone()
	}

	pub fn contains(&self, call: &str) -> bool {
		self.0.lock().iter().any(|entry| entry == call)
	}
}

pub struct FakeLauncher {
	log: CallLog,
	pub fail_launch: Mutex<Option<String>>,
	pub fail_stop: AtomicBool,
	pub launched_with: Mutex<Option<LaunchAttachArguments>>,
}

impl FakeLauncher {
	pub fn new(log: &CallLog) -> Arc<Self> {
		Arc::new(Self {
			log: log.clone(),
			fail_launch: Mutex::new(None),
			fail_stop: AtomicBool::new(false),
			launched_with: Mutex::new(None),
		})
	}
}

#[async_trait]
impl DebuggeeLauncher for FakeLauncher {
	async fn launch(&self, arguments: &LaunchAttachArguments) -> Result<LaunchResult> {
		self.log.push("launcher.launch");
		*self.launched_with.lock() = Some(arguments.clone());
		if let Some(message) = self.fail_launch.lock().clone() {
			return Err(Error::collaborator(message));
		}
		Ok(LaunchResult {
			address: "127.0.0.1".into(),
			port: 9777,
			url: Some("ws://127.0.0.1:9777/devtools/page/1".into()),
		})
	}

	async fn stop(&self) -> Result<()> {
		self.log.push("launcher.stop");
		if self.fail_stop.load(Ordering::SeqCst) {
			return Err(Error::collaborator("launcher stop failed"));
		}
		Ok(())
	}
}

pub struct FakeRunner {
	log: CallLog,
	pub fail_stop: AtomicBool,
}

impl FakeRunner {
	pub fn new(log: &CallLog) -> Arc<Self> {
		Arc::new(Self {
			log: log.clone(),
			fail_stop: AtomicBool::new(false),
		})
	}
}

#[async_trait]
impl DebuggeeRunner for FakeRunner {
	async fn run(&self) -> Result<()> {
		self.log.push("runner.run");
		Ok(())
	}

	async fn stop(&self) -> Result<()> {
		self.log.push("runner.stop");
		if self.fail_stop.load(Ordering::SeqCst) {
			return Err(Error::collaborator("runner stop failed"));
		}
		Ok(())
	}
}

pub struct FakeTarget {
	log: CallLog,
	attached: AtomicBool,
	pub fail_attach: Mutex<Option<String>>,
	pub attached_with: Mutex<Vec<AttachTarget>>,
	closed: watch::Sender<bool>,
}

impl FakeTarget {
	pub fn new(log: &CallLog) -> Arc<Self> {
		let (closed, _) = watch::channel(false);
		Arc::new(Self {
			log: log.clone(),
			attached: AtomicBool::new(false),
			fail_attach: Mutex::new(None),
			attached_with: Mutex::new(Vec::new()),
			closed,
		})
	}

	/// The remote end goes away without us closing it.
	pub fn drop_connection(&self) {
		self.log.push("target.dropped");
		self.closed.send_replace(true);
	}
}

#[async_trait]
impl TargetConnection for FakeTarget {
	async fn attach(&self, target: AttachTarget) -> Result<()> {
		self.log.push("target.attach");
		self.attached_with.lock().push(target);
		if let Some(message) = self.fail_attach.lock().clone() {
			return Err(Error::collaborator(message));
		}
		self.attached.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		self.log.push("target.close");
		self.attached.store(false, Ordering::SeqCst);
		self.closed.send_replace(true);
		Ok(())
	}

	fn is_attached(&self) -> bool {
		self.attached.load(Ordering::SeqCst)
	}

	async fn closed(&self) {
		let mut rx = self.closed.subscribe();
		let _ = rx.wait_for(|closed| *closed).await;
	}
}

/// A fully assembled adapter: client connection, both decorators, controller.
pub struct Harness {
	pub log: CallLog,
	pub launcher: Arc<FakeLauncher>,
	pub runner: Arc<FakeRunner>,
	pub target: Arc<FakeTarget>,
	pub client: Arc<ClientConnection>,
	pub session: Arc<dyn Session>,
	pub adapter: Arc<DebugAdapter>,
	pub in_flight: InFlightTracker,
	outgoing: mpsc::UnboundedReceiver<ProtocolMessage>,
	seq: i64,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_declarers(Vec::new())
	}

	pub fn with_declarers(declarers: Vec<Arc<dyn CommandHandlerDeclarer>>) -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();

		let log = CallLog::default();
		let launcher = FakeLauncher::new(&log);
		let runner = FakeRunner::new(&log);
		let target = FakeTarget::new(&log);

		let (client, outgoing) = ClientConnection::new();
		let client = Arc::new(client);
		let in_flight = InFlightTracker::new();
		let settings = AdapterSettings::default();
		let ordered: Arc<dyn Session> = Arc::new(InitializationOrderSession::new(client.clone()));
		let session: Arc<dyn Session> = Arc::new(StepRaceSession::new(ordered, in_flight.clone(), settings.stopped_drain_timeout));

		let mut deps = AdapterDependencies::new(session.clone(), launcher.clone(), runner.clone(), target.clone())
			.with_in_flight(in_flight.clone())
			.with_settings(settings);
		for declarer in declarers {
			deps = deps.with_declarer(declarer);
		}
		let adapter = DebugAdapter::new(deps);
		let handler: Arc<dyn RequestHandler> = adapter.clone();
		client.bind_handler(Arc::downgrade(&handler));

		Self {
			log,
			launcher,
			runner,
			target,
			client,
			session,
			adapter,
			in_flight,
			outgoing,
			seq: 0,
		}
	}

	pub fn request(&mut self, command: &str, arguments: Value) -> Request {
		self.seq += 1;
		Request {
			seq: self.seq,
			command: command.into(),
			arguments,
		}
	}

	/// Sends a request through the outermost session, as the server loop does.
	pub async fn send(&mut self, command: &str, arguments: Value) -> Result<Value> {
		let request = self.request(command, arguments);
		self.session.dispatch_request(request).await
	}

	/// Everything written to the client since the last call, in order.
	pub fn messages(&mut self) -> Vec<ProtocolMessage> {
		let mut messages = Vec::new();
		while let Ok(message) = self.outgoing.try_recv() {
			messages.push(message);
		}
		messages
	}

	/// Events written to the client since the last call; responses are discarded.
	pub fn events(&mut self) -> Vec<Event> {
		self.messages()
			.into_iter()
			.filter_map(|message| match message {
				ProtocolMessage::Event(event) => Some(event),
				_ => None,
			})
			.collect()
	}

	pub async fn wait_for_state(&self, name: &str) {
		for _ in 0..200 {
			if self.adapter.state_name().await == name {
				return;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		panic!("adapter never reached {name}, still {}", self.adapter.state_name().await);
	}
}

pub fn event_names(events: &[Event]) -> Vec<String> {
	events.iter().map(|event| event.event.clone()).collect()
}

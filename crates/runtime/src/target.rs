//! Websocket connection to the debuggee's inspector.
//!
//! The connection moves raw JSON frames: [`WebSocketTarget::send`] writes
//! one, and frames read from the socket are forwarded to the receiver handed
//! out once by [`WebSocketTarget::take_frames`]. Frames that arrive before
//! anyone has taken the receiver are dropped. Encoding CRDP methods is up to
//! whoever holds those ends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cdap::{AttachTarget, TargetConnection};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, RuntimeError};
use crate::probe;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// [`TargetConnection`] over a websocket.
///
/// `is_attached` is true from a successful `attach` until `close`, even if
/// the remote end has gone away in between; `closed` reports the latter.
pub struct WebSocketTarget {
	writer: tokio::sync::Mutex<Option<SplitSink<Socket, Message>>>,
	reader: Mutex<Option<JoinHandle<()>>>,
	attached: AtomicBool,
	closed: watch::Sender<bool>,
	frames: Arc<Mutex<Option<mpsc::UnboundedSender<Value>>>>,
	frames_taken: AtomicBool,
	next_id: AtomicU64,
	extra_channel_port: Mutex<Option<u16>>,
}

impl Default for WebSocketTarget {
	fn default() -> Self {
		Self::new()
	}
}

impl WebSocketTarget {
	pub fn new() -> Self {
		let (closed, _) = watch::channel(false);
		Self {
			writer: tokio::sync::Mutex::new(None),
			reader: Mutex::new(None),
			attached: AtomicBool::new(false),
			closed,
			frames: Arc::new(Mutex::new(None)),
			frames_taken: AtomicBool::new(false),
			next_id: AtomicU64::new(1),
			extra_channel_port: Mutex::new(None),
		}
	}

	/// Receiver of inbound frames from now on. Only the first call gets it.
	pub fn take_frames(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
		if self.frames_taken.swap(true, Ordering::SeqCst) {
			return None;
		}
		let (tx, rx) = mpsc::unbounded_channel();
		*self.frames.lock() = Some(tx);
		Some(rx)
	}

	/// Next id for an outgoing CRDP command frame.
	pub fn next_message_id(&self) -> u64 {
		self.next_id.fetch_add(1, Ordering::SeqCst)
	}

	/// Port of the auxiliary CRDP channel requested by the last attach, if any.
	pub fn extra_channel_port(&self) -> Option<u16> {
		*self.extra_channel_port.lock()
	}

	/// Writes one raw JSON frame.
	pub async fn send(&self, frame: &Value) -> Result<()> {
		let mut writer = self.writer.lock().await;
		let sink = writer.as_mut().ok_or(RuntimeError::NotAttached)?;
		let text = serde_json::to_string(frame)?;
		trace!(target: "cdap.runtime", frame = %text, "-> target");
		sink.send(Message::Text(text)).await?;
		Ok(())
	}

	async fn resolve_url(target: &AttachTarget) -> Result<String> {
		if let Some(url) = target.url.as_deref().filter(|url| url.starts_with("ws://") || url.starts_with("wss://")) {
			return Ok(url.to_string());
		}

		// A non-websocket `url` narrows the /json/list lookup.
		match probe::list_targets(&target.address, target.port).await {
			Ok(targets) => {
				if let Some(url) = probe::select_target(&targets, target.url.as_deref()) {
					return Ok(url);
				}
			}
			Err(err) => debug!(target: "cdap.runtime", error = %err, "/json/list unavailable"),
		}

		probe::fetch_version(&target.address, target.port)
			.await?
			.web_socket_debugger_url
			.ok_or_else(|| RuntimeError::NoTarget {
				address: target.address.clone(),
				port: target.port,
			})
	}

	async fn connect_once(target: &AttachTarget) -> Result<(Socket, String)> {
		let url = Self::resolve_url(target).await?;
		let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
		Ok((socket, url))
	}

	async fn connect_with_retry(target: &AttachTarget) -> Result<(Socket, String)> {
		let deadline = Instant::now() + target.timeout;
		loop {
			match Self::connect_once(target).await {
				Ok(connected) => return Ok(connected),
				Err(err) if Instant::now() + RETRY_INTERVAL < deadline => {
					debug!(target: "cdap.runtime", error = %err, "attach attempt failed, retrying");
					tokio::time::sleep(RETRY_INTERVAL).await;
				}
				Err(err) => {
					return Err(RuntimeError::AttachTimeout {
						address: target.address.clone(),
						port: target.port,
						timeout: target.timeout,
						last_error: err.to_string(),
					});
				}
			}
		}
	}

	fn spawn_reader(&self, mut stream: SplitStream<Socket>) -> JoinHandle<()> {
		let frames = Arc::clone(&self.frames);
		let closed = self.closed.clone();
		tokio::spawn(async move {
			while let Some(message) = stream.next().await {
				let parsed = match message {
					Ok(Message::Text(text)) => serde_json::from_str::<Value>(&text),
					Ok(Message::Binary(bytes)) => serde_json::from_slice::<Value>(&bytes),
					Ok(Message::Close(frame)) => {
						debug!(target: "cdap.runtime", frame = ?frame, "target sent close");
						break;
					}
					Ok(_) => continue,
					Err(err) => {
						warn!(target: "cdap.runtime", error = %err, "target connection failed");
						break;
					}
				};
				match parsed {
					Ok(frame) => match frames.lock().as_ref() {
						Some(tx) => {
							let _ = tx.send(frame);
						}
						None => trace!(target: "cdap.runtime", "no frame receiver, dropping frame"),
					},
					Err(err) => warn!(target: "cdap.runtime", error = %err, "ignoring malformed frame"),
				}
			}
			closed.send_replace(true);
		})
	}
}

#[async_trait]
impl TargetConnection for WebSocketTarget {
	async fn attach(&self, target: AttachTarget) -> cdap::Result<()> {
		if self.attached.load(Ordering::SeqCst) {
			return Err(RuntimeError::AlreadyAttached.into());
		}

		let (socket, url) = Self::connect_with_retry(&target).await?;
		info!(target: "cdap.runtime", %url, extra_channel_port = ?target.extra_channel_port, "attached to target");

		let (sink, stream) = socket.split();
		*self.writer.lock().await = Some(sink);
		*self.extra_channel_port.lock() = target.extra_channel_port;
		self.closed.send_replace(false);
		let reader = self.spawn_reader(stream);
		if let Some(previous) = self.reader.lock().replace(reader) {
			previous.abort();
		}
		self.attached.store(true, Ordering::SeqCst);
		Ok(())
	}

	async fn close(&self) -> cdap::Result<()> {
		self.attached.store(false, Ordering::SeqCst);
		let sink = self.writer.lock().await.take();
		if let Some(mut sink) = sink {
			if let Err(err) = sink.close().await {
				debug!(target: "cdap.runtime", error = %err, "error closing target socket");
			}
		}
		if let Some(reader) = self.reader.lock().take() {
			reader.abort();
		}
		self.closed.send_replace(true);
		info!(target: "cdap.runtime", "target connection closed");
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

//! The connection loop between a DAP client stream and one adapter.

use std::time::Duration;

use anyhow::Context;
use cdap::AdapterSettings;
use cdap::protocol::ProtocolMessage;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::framing::{self, FrameError};
use crate::{Assembly, assemble};

/// How long requests still running after the session closed may take to answer.
const REQUEST_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runs the adapter as configured on the command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
	let settings = cli.settings();
	match cli.server {
		Some(port) => listen(&cli.host, port, settings).await,
		None => {
			info!(target: "cdap", "serving DAP over stdio");
			serve(tokio::io::stdin(), tokio::io::stdout(), assemble(settings)).await
		}
	}
}

/// Accepts DAP clients on `host:port`, one adapter per connection.
pub async fn listen(host: &str, port: u16, settings: AdapterSettings) -> anyhow::Result<()> {
	let listener = TcpListener::bind((host, port)).await.with_context(|| format!("failed to listen on {host}:{port}"))?;
	info!(target: "cdap", addr = %listener.local_addr()?, "waiting for DAP clients");

	loop {
		let (stream, peer) = listener.accept().await.context("failed to accept DAP client")?;
		info!(target: "cdap", %peer, "client connected");
		tokio::spawn(async move {
			let (read, write) = stream.into_split();
			if let Err(err) = serve(read, write, assemble(settings)).await {
				warn!(target: "cdap", %peer, error = %err, "client session failed");
			}
			info!(target: "cdap", %peer, "client disconnected");
		});
	}
}

/// Serves one client until the session shuts down or the input ends.
///
/// Requests run concurrently, each on its own task. Once the session closes
/// the loop stops reading, lets running requests answer, then drains the
/// outgoing queue before returning.
pub async fn serve<R, W>(reader: R, writer: W, assembly: Assembly) -> anyhow::Result<()>
where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let Assembly {
		adapter,
		client,
		session,
		mut outgoing,
	} = assembly;

	let writer_task = tokio::spawn(async move {
		let mut writer = BufWriter::new(writer);
		while let Some(message) = outgoing.recv().await {
			if let Err(err) = framing::write_message(&mut writer, &message).await {
				warn!(target: "cdap", error = %err, "failed to write to client");
				break;
			}
		}
	});

	let (frames_tx, mut frames) = mpsc::unbounded_channel();
	let reader_task = tokio::spawn(async move {
		let mut reader = BufReader::new(reader);
		loop {
			match framing::read_message(&mut reader).await {
				Ok(Some(message)) => {
					if frames_tx.send(Ok(message)).is_err() {
						break;
					}
				}
				Ok(None) => break,
				Err(FrameError::Body(err)) => warn!(target: "cdap", error = %err, "dropping malformed message"),
				Err(err) => {
					let _ = frames_tx.send(Err(err));
					break;
				}
			}
		}
	});

	let mut requests = JoinSet::new();
	loop {
		tokio::select! {
			_ = client.closed() => {
				debug!(target: "cdap", "session closed, no longer reading");
				break;
			}
			frame = frames.recv() => match frame {
				Some(Ok(ProtocolMessage::Request(request))) => {
					let session = session.clone();
					// The client connection writes the response itself.
					requests.spawn(async move {
						let _ = session.dispatch_request(request).await;
					});
				}
				Some(Ok(ProtocolMessage::Response(response))) => {
					if let Err(err) = client.handle_response(response) {
						warn!(target: "cdap", error = %err, "unexpected response from client");
					}
				}
				Some(Ok(ProtocolMessage::Event(event))) => {
					debug!(target: "cdap", event = %event.event, "ignoring event sent by client");
				}
				Some(Err(err)) => {
					warn!(target: "cdap", error = %err, "client stream broken");
					adapter.shutdown().await;
					break;
				}
				None => {
					info!(target: "cdap", "client closed its input");
					adapter.shutdown().await;
					break;
				}
			},
			Some(joined) = requests.join_next(), if !requests.is_empty() => {
				if let Err(err) = joined {
					warn!(target: "cdap", error = %err, "request task failed");
				}
			}
		}
	}

	let drained = tokio::time::timeout(REQUEST_DRAIN_GRACE, async {
		while let Some(joined) = requests.join_next().await {
			if let Err(err) = joined {
				warn!(target: "cdap", error = %err, "request task failed");
			}
		}
	})
	.await;
	if drained.is_err() {
		warn!(target: "cdap", outstanding = requests.len(), "abandoning requests still running");
		requests.abort_all();
	}

	reader_task.abort();
	let _ = reader_task.await;
	client.close_outgoing();
	writer_task.await.context("client writer task failed")?;
	Ok(())
}

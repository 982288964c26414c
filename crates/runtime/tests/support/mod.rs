//! Stand-in inspector endpoints for the runtime integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Serves `/json/version` and `/json/list` the way an inspector does.
pub async fn spawn_http_endpoint(version: Value, list: Value) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	spawn_http_endpoint_on(listener, version, list).await
}

pub async fn spawn_http_endpoint_on(listener: TcpListener, version: Value, list: Value) -> SocketAddr {
	let addr = listener.local_addr().unwrap();
	let app = Router::new()
		.route("/json/version", get(move || async move { Json(version) }))
		.route("/json/list", get(move || async move { Json(list) }));
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	addr
}

pub fn node_version() -> Value {
	json!({ "Browser": "node.js/v20.11.0", "Protocol-Version": "1.1" })
}

/// One-connection websocket server. Frames the client sends arrive on the
/// returned receiver; frames pushed into the returned sender go to the
/// client, and dropping that sender closes the socket.
pub async fn spawn_ws_endpoint() -> (SocketAddr, mpsc::UnboundedReceiver<Value>, mpsc::UnboundedSender<Value>) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
	let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Value>();

	tokio::spawn(async move {
		let (stream, _) = listener.accept().await.unwrap();
		let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
		let (mut ws_tx, mut ws_rx) = ws.split();
		loop {
			tokio::select! {
				incoming = ws_rx.next() => match incoming {
					Some(Ok(Message::Text(text))) => {
						let _ = inbound_tx.send(serde_json::from_str::<Value>(&text).unwrap());
					}
					Some(Ok(_)) => {}
					_ => break,
				},
				outgoing = outbound_rx.recv() => match outgoing {
					Some(frame) => ws_tx.send(Message::Text(frame.to_string())).await.unwrap(),
					None => {
						let _ = ws_tx.send(Message::Close(None)).await;
						break;
					}
				},
			}
		}
	});

	(addr, inbound_rx, outbound_tx)
}

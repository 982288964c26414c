mod support;

use cdap_runtime::probe;
use serde_json::json;

#[tokio::test]
async fn reads_version_and_target_list() {
	let addr = support::spawn_http_endpoint(
		support::node_version(),
		json!([{
			"id": "8f0c",
			"type": "node",
			"title": "app.js",
			"url": "file:///srv/app.js",
			"webSocketDebuggerUrl": "ws://127.0.0.1:9229/8f0c",
		}]),
	)
	.await;

	let version = probe::fetch_version("127.0.0.1", addr.port()).await.unwrap();
	assert_eq!(version.protocol_version.as_deref(), Some("1.1"));
	assert!(version.web_socket_debugger_url.is_none());

	let targets = probe::list_targets("127.0.0.1", addr.port()).await.unwrap();
	assert_eq!(targets.len(), 1);
	assert_eq!(targets[0].kind, "node");
	assert_eq!(probe::select_target(&targets, Some("app.js")).as_deref(), Some("ws://127.0.0.1:9229/8f0c"));
}

#[tokio::test]
async fn missing_route_is_reported_as_unavailable() {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, axum::Router::new()).await.unwrap();
	});

	let err = probe::fetch_version("127.0.0.1", addr.port()).await.unwrap_err();
	assert!(matches!(err, cdap_runtime::RuntimeError::EndpointUnavailable { .. }), "{err}");
}

#[tokio::test]
async fn closed_port_fails() {
	let port = cdap_runtime::process::free_port("127.0.0.1").unwrap();
	assert!(probe::fetch_version("127.0.0.1", port).await.is_err());
}

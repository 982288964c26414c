//! Inspector HTTP endpoint probing (`/json/version`, `/json/list`).

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RuntimeError};

const PROBE_TIMEOUT: Duration = Duration::from_millis(400);

/// `/json/version` response subset.
///
/// Node reports no `webSocketDebuggerUrl` here; browsers do.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
	#[serde(rename = "Browser", default)]
	pub browser: Option<String>,
	#[serde(rename = "Protocol-Version", default)]
	pub protocol_version: Option<String>,
	#[serde(rename = "webSocketDebuggerUrl", default)]
	pub web_socket_debugger_url: Option<String>,
}

/// One entry of `/json/list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
	pub id: String,
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub web_socket_debugger_url: Option<String>,
}

fn client() -> Result<reqwest::Client> {
	Ok(reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?)
}

async fn get_json<T: serde::de::DeserializeOwned>(address: &str, port: u16, path: &str) -> Result<T> {
	let url = format!("http://{}/{}", host_port(address, port), path.trim_start_matches('/'));
	let response = client()?.get(&url).send().await?;
	if !response.status().is_success() {
		return Err(RuntimeError::EndpointUnavailable {
			address: address.to_string(),
			port,
			last_error: format!("{url} returned {}", response.status()),
		});
	}
	Ok(response.json().await?)
}

fn host_port(address: &str, port: u16) -> String {
	if address.contains(':') && !address.starts_with('[') {
		format!("[{address}]:{port}")
	} else {
		format!("{address}:{port}")
	}
}

/// Reads `/json/version` from the inspector on `address:port`.
pub async fn fetch_version(address: &str, port: u16) -> Result<VersionInfo> {
	get_json(address, port, "/json/version").await
}

/// Reads `/json/list` from the inspector on `address:port`.
pub async fn list_targets(address: &str, port: u16) -> Result<Vec<TargetInfo>> {
	get_json(address, port, "/json/list").await
}

/// Picks the websocket URL of the first target whose page URL contains
/// `filter` (any target when `filter` is `None`).
pub fn select_target(targets: &[TargetInfo], filter: Option<&str>) -> Option<String> {
	targets
		.iter()
		.filter(|target| matches!(target.kind.as_str(), "node" | "page" | ""))
		.filter(|target| filter.is_none_or(|filter| target.url.contains(filter)))
		.find_map(|target| target.web_socket_debugger_url.clone())
}

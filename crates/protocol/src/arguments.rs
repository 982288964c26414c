//! Request argument and response body shapes the adapter core inspects.
//!
//! Business-logic commands (`stackTrace`, `evaluate`, ...) keep their
//! arguments as raw JSON; only lifecycle requests are typed here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_true() -> bool {
	true
}

/// `initialize` request arguments (client capabilities).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequestArguments {
	#[serde(default, rename = "clientID", skip_serializing_if = "Option::is_none")]
	pub client_id: Option<String>,
	#[serde(default, rename = "adapterID", skip_serializing_if = "Option::is_none")]
	pub adapter_id: Option<String>,
	#[serde(default = "default_true")]
	pub lines_start_at1: bool,
	#[serde(default = "default_true")]
	pub columns_start_at1: bool,
	/// `"path"` or `"uri"`. Absent means `"path"`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path_format: Option<String>,
	#[serde(default)]
	pub supports_run_in_terminal_request: bool,
}

impl Default for InitializeRequestArguments {
	fn default() -> Self {
		Self {
			client_id: None,
			adapter_id: None,
			lines_start_at1: true,
			columns_start_at1: true,
			path_format: None,
			supports_run_in_terminal_request: false,
		}
	}
}

/// Capabilities returned in the `initialize` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
	pub supports_configuration_done_request: bool,
	pub supports_restart_frame: bool,
	pub supports_exception_info_request: bool,
	pub supports_loaded_sources_request: bool,
	pub supports_function_breakpoints: bool,
	pub supports_set_variable: bool,
	pub supports_terminate_request: bool,
}

/// Arguments shared by `launch` and `attach`.
///
/// Fields the core does not interpret are preserved in `extra` so business
/// logic can read them from the resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchAttachArguments {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,
	/// Websocket URL (or URL filter) of the target to attach to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Attach timeout in milliseconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout: Option<u64>,
	#[serde(default, rename = "extraCRDPChannelPort", skip_serializing_if = "Option::is_none")]
	pub extra_crdp_channel_port: Option<u16>,
	/// Remote URL/path prefix → local directory.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub path_mapping: BTreeMap<String, String>,
	#[serde(default)]
	pub no_debug: bool,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub runtime_executable: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub runtime_args: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub program: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cwd: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub env: BTreeMap<String, String>,

	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// `disconnect` request arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub restart: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub terminate_debuggee: Option<bool>,
}

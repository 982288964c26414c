//! DAP event names and the bodies the adapter core produces.

use serde::{Deserialize, Serialize};

pub const INITIALIZED: &str = "initialized";
pub const STOPPED: &str = "stopped";
pub const TERMINATED: &str = "terminated";
pub const OUTPUT: &str = "output";

/// Body of an `output` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEventBody {
	pub category: String,
	pub output: String,
}

impl OutputEventBody {
	pub fn console(output: impl Into<String>) -> Self {
		Self {
			category: "console".into(),
			output: output.into(),
		}
	}
}

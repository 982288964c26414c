use std::path::PathBuf;
use std::time::Duration;

use cdap::AdapterSettings;
use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "cdap")]
#[command(about = "Debug adapter connecting DAP clients to Chrome DevTools Protocol debuggees")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = ArgAction::Count)]
	pub verbose: u8,

	/// Accept DAP clients on this TCP port instead of talking over stdio
	#[arg(long, value_name = "PORT")]
	pub server: Option<u16>,

	/// Address to listen on with --server
	#[arg(long, default_value = "127.0.0.1")]
	pub host: String,

	/// Append logs to this file instead of stderr
	#[arg(long, value_name = "FILE")]
	pub log_file: Option<PathBuf>,

	/// How long a stopped event waits for step requests still in flight (ms)
	#[arg(long, value_name = "MS", default_value_t = 300)]
	pub stopped_drain_timeout_ms: u64,

	/// How long teardown waits for in-flight requests before terminating (ms)
	#[arg(long, value_name = "MS", default_value_t = 300)]
	pub settle_timeout_ms: u64,
}

impl Cli {
	pub fn settings(&self) -> AdapterSettings {
		AdapterSettings {
			stopped_drain_timeout: Duration::from_millis(self.stopped_drain_timeout_ms),
			settle_timeout: Duration::from_millis(self.settle_timeout_ms),
		}
	}
}

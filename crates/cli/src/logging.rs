use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive; overrides `-v`.
pub const LOG_ENV: &str = "CDAP_LOG";

fn default_directive(verbose: u8) -> &'static str {
	match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
}

/// Installs the global subscriber. Stdout is never written to, it carries DAP in stdio mode.
pub fn init_logging(verbose: u8, log_file: Option<&Path>) -> anyhow::Result<()> {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

	let installed = match log_file {
		Some(path) => {
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.with_context(|| format!("failed to open log file {}", path.display()))?;
			builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
		}
		None => builder.with_writer(std::io::stderr).try_init(),
	};
	installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

#[cfg(test)]
mod tests {
	use std::io;
	use std::sync::Arc;

	use cdap::protocol::Request;
	use cdap::{AdapterSettings, Session};
	use serde_json::json;
	use tracing_subscriber::fmt::MakeWriter;

	use super::*;

	#[derive(Clone, Default)]
	struct Captured(Arc<Mutex<Vec<u8>>>);

	impl Captured {
		fn text(&self) -> String {
			String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
		}
	}

	impl io::Write for Captured {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	impl<'a> MakeWriter<'a> for Captured {
		type Writer = Captured;

		fn make_writer(&'a self) -> Self::Writer {
			self.clone()
		}
	}

	#[tokio::test]
	async fn filter_directives_select_adapter_targets() {
		let captured = Captured::default();
		let subscriber = tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::new("cdap.session=debug"))
			.with_target(true)
			.with_ansi(false)
			.with_writer(captured.clone())
			.finish();
		let _guard = tracing::subscriber::set_default(subscriber);

		let assembly = crate::assemble(AdapterSettings::default());
		let initialize = Request {
			seq: 1,
			command: "initialize".into(),
			arguments: json!({ "adapterID": "node" }),
		};
		assembly.session.dispatch_request(initialize).await.unwrap();

		let text = captured.text();
		assert!(text.contains("cdap.session"), "{text}");
		assert!(text.contains("client capabilities recorded"), "{text}");
		assert!(!text.contains("cdap.adapter"), "{text}");
	}

	#[test]
	fn verbosity_raises_default_level() {
		assert_eq!(default_directive(0), "warn");
		assert_eq!(default_directive(1), "info");
		assert_eq!(default_directive(2), "debug");
		assert_eq!(default_directive(7), "trace");
	}
}

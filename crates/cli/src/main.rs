use cdap_cli::cli::Cli;
use cdap_cli::{logging, server};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	if let Err(err) = logging::init_logging(cli.verbose, cli.log_file.as_deref()) {
		eprintln!("cdap: {err:#}");
		std::process::exit(1);
	}

	let code = match server::run(cli).await {
		Ok(()) => 0,
		Err(err) => {
			error!(target: "cdap", error = %err, "adapter failed");
			1
		}
	};
	// Exit directly: a pending blocking stdin read would keep the runtime from shutting down.
	std::process::exit(code);
}

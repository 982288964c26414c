#![cfg(unix)]

mod support;

use cdap::protocol::LaunchAttachArguments;
use cdap::DebuggeeLauncher;
use cdap_runtime::{ChildProcessLauncher, DebuggeeProcess};

fn shell(script: &str) -> LaunchAttachArguments {
	LaunchAttachArguments {
		runtime_executable: Some("sh".into()),
		runtime_args: vec!["-c".into(), script.into()],
		..Default::default()
	}
}

#[tokio::test]
async fn early_exit_is_reported() {
	let dir = tempfile::tempdir().unwrap();
	let mut arguments = shell("exit 3");
	arguments.cwd = Some(dir.path().display().to_string());
	arguments.timeout = Some(5_000);

	let process = DebuggeeProcess::new();
	let launcher = ChildProcessLauncher::new(process.clone());
	let err = launcher.launch(&arguments).await.unwrap_err();
	assert!(err.to_string().contains("exited before"), "{err}");

	launcher.stop().await.unwrap();
	assert!(!process.is_launched());
}

#[tokio::test]
async fn launch_waits_for_inspector_then_stop_kills_child() {
	let addr = support::spawn_http_endpoint(support::node_version(), serde_json::json!([])).await;
	let mut arguments = shell("sleep 30");
	arguments.port = Some(addr.port());

	let process = DebuggeeProcess::new();
	let launcher = ChildProcessLauncher::new(process.clone());
	let launched = launcher.launch(&arguments).await.unwrap();
	assert_eq!(launched.address, "127.0.0.1");
	assert_eq!(launched.port, addr.port());
	assert!(launched.url.is_none());
	assert!(process.pid().is_some());
	assert!(process.exit_status().is_none());

	launcher.stop().await.unwrap();
	assert!(!process.is_launched());
}

#[tokio::test]
async fn environment_reaches_the_debuggee() {
	let dir = tempfile::tempdir().unwrap();
	let marker = dir.path().join("marker");
	let mut arguments = shell("printf %s \"$CDAP_MARKER\" > marker; exit 0");
	arguments.cwd = Some(dir.path().display().to_string());
	arguments.env.insert("CDAP_MARKER".into(), "hello".into());

	let launcher = ChildProcessLauncher::new(DebuggeeProcess::new());
	assert!(launcher.launch(&arguments).await.is_err());
	assert_eq!(std::fs::read_to_string(marker).unwrap(), "hello");
}

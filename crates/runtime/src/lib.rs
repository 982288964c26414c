//! Process, HTTP and websocket collaborators for the `cdap` adapter.
//!
//! [`ChildProcessLauncher`] and [`ChildProcessRunner`] share a
//! [`DebuggeeProcess`]; the runner and the adapter share one
//! [`WebSocketTarget`].

pub mod error;
pub mod launcher;
pub mod probe;
pub mod process;
pub mod runner;
pub mod target;

pub use error::{Result, RuntimeError};
pub use launcher::{ChildProcessLauncher, DebuggeeProcess, LaunchCommand};
pub use probe::{TargetInfo, VersionInfo};
pub use runner::ChildProcessRunner;
pub use target::WebSocketTarget;

//! Core of a DAP ⇄ CRDP debug adapter.
//!
//! The crate keeps one coherent debug session in front of a DAP client while
//! the connection to the debuggee is launched, attached, lost and torn down:
//!
//! - [`session`]: the client-facing transport and the decorators that order
//!   `initialized` first and keep `stopped` behind the step that caused it
//! - [`dispatcher`]: per-state command tables built from handler declarers
//! - [`state`]: the lifecycle state machine
//! - [`adapter`]: the controller that owns the current state
//!
//! Launching, attaching and business-logic commands are supplied by the
//! embedder through [`collaborators`] and [`dispatcher::CommandHandlerDeclarer`].

pub mod adapter;
pub mod collaborators;
pub mod configuration;
pub mod dispatcher;
pub mod error;
pub mod session;
pub mod settings;
pub mod state;
pub mod tracker;

pub use adapter::DebugAdapter;
pub use cdap_protocol as protocol;
pub use collaborators::{ArgumentsRewriter, AttachTarget, DebuggeeLauncher, DebuggeeRunner, IdentityRewriter, LaunchResult, TargetConnection};
pub use configuration::{Scenario, SessionConfiguration, TerminatingReason};
pub use dispatcher::{CommandDispatcher, CommandHandler, CommandHandlerDeclaration, CommandHandlerDeclarer, StaticDeclarer};
pub use error::{Error, Result};
pub use session::{ClientConnection, ForwardingSession, InitializationOrderSession, RequestHandler, Session, StepRaceSession};
pub use settings::AdapterSettings;
pub use state::{AdapterDependencies, AdapterState};
pub use tracker::{InFlightGuard, InFlightTracker};

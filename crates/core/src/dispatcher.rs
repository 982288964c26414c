//! Command name → handler tables.
//!
//! Each state owns one [`CommandDispatcher`]. Its table is assembled from an
//! ordered list of [`CommandHandlerDeclarer`]s; when two declarers name the
//! same command the later one wins, which is how business logic overrides
//! the built-in defaults.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Handler invoked with the request's raw arguments.
pub type CommandHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// One `(name, handler)` pair contributed by a declarer.
#[derive(Clone)]
pub struct CommandHandlerDeclaration {
	pub name: String,
	pub handler: CommandHandler,
}

impl CommandHandlerDeclaration {
	/// Wraps an async closure as a handler.
	pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
	where
		F: Fn(Value) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value>> + Send + 'static,
	{
		Self {
			name: name.into(),
			handler: Arc::new(move |arguments| handler(arguments).boxed()),
		}
	}
}

impl std::fmt::Debug for CommandHandlerDeclaration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CommandHandlerDeclaration").field("name", &self.name).finish_non_exhaustive()
	}
}

/// A source of command handlers (breakpoints, stack traces, evaluation, ...).
#[async_trait]
pub trait CommandHandlerDeclarer: Send + Sync {
	async fn command_handler_declarations(&self) -> Result<Vec<CommandHandlerDeclaration>>;
}

/// Declarer over a fixed list.
#[derive(Clone, Default)]
pub struct StaticDeclarer {
	declarations: Vec<CommandHandlerDeclaration>,
}

impl StaticDeclarer {
	pub fn new(declarations: Vec<CommandHandlerDeclaration>) -> Self {
		Self { declarations }
	}

	pub fn with(mut self, declaration: CommandHandlerDeclaration) -> Self {
		self.declarations.push(declaration);
		self
	}
}

#[async_trait]
impl CommandHandlerDeclarer for StaticDeclarer {
	async fn command_handler_declarations(&self) -> Result<Vec<CommandHandlerDeclaration>> {
		Ok(self.declarations.clone())
	}
}

/// Routes commands to the handlers its declarers contributed.
pub struct CommandDispatcher {
	declarers: Vec<Arc<dyn CommandHandlerDeclarer>>,
	handlers: RwLock<HashMap<String, CommandHandler>>,
	state: String,
}

impl CommandDispatcher {
	/// `state` is the description used in "unexpected request" errors.
	pub fn new(declarers: Vec<Arc<dyn CommandHandlerDeclarer>>, state: impl Into<String>) -> Self {
		Self {
			declarers,
			handlers: RwLock::new(HashMap::new()),
			state: state.into(),
		}
	}

	/// Builds an already-installed dispatcher from a fixed list.
	pub fn from_declarations(declarations: Vec<CommandHandlerDeclaration>, state: impl Into<String>) -> Self {
		let dispatcher = Self::new(Vec::new(), state);
		dispatcher.insert_all(declarations);
		dispatcher
	}

	/// Collects declarations from every declarer in order and populates the table.
	///
	/// Calling it again re-collects and overwrites; entries are never removed.
	pub async fn install(&self) -> Result<()> {
		let mut collected = Vec::new();
		for declarer in &self.declarers {
			collected.extend(declarer.command_handler_declarations().await?);
		}
		self.insert_all(collected);
		debug!(target: "cdap.dispatch", state = %self.state, commands = ?self.commands(), "command handlers installed");
		Ok(())
	}

	fn insert_all(&self, declarations: Vec<CommandHandlerDeclaration>) {
		let mut handlers = self.handlers.write();
		for declaration in declarations {
			if handlers.insert(declaration.name.clone(), declaration.handler).is_some() {
				trace!(target: "cdap.dispatch", state = %self.state, command = %declaration.name, "handler overridden");
			}
		}
	}

	/// Invokes the handler for `command`, or fails with [`Error::UnexpectedRequest`].
	pub async fn process_request(&self, command: &str, arguments: Value) -> Result<Value> {
		let handler = self.handlers.read().get(command).cloned();
		match handler {
			Some(handler) => {
				trace!(target: "cdap.dispatch", state = %self.state, command, "dispatching");
				handler(arguments).await
			}
			None => Err(Error::UnexpectedRequest {
				command: command.to_string(),
				arguments: describe(&arguments),
				state: self.state.clone(),
			}),
		}
	}

	pub fn handles(&self, command: &str) -> bool {
		self.handlers.read().contains_key(command)
	}

	/// Installed command names, sorted.
	pub fn commands(&self) -> Vec<String> {
		let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
		names.sort();
		names
	}

	pub fn state(&self) -> &str {
		&self.state
	}
}

fn describe(arguments: &Value) -> String {
	serde_json::to_string(arguments).unwrap_or_else(|_| "<unprintable>".to_string())
}

//! DAP command names routed by the adapter core.

pub const INITIALIZE: &str = "initialize";
pub const LAUNCH: &str = "launch";
pub const ATTACH: &str = "attach";
pub const DISCONNECT: &str = "disconnect";
pub const CONFIGURATION_DONE: &str = "configurationDone";

pub const SET_BREAKPOINTS: &str = "setBreakpoints";
pub const SET_EXCEPTION_BREAKPOINTS: &str = "setExceptionBreakpoints";
pub const SET_FUNCTION_BREAKPOINTS: &str = "setFunctionBreakpoints";
pub const SET_VARIABLE: &str = "setVariable";

pub const CONTINUE: &str = "continue";
pub const NEXT: &str = "next";
pub const STEP_IN: &str = "stepIn";
pub const STEP_OUT: &str = "stepOut";
pub const PAUSE: &str = "pause";
pub const RESTART_FRAME: &str = "restartFrame";

pub const STACK_TRACE: &str = "stackTrace";
pub const SCOPES: &str = "scopes";
pub const VARIABLES: &str = "variables";
pub const SOURCE: &str = "source";
pub const THREADS: &str = "threads";
pub const EVALUATE: &str = "evaluate";
pub const LOADED_SOURCES: &str = "loadedSources";
pub const EXCEPTION_INFO: &str = "exceptionInfo";

/// Commands whose completion may race with a target-reported stop.
pub const STEPPING_COMMANDS: [&str; 6] = [CONTINUE, NEXT, STEP_IN, STEP_OUT, PAUSE, RESTART_FRAME];

/// Returns `true` for `continue`, `next`, `stepIn`, `stepOut`, `pause` and `restartFrame`.
pub fn is_stepping_command(command: &str) -> bool {
	STEPPING_COMMANDS.contains(&command)
}

//! Wire types for the Debug Adapter Protocol.
//!
//! This crate contains the serde-serializable types exchanged with a DAP
//! client: the `request`/`response`/`event` envelopes, the argument shapes
//! the adapter core inspects, and the command and event names it routes on.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with protocol: Field names match the DAP JSON schema
//! * Stable: Changes only when the wire protocol changes
//!
//! Session semantics (ordering, dispatch, lifecycle) live in `cdap-rs`.

pub mod arguments;
pub mod commands;
pub mod events;
pub mod messages;

pub use arguments::*;
pub use messages::*;

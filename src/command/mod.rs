//! Command execution infrastructure for the unit client
//!
//! This module handles:
//! - Expanding inbound command scripts into the instruction queue
//! - Exclusive pin locking with bounded-retry acquisition
//! - Dispatching verbs to external handler invocations

mod interpreter;
mod locks;
mod registry;
mod runner;

pub use interpreter::CommandInterpreter;
pub use locks::{LockTimeout, ResourceLockTable};
pub use registry::HandlerRegistry;
pub use runner::{CommandRunner, ProcessRunner};

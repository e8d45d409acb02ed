//! Session lifecycle for one client-to-controller connection
//!
//! This module handles:
//! - Routing inbound frames to the handshake or the interpreter
//! - Recording the session exit code exactly once
//! - Tearing down the transport and the instruction queue

mod controller;

pub use controller::SessionController;

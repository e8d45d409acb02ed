//! Controlify Shared Protocol
//!
//! This crate provides the wire grammar, handshake state machine, and frame
//! codec shared by the Controlify unit client and its tests.

pub mod codec;
pub mod frame;
pub mod handshake;
pub mod script;

// Re-export commonly used types at crate root
pub use frame::{ClientIdentity, IdentityError, ProtocolError, ServerAck};
pub use handshake::{Handshake, HandshakeOutcome, HandshakePhase};
pub use script::{expand_script, Instruction, ScriptError};

/// Protocol limits for the client session
pub mod limits {
    /// Maximum attempts to acquire a pin lock before giving up
    pub const MAX_LOCK_ATTEMPTS: u32 = 20;

    /// Wait between lock acquisition attempts in milliseconds
    pub const LOCK_RETRY_WAIT_MS: u64 = 500;

    /// Maximum text frame size (1 MB) to prevent memory exhaustion
    pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;
}

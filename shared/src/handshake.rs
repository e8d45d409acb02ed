//! Controlify Handshake State Machine
//!
//! Negotiates protocol identity and version with the controller before any
//! command traffic is accepted. The machine is pure: it consumes inbound
//! frames and tells the caller what to send and whether to proceed.

use crate::frame::{self, ClientIdentity, ProtocolError, ServerAck};

/// Phases of the two-message handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Waiting for the server greeting
    AwaitingGreeting,
    /// Greeting answered, waiting for the server's verdict on our identity
    AwaitingAck,
    /// Handshake finished; command traffic may flow
    Complete,
}

/// Result of feeding one inbound frame to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Greeting accepted; send the client hello
    Reply {
        frame: String,
        /// Set when the server advertises an incompatible major version
        version_warning: Option<String>,
    },
    /// Ack accepted; send the reply, then start accepting command traffic
    Established {
        reply: String,
        /// Set when the server flagged this client version as deprecated
        warning: Option<String>,
    },
    /// Terminal protocol failure; the session must be torn down
    Failed(ProtocolError),
}

/// The client side of the two-message handshake
#[derive(Debug)]
pub struct Handshake {
    phase: HandshakePhase,
    identity: ClientIdentity,
    client_version: String,
}

impl Handshake {
    /// Create a new state machine awaiting the server greeting
    pub fn new(identity: ClientIdentity, client_version: impl Into<String>) -> Self {
        Self {
            phase: HandshakePhase::AwaitingGreeting,
            identity,
            client_version: client_version.into(),
        }
    }

    /// Current phase
    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// Whether command traffic may flow
    pub fn is_complete(&self) -> bool {
        self.phase == HandshakePhase::Complete
    }

    /// Process one inbound frame and advance the state machine.
    ///
    /// Calling this after the handshake completed is a contract violation
    /// and fails terminally; post-handshake frames belong to the command
    /// interpreter, not here.
    pub fn process(&mut self, message: &str) -> HandshakeOutcome {
        match self.phase {
            HandshakePhase::AwaitingGreeting => self.process_greeting(message),
            HandshakePhase::AwaitingAck => self.process_ack(message),
            HandshakePhase::Complete => {
                HandshakeOutcome::Failed(ProtocolError::HandshakeComplete)
            }
        }
    }

    fn process_greeting(&mut self, message: &str) -> HandshakeOutcome {
        if !message.starts_with(frame::SERVER_GREETING_PREFIX) {
            return HandshakeOutcome::Failed(ProtocolError::UnrecognisedGreeting);
        }

        // The greeting may end with the server's semver. A major mismatch is
        // reported but does not abort: the server gets the final say in the
        // ack phase.
        let version_warning = match frame::greeting_version(message) {
            Some((major, _, _)) if major != self.client_major() => Some(format!(
                "server speaks protocol {major}.x, client is {}",
                self.client_version
            )),
            _ => None,
        };

        self.phase = HandshakePhase::AwaitingAck;
        HandshakeOutcome::Reply {
            frame: self.identity.hello_frame(&self.client_version),
            version_warning,
        }
    }

    fn process_ack(&mut self, message: &str) -> HandshakeOutcome {
        let warning = match ServerAck::parse(message) {
            Ok(ServerAck::Ok) => None,
            Ok(ServerAck::Deprecated(msg)) => Some(msg),
            Ok(ServerAck::Unsupported(msg)) => {
                return HandshakeOutcome::Failed(ProtocolError::Unsupported(msg));
            }
            Err(e) => return HandshakeOutcome::Failed(e),
        };

        self.phase = HandshakePhase::Complete;
        HandshakeOutcome::Established {
            reply: frame::ACK_OK.to_string(),
            warning,
        }
    }

    fn client_major(&self) -> u64 {
        self.client_version
            .split('.')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

//! Session controller: owns the connection lifecycle
//!
//! Frames are routed to the handshake state machine until it completes,
//! then to the command interpreter. Fatal protocol errors and transport
//! close both end the session; whichever happens first decides the exit
//! code.

use controlify_shared::handshake::{Handshake, HandshakeOutcome};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::command::CommandInterpreter;
use crate::transport::{Transport, TransportEvent};

/// Owns the session state and the transport subscription
pub struct SessionController {
    handshake: Handshake,
    interpreter: CommandInterpreter,
    transport: Box<dyn Transport>,
    events: mpsc::Receiver<TransportEvent>,
    exit_code: Option<i32>,
}

impl SessionController {
    /// Create a session around an established transport
    pub fn new(
        handshake: Handshake,
        interpreter: CommandInterpreter,
        transport: Box<dyn Transport>,
        events: mpsc::Receiver<TransportEvent>,
    ) -> Self {
        Self {
            handshake,
            interpreter,
            transport,
            events,
            exit_code: None,
        }
    }

    /// Exit code of the session; `None` while the session is live
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Drive the session until the transport closes or a fatal protocol
    /// error occurs. Returns the exit code.
    pub async fn run(&mut self) -> i32 {
        while let Some(event) = self.events.recv().await {
            match event {
                TransportEvent::Frame(frame) => {
                    if self.handshake.is_complete() {
                        self.interpreter.submit(&frame);
                    } else {
                        self.process_handshake(&frame).await;
                        if self.exit_code.is_some() {
                            break;
                        }
                    }
                }
                TransportEvent::Closed { code, reason } => {
                    match reason {
                        Some(reason) => info!("connection closed [{code}]: {reason}"),
                        None => info!("connection closed [{code}]"),
                    }
                    self.set_exit_code(code);
                    break;
                }
            }
        }

        self.teardown().await
    }

    async fn process_handshake(&mut self, frame: &str) {
        debug!("handshake message: {frame}");
        match self.handshake.process(frame) {
            HandshakeOutcome::Reply {
                frame,
                version_warning,
            } => {
                if let Some(warning) = version_warning {
                    warn!("{warning}");
                }
                self.send_or_fail(&frame).await;
            }
            HandshakeOutcome::Established { reply, warning } => {
                if let Some(warning) = warning {
                    warn!("{warning}");
                }
                self.send_or_fail(&reply).await;
                if self.exit_code.is_none() {
                    info!("handshake complete; accepting command scripts");
                }
            }
            HandshakeOutcome::Failed(e) => {
                error!("{e}");
                self.set_exit_code(1);
            }
        }
    }

    async fn send_or_fail(&mut self, frame: &str) {
        if let Err(e) = self.transport.send(frame).await {
            error!("failed to send handshake frame: {e}");
            self.set_exit_code(1);
        }
    }

    /// First write wins; the session terminates exactly once
    fn set_exit_code(&mut self, code: i32) {
        if self.exit_code.is_none() {
            self.exit_code = Some(code);
        }
    }

    async fn teardown(&mut self) -> i32 {
        // Cancel outstanding pause/lock waits so no timers leak past the
        // session, then close the transport (a no-op if it already closed).
        self.interpreter.shutdown();
        self.transport.close().await;

        let code = self.exit_code.unwrap_or(0);
        self.exit_code = Some(code);
        code
    }
}

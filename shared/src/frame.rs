//! Handshake frame grammar for the Controlify text protocol
//!
//! Handshake frames are whole text frames:
//!
//! ```text
//! server -> client   controlify.io server <...>
//! client -> server   controlify.io client <version> <apiKey> <unitSpec>
//! server -> client   ok | deprecated <msg> | unsupported <msg>
//! client -> server   ok
//! ```

use thiserror::Error;

/// Prefix every server greeting must carry
pub const SERVER_GREETING_PREFIX: &str = "controlify.io server";

/// Prefix of the client hello reply
pub const CLIENT_HELLO_PREFIX: &str = "controlify.io client";

/// Acknowledgement frame exchanged by both sides to finish the handshake
pub const ACK_OK: &str = "ok";

const ACK_DEPRECATED_PREFIX: &str = "deprecated ";
const ACK_UNSUPPORTED_PREFIX: &str = "unsupported ";

/// Fatal protocol violations. Any of these terminates the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unrecognised handshake from server")]
    UnrecognisedGreeting,

    #[error("unrecognised handshake response from server")]
    UnrecognisedAck,

    /// The server refused this client version; the message echoes the frame
    #[error("{0}")]
    Unsupported(String),

    #[error("handshake message received after handshake finished")]
    HandshakeComplete,
}

/// Missing identity fields, collected in one pass so the operator sees every
/// problem at once instead of fixing them one restart at a time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("initialisation errors: {}", .missing.join(", "))]
pub struct IdentityError {
    pub missing: Vec<String>,
}

/// Validated client identity presented during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// The id of this unit
    pub unit_id: String,
    /// API key passed to the server
    pub api_key: String,
    /// Opaque JSON encoding of the unit's capability description
    pub unit_spec: String,
}

impl ClientIdentity {
    /// Validate identity fields, collecting every violation rather than
    /// stopping at the first.
    pub fn new(
        unit_id: impl Into<String>,
        api_key: impl Into<String>,
        unit_spec: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let unit_id = unit_id.into();
        let api_key = api_key.into();
        let unit_spec = unit_spec.into();

        let mut missing = Vec::new();
        if api_key.is_empty() {
            missing.push("missing api key".to_string());
        }
        if unit_id.is_empty() {
            missing.push("missing unit identifier".to_string());
        }
        if unit_spec.is_empty() {
            missing.push("missing unit spec".to_string());
        }

        if missing.is_empty() {
            Ok(Self {
                unit_id,
                api_key,
                unit_spec,
            })
        } else {
            Err(IdentityError { missing })
        }
    }

    /// Build the client hello frame sent in response to the server greeting
    pub fn hello_frame(&self, client_version: &str) -> String {
        format!(
            "{CLIENT_HELLO_PREFIX} {client_version} {} {}",
            self.api_key, self.unit_spec
        )
    }
}

/// Parsed ack-phase server frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAck {
    /// Plain acceptance
    Ok,
    /// Accepted, but the client version is deprecated; carries the full frame
    Deprecated(String),
    /// Refused; carries the full frame
    Unsupported(String),
}

impl ServerAck {
    /// Parse the second handshake message from the server
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        if frame == ACK_OK {
            Ok(Self::Ok)
        } else if frame.starts_with(ACK_DEPRECATED_PREFIX) {
            Ok(Self::Deprecated(frame.to_string()))
        } else if frame.starts_with(ACK_UNSUPPORTED_PREFIX) {
            Ok(Self::Unsupported(frame.to_string()))
        } else {
            Err(ProtocolError::UnrecognisedAck)
        }
    }
}

/// Parse the server version advertised at the end of a greeting, if present.
///
/// The last whitespace token of the greeting should be a semver number.
pub fn greeting_version(frame: &str) -> Option<(u64, u64, u64)> {
    let token = frame.split_whitespace().last()?;
    let mut parts = token.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_valid() {
        let identity = ClientIdentity::new("unit-1", "key", "{}").expect("valid identity");
        assert_eq!(identity.unit_id, "unit-1");
        assert_eq!(identity.api_key, "key");
    }

    #[test]
    fn test_identity_collects_all_missing_fields() {
        let err = ClientIdentity::new("", "", "").expect_err("should fail");
        assert_eq!(
            err.missing,
            vec![
                "missing api key".to_string(),
                "missing unit identifier".to_string(),
                "missing unit spec".to_string(),
            ]
        );
    }

    #[test]
    fn test_identity_missing_api_key_only() {
        let err = ClientIdentity::new("unit-1", "", "{}").expect_err("should fail");
        assert_eq!(err.missing, vec!["missing api key".to_string()]);
        assert!(err.to_string().contains("missing api key"));
    }

    #[test]
    fn test_hello_frame_format() {
        let identity = ClientIdentity::new("unit-1", "key123", r#"{"pins":4}"#).unwrap();
        assert_eq!(
            identity.hello_frame("0.1.0"),
            r#"controlify.io client 0.1.0 key123 {"pins":4}"#
        );
    }

    #[test]
    fn test_ack_parse_ok() {
        assert_eq!(ServerAck::parse("ok"), Ok(ServerAck::Ok));
    }

    #[test]
    fn test_ack_parse_deprecated_carries_frame() {
        assert_eq!(
            ServerAck::parse("deprecated v0.0.x clients are old"),
            Ok(ServerAck::Deprecated(
                "deprecated v0.0.x clients are old".to_string()
            ))
        );
    }

    #[test]
    fn test_ack_parse_unsupported_carries_frame() {
        assert_eq!(
            ServerAck::parse("unsupported upgrade required"),
            Ok(ServerAck::Unsupported(
                "unsupported upgrade required".to_string()
            ))
        );
    }

    #[test]
    fn test_ack_parse_rejects_everything_else() {
        assert_eq!(ServerAck::parse("okay"), Err(ProtocolError::UnrecognisedAck));
        assert_eq!(
            ServerAck::parse("deprecated"),
            Err(ProtocolError::UnrecognisedAck)
        );
        assert_eq!(ServerAck::parse(""), Err(ProtocolError::UnrecognisedAck));
    }

    #[test]
    fn test_greeting_version() {
        assert_eq!(
            greeting_version("controlify.io server 1.2.3"),
            Some((1, 2, 3))
        );
        assert_eq!(greeting_version("controlify.io server"), None);
        assert_eq!(greeting_version("controlify.io server v.next"), None);
    }
}

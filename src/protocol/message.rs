//! Handshake frames and inbound frame classification.
//!
//! # Handshake
//!
//! | Step | Direction | Frame |
//! |------|-----------|-------|
//! | 1 | hub → client | `{"type":"auth_required","ha_version":"..."}` |
//! | 2 | client → hub | `{"type":"auth","access_token":"..."}` |
//! | 3 | hub → client | `{"type":"auth_ok"}` or `{"type":"auth_invalid","message":"..."}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::MessageId;

use super::Response;

// ============================================================================
// AuthMessage
// ============================================================================

/// Credential frame sent in reply to `auth_required`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "auth")]
pub struct AuthMessage<'a> {
    /// Long-lived access token.
    pub access_token: &'a str,
}

impl<'a> AuthMessage<'a> {
    /// Creates a credential frame.
    #[inline]
    #[must_use]
    pub fn new(access_token: &'a str) -> Self {
        Self { access_token }
    }

    /// Serializes the frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// IncomingMessage
// ============================================================================

/// Any frame the hub can send, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// First handshake frame.
    AuthRequired {
        /// Hub version.
        #[serde(default)]
        ha_version: Option<String>,
    },

    /// Token accepted.
    AuthOk {
        /// Hub version.
        #[serde(default)]
        ha_version: Option<String>,
    },

    /// Token rejected.
    AuthInvalid {
        /// Rejection reason.
        #[serde(default)]
        message: Option<String>,
    },

    /// Command result.
    Result(Response),

    /// Heartbeat acknowledgement.
    Pong {
        /// Id of the `ping` being acknowledged.
        id: MessageId,
    },

    /// Subscription event.
    Event {
        /// Subscription id.
        #[serde(default)]
        id: Option<MessageId>,
        /// Event payload.
        #[serde(default)]
        event: Value,
    },

    /// Any other frame type.
    #[serde(other)]
    Unknown,
}

impl IncomingMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the frame is not a typed JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the frame type name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthRequired { .. } => "auth_required",
            Self::AuthOk { .. } => "auth_ok",
            Self::AuthInvalid { .. } => "auth_invalid",
            Self::Result(_) => "result",
            Self::Pong { .. } => "pong",
            Self::Event { .. } => "event",
            Self::Unknown => "unknown",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_auth_frame_is_wire_exact() {
        let frame = AuthMessage::new("abc123").to_frame().expect("serialize");
        let value: Value = serde_json::from_str(&frame).expect("parse");
        assert_eq!(value, json!({"type": "auth", "access_token": "abc123"}));
    }

    #[test]
    fn test_parse_auth_required() {
        let msg = IncomingMessage::parse(r#"{"type":"auth_required","ha_version":"2024.5.0"}"#)
            .expect("parse");
        assert_eq!(
            msg,
            IncomingMessage::AuthRequired {
                ha_version: Some("2024.5.0".into())
            }
        );
    }

    #[test]
    fn test_parse_auth_invalid() {
        let msg = IncomingMessage::parse(r#"{"type":"auth_invalid","message":"Invalid password"}"#)
            .expect("parse");
        assert_eq!(
            msg,
            IncomingMessage::AuthInvalid {
                message: Some("Invalid password".into())
            }
        );
    }

    #[test]
    fn test_parse_result() {
        let msg = IncomingMessage::parse(
            r#"{"id":12,"type":"result","success":true,"result":[1,2]}"#,
        )
        .expect("parse");

        match msg {
            IncomingMessage::Result(response) => {
                assert_eq!(response.id, MessageId::new(12));
                assert_eq!(response.result, Some(json!([1, 2])));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_pong_and_event() {
        let pong = IncomingMessage::parse(r#"{"id":3,"type":"pong"}"#).expect("parse");
        assert_eq!(pong, IncomingMessage::Pong { id: MessageId::new(3) });

        let event = IncomingMessage::parse(
            r#"{"id":2,"type":"event","event":{"event_type":"state_changed"}}"#,
        )
        .expect("parse");
        assert_eq!(event.kind(), "event");
    }

    #[test]
    fn test_parse_unknown_type() {
        let msg = IncomingMessage::parse(r#"{"type":"something_new","x":1}"#).expect("parse");
        assert_eq!(msg, IncomingMessage::Unknown);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(IncomingMessage::parse("not json").is_err());
        assert!(IncomingMessage::parse(r#"{"no_type":true}"#).is_err());
    }
}

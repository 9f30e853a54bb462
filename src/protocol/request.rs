//! Request and Response message types.
//!
//! Defines the command frame sent to the hub and the `result` frame that
//! answers it.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::MessageId;

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command request from client to hub.
///
/// # Format
///
/// ```json
/// {
///   "id": 7,
///   "type": "call_service",
///   "domain": "light",
///   "service": "turn_on"
/// }
/// ```
///
/// Parameters are flattened to the top level next to `id` and `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    /// Sequence number for request/response correlation.
    pub id: MessageId,

    /// Command name.
    #[serde(rename = "type")]
    pub command_type: String,

    /// Command parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Request {
    /// Creates a request from a command name and a flat parameter map.
    ///
    /// `id` and `type` keys in `params` are dropped; the envelope owns them.
    #[must_use]
    pub fn new(id: MessageId, command_type: impl Into<String>, mut params: Map<String, Value>) -> Self {
        params.remove("id");
        params.remove("type");
        Self {
            id,
            command_type: command_type.into(),
            params,
        }
    }

    /// Creates a request from a typed command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the command cannot be serialized.
    pub fn from_command(id: MessageId, command: Command) -> Result<Self> {
        let (command_type, params) = command.into_parts()?;
        Ok(Self::new(id, command_type, params))
    }

    /// Serializes the request to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Response
// ============================================================================

/// A `result` frame from hub to client.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 7, "type": "result", "success": true, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// {
///   "id": 7,
///   "type": "result",
///   "success": false,
///   "error": { "code": "not_found", "message": "Entity not found" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: MessageId,

    /// Whether the command succeeded.
    #[serde(default)]
    pub success: bool,

    /// Result payload (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error details (if failed).
    #[serde(default)]
    pub error: Option<RemoteError>,
}

/// Error details of a failed command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    /// Error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl Response {
    /// Creates a successful, payload-free response.
    ///
    /// Used for heartbeat acknowledgements, which carry no result.
    #[inline]
    #[must_use]
    pub fn acknowledged(id: MessageId) -> Self {
        Self {
            id,
            success: true,
            result: None,
            error: None,
        }
    }

    /// Extracts the result value, returning error if the command failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] carrying the remote code and message.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            return Ok(self.result.unwrap_or(Value::Null));
        }

        let (code, message) = match self.error {
            Some(RemoteError { code, message }) => {
                let code = if code.is_empty() {
                    "unknown_error".to_string()
                } else {
                    code
                };
                let message = if message.is_empty() {
                    code.clone()
                } else {
                    message
                };
                (code, message)
            }
            None => ("unknown_error".to_string(), "command failed".to_string()),
        };

        Err(Error::command(code, message))
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
    fn test_request_flattens_params() {
        let mut params = Map::new();
        params.insert("domain".into(), json!("light"));
        params.insert("service".into(), json!("turn_on"));

        let request = Request::new(MessageId::new(7), "call_service", params);
        let value = serde_json::to_value(&request).expect("serialize");

        assert_eq!(
            value,
            json!({"id": 7, "type": "call_service", "domain": "light", "service": "turn_on"})
        );
    }

    #[test]
    fn test_request_envelope_keys_win() {
        let mut params = Map::new();
        params.insert("id".into(), json!(999));
        params.insert("type".into(), json!("spoofed"));

        let request = Request::new(MessageId::new(1), "get_states", params);
        let frame = request.to_frame().expect("serialize");
        let value: Value = serde_json::from_str(&frame).expect("parse");

        assert_eq!(value, json!({"id": 1, "type": "get_states"}));
    }

    #[test]
    fn test_request_from_command() {
        let request =
            Request::from_command(MessageId::new(3), Command::GetStates).expect("request");
        assert_eq!(request.command_type, "get_states");
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_success_response() {
        let response: Response = serde_json::from_value(json!({
            "id": 4,
            "type": "result",
            "success": true,
            "result": {"title": "Example"}
        }))
        .expect("parse");

        let value = response.into_result().expect("should succeed");
        assert_eq!(value, json!({"title": "Example"}));
    }

    #[test]
    fn test_success_without_result_is_null() {
        let response: Response =
            serde_json::from_value(json!({"id": 4, "type": "result", "success": true}))
                .expect("parse");
        assert_eq!(response.into_result().expect("ok"), Value::Null);
    }

    #[test]
    fn test_error_response() {
        let response: Response = serde_json::from_value(json!({
            "id": 5,
            "type": "result",
            "success": false,
            "error": {"code": "not_found", "message": "Entity not found"}
        }))
        .expect("parse");

        match response.into_result() {
            Err(Error::Command { code, message }) => {
                assert_eq!(code, "not_found");
                assert_eq!(message, "Entity not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_error_response_without_details() {
        let response: Response =
            serde_json::from_value(json!({"id": 5, "type": "result", "success": false}))
                .expect("parse");
        let err = response.into_result().expect_err("should fail");
        assert!(matches!(err, Error::Command { ref code, .. } if code == "unknown_error"));
    }

    #[test]
    fn test_acknowledged() {
        let response = Response::acknowledged(MessageId::new(9));
        assert!(response.success);
        assert_eq!(response.into_result().expect("ok"), Value::Null);
    }
}

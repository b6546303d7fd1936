//! Uniform reply envelope.
//!
//! Every bridge command, in either direction, is answered with a [`Reply`].
//!
//! # Format
//!
//! Success:
//! ```json
//! { "success": true, "requestId": "881", "request": { ... } }
//! ```
//!
//! Failure:
//! ```json
//! { "success": false, "action": "replayRequest", "error": "Network error: ..." }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Reply
// ============================================================================

/// A success/failure envelope with a free-form payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Whether the command succeeded.
    pub success: bool,

    /// Command the reply belongs to, for frame commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command-specific payload fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Reply {
    /// Creates an empty success reply.
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            action: None,
            error: None,
            payload: Map::new(),
        }
    }

    /// Creates a failure reply.
    #[inline]
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: None,
            error: Some(error.into()),
            payload: Map::new(),
        }
    }

    /// Creates a failure reply from an error.
    #[inline]
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        Self::failure(error.to_string())
    }

    /// Sets the action name.
    #[inline]
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Adds a payload field.
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Returns a payload field.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Gets a string payload field.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a boolean payload field.
    ///
    /// Returns false if key not found or not a boolean.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.payload
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }

    /// Converts a failure envelope into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bridge`] carrying the envelope's error text, or
    /// `fallback` when the envelope has none.
    pub fn into_result(self, fallback: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::bridge(
                self.error.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

impl From<Result<Reply>> for Reply {
    fn from(result: Result<Reply>) -> Self {
        result.unwrap_or_else(|e| Self::from_error(&e))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let reply = Reply::ok().with_field("requestId", "881");
        let json = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(json, serde_json::json!({ "success": true, "requestId": "881" }));
    }

    #[test]
    fn test_failure_shape() {
        let reply = Reply::failure("boom").with_action("click");
        let json = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "action": "click", "error": "boom" })
        );
    }

    #[test]
    fn test_round_trip_keeps_payload() {
        let text = r#"{"success":true,"action":"replayRequest","response":{"status":200,"text":"ok"}}"#;
        let reply: Reply = serde_json::from_str(text).expect("parse");
        assert_eq!(reply.action.as_deref(), Some("replayRequest"));
        assert_eq!(reply.get("response").and_then(|r| r.get("status")), Some(&Value::from(200)));
    }

    #[test]
    fn test_into_result_uses_fallback() {
        let reply = Reply {
            success: false,
            action: None,
            error: None,
            payload: Map::new(),
        };
        let err = reply.into_result("Failed to get request for replay.").unwrap_err();
        assert_eq!(err.to_string(), "Failed to get request for replay.");
    }

    #[test]
    fn test_from_result() {
        let reply: Reply = Err(Error::no_match("https://embed.example.com/widget")).into();
        assert!(!reply.success);
        assert!(reply.error.is_some_and(|e| e.contains("Request not found")));
    }
}

//! Bridge command definitions.
//!
//! Two command families cross the bridge:
//!
//! | Family | Tag | Direction |
//! |--------|-----|-----------|
//! | [`BackgroundCommand`] | `action` | frame → privileged background |
//! | [`FrameCommand`] | `message` | embedding page → frame |
//!
//! Each variant is answered with a [`super::Reply`].

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::RequestId;

use super::Reply;

// ============================================================================
// BackgroundCommand
// ============================================================================

/// Control messages a frame sends to the privileged context.
///
/// The sender's tab is taken from the channel, never from the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum BackgroundCommand {
    /// Look up a captured request for replay.
    #[serde(rename = "getRequestForReplay")]
    GetRequestForReplay {
        /// Substring the captured URL must contain.
        url: String,
        /// Headers the captured request must carry with equal values.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
        /// Caller's frame href (bucket key).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        href: Option<String>,
    },

    /// Drop every captured request of the sender's tab.
    #[serde(rename = "clearTabCache")]
    ClearTabCache,

    /// Release one captured request after replay.
    #[serde(rename = "clearReplayedRequest")]
    ClearReplayedRequest {
        /// Request to release.
        #[serde(rename = "requestId")]
        request_id: RequestId,
        /// Caller's frame href (bucket key).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        href: Option<String>,
    },
}

// ============================================================================
// FrameCommand
// ============================================================================

/// Commands the embedding page sends into a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message")]
pub enum FrameCommand {
    /// Return the frame's serialized document.
    #[serde(rename = "getDOM")]
    GetDom,

    /// Scroll an element into view, or the document to `"bottom"`.
    #[serde(rename = "scrollTo")]
    ScrollTo {
        /// CSS selector or `"bottom"`.
        selector: String,
    },

    /// Click an element by selector or viewport point.
    #[serde(rename = "click")]
    Click {
        /// CSS selector.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        /// Viewport x.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        /// Viewport y.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
    },

    /// Type text into an element by selector or viewport point.
    #[serde(rename = "textInput")]
    TextInput {
        /// Text to enter.
        #[serde(default)]
        text: Option<String>,
        /// CSS selector.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        /// Viewport x.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        /// Viewport y.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
    },

    /// Wait until an element matching the selector exists.
    #[serde(rename = "waitForElement")]
    WaitForElement {
        /// CSS selector.
        selector: String,
        /// Timeout in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        /// Poll interval in milliseconds.
        #[serde(
            rename = "pollInterval",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        poll_interval: Option<u64>,
    },

    /// Replay a captured request from this frame.
    #[serde(rename = "replayRequest")]
    ReplayRequest {
        /// Substring of the captured request URL.
        url: String,
        /// Headers the captured request must carry.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
    },
}

impl FrameCommand {
    /// Parses a raw bridge message.
    ///
    /// # Errors
    ///
    /// Returns the failure envelope to send back: unknown message type, or
    /// invalid arguments for a known one.
    pub fn parse(message: &Value) -> Result<Self, Reply> {
        Self::deserialize(message).map_err(|e| {
            let kind = message
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("undefined");
            if Self::is_known(kind) {
                Reply::failure(format!("Invalid argument: {e}")).with_action(kind)
            } else {
                Reply::failure(format!("Unknown message type: {kind}"))
            }
        })
    }

    /// Returns the wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetDom => "getDOM",
            Self::ScrollTo { .. } => "scrollTo",
            Self::Click { .. } => "click",
            Self::TextInput { .. } => "textInput",
            Self::WaitForElement { .. } => "waitForElement",
            Self::ReplayRequest { .. } => "replayRequest",
        }
    }

    fn is_known(kind: &str) -> bool {
        matches!(
            kind,
            "getDOM" | "scrollTo" | "click" | "textInput" | "waitForElement" | "replayRequest"
        )
    }
}

// ============================================================================
// FrameReady
// ============================================================================

/// Readiness signal a frame posts to its embedding page.
///
/// The page opens the bridge channel for the frame after receiving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReady {
    /// Always `"iframeContentLoaded"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Frame location.
    pub href: String,
    /// Always `"ready"`.
    pub status: String,
}

impl FrameReady {
    /// Creates the readiness signal for a frame location.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            kind: "iframeContentLoaded".to_string(),
            href: href.into(),
            status: "ready".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request_for_replay_wire() {
        let command: BackgroundCommand = serde_json::from_str(
            r#"{"action":"getRequestForReplay","url":"submit","headers":{"X-A":"1"},"href":"https://embed.example.com/widget"}"#,
        )
        .expect("parse");

        match command {
            BackgroundCommand::GetRequestForReplay { url, headers, href } => {
                assert_eq!(url, "submit");
                assert_eq!(headers.map(|h| h.len()), Some(1));
                assert_eq!(href.as_deref(), Some("https://embed.example.com/widget"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_clear_tab_cache_wire() {
        let json = serde_json::to_string(&BackgroundCommand::ClearTabCache).expect("serialize");
        assert_eq!(json, r#"{"action":"clearTabCache"}"#);
    }

    #[test]
    fn test_clear_replayed_request_without_href() {
        let command: BackgroundCommand =
            serde_json::from_str(r#"{"action":"clearReplayedRequest","requestId":"17"}"#)
                .expect("parse");
        assert_eq!(
            command,
            BackgroundCommand::ClearReplayedRequest {
                request_id: RequestId::new("17"),
                href: None,
            }
        );
    }

    #[test]
    fn test_frame_command_parse() {
        let value = serde_json::json!({ "message": "waitForElement", "selector": "#login" });
        let command = FrameCommand::parse(&value).expect("parse");
        assert_eq!(command.name(), "waitForElement");
        assert!(matches!(
            command,
            FrameCommand::WaitForElement { timeout: None, poll_interval: None, .. }
        ));
    }

    #[test]
    fn test_frame_command_unknown() {
        let value = serde_json::json!({ "message": "teleport" });
        let reply = FrameCommand::parse(&value).unwrap_err();
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("Unknown message type: teleport"));
    }

    #[test]
    fn test_frame_command_invalid_arguments() {
        let value = serde_json::json!({ "message": "scrollTo" });
        let reply = FrameCommand::parse(&value).unwrap_err();
        assert_eq!(reply.action.as_deref(), Some("scrollTo"));
        assert!(reply.error.is_some_and(|e| e.starts_with("Invalid argument")));
    }

    #[test]
    fn test_frame_ready_wire() {
        let json = serde_json::to_value(FrameReady::new("https://embed.example.com/widget"))
            .expect("serialize");
        assert_eq!(json["type"], "iframeContentLoaded");
        assert_eq!(json["status"], "ready");
    }
}

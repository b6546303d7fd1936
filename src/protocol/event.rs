//! Browser event types.
//!
//! Events are notifications from the browser's navigation, network, tab and
//! cookie subsystems into the privileged background context. They arrive as
//! `{method, params}` envelopes and are parsed into [`ParsedEvent`].
//!
//! # Event Types
//!
//! | Method | Parsed as | Consumer |
//! |--------|-----------|----------|
//! | `webNavigation.onCommitted` | [`ParsedEvent::NavigationCommitted`] | frame tracker |
//! | `webNavigation.onCompleted` | [`ParsedEvent::NavigationCompleted`] | cookie normalizer |
//! | `webRequest.onBeforeRequest` | [`ParsedEvent::BeforeRequest`] | capture log |
//! | `webRequest.onBeforeSendHeaders` | [`ParsedEvent::BeforeSendHeaders`] | capture log |
//! | `tabs.onRemoved` | [`ParsedEvent::TabRemoved`] | store cascade |
//! | `cookies.onChanged` | [`ParsedEvent::CookieChanged`] | cookie normalizer |

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{FrameId, RequestId, TabId};

use super::{Cookie, RequestBodyDescriptor};

// ============================================================================
// Event
// ============================================================================

/// A raw browser event.
///
/// # Format
///
/// ```json
/// {
///   "method": "webRequest.onBeforeRequest",
///   "params": { "tabId": 4, "frameId": 12, "requestId": "881", ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event name in `api.onName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Creates an event from a method name and params.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the API name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "webNavigation.onCommitted" => self
                .details()
                .map_or_else(|e| e, ParsedEvent::NavigationCommitted),
            "webNavigation.onCompleted" => self
                .details()
                .map_or_else(|e| e, ParsedEvent::NavigationCompleted),
            "webRequest.onBeforeRequest" => {
                self.details().map_or_else(|e| e, ParsedEvent::BeforeRequest)
            }
            "webRequest.onBeforeSendHeaders" => self
                .details()
                .map_or_else(|e| e, ParsedEvent::BeforeSendHeaders),
            "tabs.onRemoved" => ParsedEvent::TabRemoved {
                tab_id: self
                    .params
                    .get("tabId")
                    .and_then(Value::as_i64)
                    .and_then(TabId::new),
            },
            "cookies.onChanged" => self.details().map_or_else(|e| e, ParsedEvent::CookieChanged),
            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Deserializes params into a details struct.
    fn details<T: DeserializeOwned>(&self) -> Result<T, ParsedEvent> {
        T::deserialize(&self.params).map_err(|e| ParsedEvent::Malformed {
            method: self.method.clone(),
            message: e.to_string(),
        })
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// A frame committed a navigation.
    NavigationCommitted(NavigationDetails),

    /// A frame finished loading.
    NavigationCompleted(NavigationDetails),

    /// A request is about to leave the browser.
    BeforeRequest(RequestDetails),

    /// A request's headers were finalized.
    BeforeSendHeaders(HeaderDetails),

    /// A tab was closed.
    TabRemoved {
        /// Closed tab (`None` if the ID was invalid).
        tab_id: Option<TabId>,
    },

    /// A cookie was set, overwritten or removed.
    CookieChanged(CookieChange),

    /// Known event whose params did not parse.
    Malformed {
        /// Event method.
        method: String,
        /// Parser message.
        message: String,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Event Details
// ============================================================================

/// Navigation commit/completion details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NavigationDetails {
    /// Raw tab ID (`-1` outside tabs).
    #[serde(rename = "tabId")]
    pub tab_id: i64,
    /// Frame ID (`0` = top).
    #[serde(rename = "frameId")]
    pub frame_id: FrameId,
    /// Committed URL.
    pub url: String,
}

impl NavigationDetails {
    /// Returns the tab, if the event belongs to one.
    #[inline]
    #[must_use]
    pub fn tab(&self) -> Option<TabId> {
        TabId::new(self.tab_id)
    }
}

/// Request initiation details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestDetails {
    /// Raw tab ID (`-1` outside tabs).
    #[serde(rename = "tabId")]
    pub tab_id: i64,
    /// Originating frame.
    #[serde(rename = "frameId")]
    pub frame_id: FrameId,
    /// Network layer request ID.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    /// Request URL.
    pub url: String,
    /// HTTP method.
    #[serde(default = "default_method")]
    pub method: String,
    /// Resource type (`sub_frame`, `xmlhttprequest`, ...).
    #[serde(rename = "type", alias = "resourceType", default = "default_resource_type")]
    pub resource_type: String,
    /// Body descriptor, when the request carries one.
    #[serde(rename = "requestBody", default)]
    pub request_body: Option<RequestBodyDescriptor>,
}

impl RequestDetails {
    /// Returns the tab, if the event belongs to one.
    #[inline]
    #[must_use]
    pub fn tab(&self) -> Option<TabId> {
        TabId::new(self.tab_id)
    }

    /// Returns `true` if this request loads a sub-frame document.
    #[inline]
    #[must_use]
    pub fn is_sub_frame(&self) -> bool {
        self.resource_type == SUB_FRAME
    }
}

/// Header finalization details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderDetails {
    /// Raw tab ID (`-1` outside tabs).
    #[serde(rename = "tabId")]
    pub tab_id: i64,
    /// Originating frame.
    #[serde(rename = "frameId")]
    pub frame_id: FrameId,
    /// Network layer request ID.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    /// Request URL.
    pub url: String,
    /// Resource type.
    #[serde(rename = "type", alias = "resourceType", default = "default_resource_type")]
    pub resource_type: String,
    /// Finalized headers in browser order.
    #[serde(rename = "requestHeaders", default)]
    pub request_headers: Vec<HttpHeader>,
}

impl HeaderDetails {
    /// Returns the tab, if the event belongs to one.
    #[inline]
    #[must_use]
    pub fn tab(&self) -> Option<TabId> {
        TabId::new(self.tab_id)
    }

    /// Returns `true` if this request loads a sub-frame document.
    #[inline]
    #[must_use]
    pub fn is_sub_frame(&self) -> bool {
        self.resource_type == SUB_FRAME
    }
}

/// One request header. Binary-valued headers have no text `value`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpHeader {
    /// Header name, case as observed.
    pub name: String,
    /// Header value.
    #[serde(default)]
    pub value: Option<String>,
}

/// Cookie change notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CookieChange {
    /// `true` when the cookie was deleted.
    #[serde(default)]
    pub removed: bool,
    /// The affected cookie.
    pub cookie: Cookie,
}

const SUB_FRAME: &str = "sub_frame";

fn default_method() -> String {
    "GET".to_string()
}

fn default_resource_type() -> String {
    "other".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_request_parsing() {
        let json_str = r#"{
            "method": "webRequest.onBeforeRequest",
            "params": {
                "tabId": 4,
                "frameId": 12,
                "requestId": "881",
                "url": "https://api.example.com/submit",
                "method": "POST",
                "type": "xmlhttprequest",
                "requestBody": { "formData": { "a": ["1"] } }
            }
        }"#;

        let event: Event = serde_json::from_str(json_str).expect("parse event");
        assert_eq!(event.module(), "webRequest");

        match event.parse() {
            ParsedEvent::BeforeRequest(details) => {
                assert_eq!(details.tab().map(TabId::as_u32), Some(4));
                assert_eq!(details.frame_id, FrameId::new(12));
                assert_eq!(details.request_id.as_str(), "881");
                assert!(!details.is_sub_frame());
                let body = details.request_body.expect("body");
                assert_eq!(
                    body.form_data.and_then(|f| f.get("a").map(<[String]>::to_vec)),
                    Some(vec!["1".to_string()])
                );
            }
            other => panic!("unexpected parsed event: {other:?}"),
        }
    }

    #[test]
    fn test_headers_parsing() {
        let event = Event::new(
            "webRequest.onBeforeSendHeaders",
            serde_json::json!({
                "tabId": 4,
                "frameId": 12,
                "requestId": 881,
                "url": "https://api.example.com/submit",
                "resourceType": "sub_frame",
                "requestHeaders": [
                    { "name": "X-Token", "value": "abc" },
                    { "name": "X-Binary", "binaryValue": [1, 2] }
                ]
            }),
        );

        match event.parse() {
            ParsedEvent::BeforeSendHeaders(details) => {
                assert!(details.is_sub_frame());
                assert_eq!(details.request_headers.len(), 2);
                assert_eq!(details.request_headers[1].value, None);
            }
            other => panic!("unexpected parsed event: {other:?}"),
        }
    }

    #[test]
    fn test_background_request_has_no_tab() {
        let event = Event::new(
            "webNavigation.onCommitted",
            serde_json::json!({ "tabId": -1, "frameId": 3, "url": "https://a.test/" }),
        );
        match event.parse() {
            ParsedEvent::NavigationCommitted(details) => assert!(details.tab().is_none()),
            other => panic!("unexpected parsed event: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_event() {
        let event = Event::new(
            "webRequest.onBeforeRequest",
            serde_json::json!({ "tabId": 1 }),
        );
        assert!(matches!(event.parse(), ParsedEvent::Malformed { .. }));
    }

    #[test]
    fn test_unknown_event() {
        let event = Event::new("runtime.onStartup", serde_json::json!({}));
        match event.parse() {
            ParsedEvent::Unknown { method, .. } => assert_eq!(method, "runtime.onStartup"),
            other => panic!("expected Unknown variant, got {other:?}"),
        }
    }
}

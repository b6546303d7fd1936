//! Type-safe identifiers for tabs, frames and requests.
//!
//! Newtype wrappers keep the browser's numeric tab/frame IDs, the network
//! layer's opaque request IDs and the bridge's message IDs from being mixed
//! up at compile time.
//!
//! | Type | Source | Wire form |
//! |------|--------|-----------|
//! | [`TabId`] | Browser tabs API | `tabId` number |
//! | [`FrameId`] | Browser navigation API | `frameId` number, `0` = top |
//! | [`FrameHref`] | Committed frame URL | string |
//! | [`RequestId`] | Network observation layer | `requestId` string |
//! | [`MessageId`] | Bridge correlation | UUID string |

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ============================================================================
// TabId
// ============================================================================

/// Browser tab identifier.
///
/// The browser reports `-1` for requests that are not tied to a tab, so
/// construction from the raw wire value is fallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab ID, returning `None` for negative or out-of-range values.
    #[inline]
    #[must_use]
    pub fn new(id: i64) -> Option<Self> {
        u32::try_from(id).ok().map(Self)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TabId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::new(raw).ok_or_else(|| serde::de::Error::custom(format!("invalid tab id: {raw}")))
    }
}

// ============================================================================
// FrameId
// ============================================================================

/// Frame identifier within a tab. `0` is the top-level document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    /// Creates a frame ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the top-level frame ID.
    #[inline]
    #[must_use]
    pub const fn main() -> Self {
        Self(0)
    }

    /// Returns `true` for the top-level frame.
    #[inline]
    #[must_use]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FrameHref
// ============================================================================

/// Logical page identity of an embedded frame: the URL it last committed.
///
/// Buckets in the request store are keyed by this rather than by
/// [`FrameId`], because the frame context only knows its own location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameHref(String);

impl FrameHref {
    /// Creates a frame href.
    #[inline]
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    /// Returns the href as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FrameHref {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameHref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameHref {
    fn from(href: &str) -> Self {
        Self::new(href)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Opaque request identifier assigned by the network observation layer.
///
/// Unique only for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a request ID.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Chrome sends numeric-looking strings, other sources send bare numbers.
impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

// ============================================================================
// MessageId
// ============================================================================

/// Correlation ID for one bridge request/reply pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generates a fresh random message ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_rejects_negative() {
        assert!(TabId::new(-1).is_none());
        assert_eq!(TabId::new(7).map(TabId::as_u32), Some(7));
    }

    #[test]
    fn test_tab_id_deserialize() {
        let tab: TabId = serde_json::from_str("12").expect("parse");
        assert_eq!(tab.as_u32(), 12);
        assert!(serde_json::from_str::<TabId>("-1").is_err());
    }

    #[test]
    fn test_frame_id_main() {
        assert!(FrameId::main().is_main());
        assert!(!FrameId::new(3).is_main());
    }

    #[test]
    fn test_request_id_accepts_numbers() {
        let from_text: RequestId = serde_json::from_str("\"4211\"").expect("parse");
        let from_number: RequestId = serde_json::from_str("4211").expect("parse");
        assert_eq!(from_text, from_number);
    }

    #[test]
    fn test_message_ids_are_unique() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }
}

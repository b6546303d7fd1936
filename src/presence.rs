//! Load-time announcements.
//!
//! When the frame script loads it announces itself in one of two ways:
//!
//! | Frame | Announcement |
//! |-------|--------------|
//! | Top-level | Hidden marker element plus a `…-present` window event |
//! | Embedded | [`FrameReady`] posted to the parent |
//!
//! The embedding page uses the marker to detect that the extension is
//! installed, and the readiness signal to open a bridge channel.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ReplayConfig;
use crate::protocol::FrameReady;

// ============================================================================
// Constants
// ============================================================================

/// Prefix shared by the marker element ID and the presence event name.
pub const DEFAULT_PREFIX: &str = "infyverse-extension";

// ============================================================================
// Types
// ============================================================================

/// Where the script is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRole {
    /// The tab's top-level document.
    TopLevel,
    /// A document embedded in another.
    Embedded,
}

/// Hidden element carrying the extension version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMarker {
    /// Element ID.
    pub id: String,
    /// Value of `data-version`.
    pub version: String,
    /// Always `true`: the element is `display: none`.
    pub hidden: bool,
}

/// Bubbling window event announcing the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Event name, `<prefix>-present`.
    pub name: String,
    /// Event detail.
    pub detail: PresenceDetail,
}

/// Detail of a [`PresenceEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceDetail {
    /// Extension version.
    pub version: String,
}

/// Marker plus event for a top-level document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSignal {
    /// Element to append to the body.
    pub marker: PresenceMarker,
    /// Event to dispatch on the window.
    pub event: PresenceEvent,
}

impl PresenceSignal {
    /// Builds the signal for a version under a naming prefix.
    #[must_use]
    pub fn new(prefix: &str, version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            marker: PresenceMarker {
                id: format!("{prefix}-data"),
                version: version.clone(),
                hidden: true,
            },
            event: PresenceEvent {
                name: format!("{prefix}-present"),
                detail: PresenceDetail { version },
            },
        }
    }
}

/// What a freshly loaded frame script announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// Top-level presence handshake.
    Presence(PresenceSignal),
    /// Embedded frame readiness.
    Ready(FrameReady),
}

/// Picks the announcement for a frame.
#[must_use]
pub fn announce(role: FrameRole, href: &str, config: &ReplayConfig) -> Announcement {
    match role {
        FrameRole::TopLevel => {
            debug!(href, version = %config.extension_version, "Announcing extension presence");
            Announcement::Presence(PresenceSignal::new(
                DEFAULT_PREFIX,
                config.extension_version.as_str(),
            ))
        }
        FrameRole::Embedded => {
            debug!(href, "Announcing frame readiness");
            Announcement::Ready(FrameReady::new(href))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Wire message types.
//!
//! This module defines every JSON shape that crosses an execution-context
//! boundary: browser events into the background context, bridge commands
//! in both directions, and the uniform reply envelope.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Event`] | Browser → Background | Navigation, network, tab, cookie notifications |
//! | [`BackgroundCommand`] | Frame → Background | Cache lookup and release |
//! | [`FrameCommand`] | Page → Frame | DOM automation and replay |
//! | [`FrameReady`] | Frame → Page | Bridge readiness signal |
//! | [`Reply`] | Any | Success/failure envelope |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Tagged command enums |
//! | `cookie` | Browser cookie shapes |
//! | `event` | Browser events and parsed details |
//! | `reply` | Reply envelope |
//! | `request` | Captured request and body descriptor |

// ============================================================================
// Submodules
// ============================================================================

/// Tagged command enums.
pub mod command;

/// Browser cookie types.
pub mod cookie;

/// Browser event types.
pub mod event;

/// Uniform reply envelope.
pub mod reply;

/// Captured request types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{BackgroundCommand, FrameCommand, FrameReady};
pub use cookie::{Cookie, CookieUpdate, SameSite};
pub use event::{
    CookieChange, Event, HeaderDetails, HttpHeader, NavigationDetails, ParsedEvent, RequestDetails,
};
pub use reply::Reply;
pub use request::{CapturedRequest, ChunkBytes, FormData, RawChunk, RequestBodyDescriptor};

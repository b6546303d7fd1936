//! Privileged background context.
//!
//! Observes browser navigation and network events, caches requests issued
//! by non-top frames, and answers replay lookups from frame agents.
//!
//! # Data Flow
//!
//! ```text
//! webNavigation.onCommitted ──► FrameTracker
//! webRequest.onBeforeRequest ─┐
//! webRequest.onBeforeSendHeaders ─► CaptureLog ──► RequestStore ◄── ReplayBroker ◄── BackgroundCommand
//! tabs.onRemoved ─────────────┘
//! webNavigation.onCompleted ──► CookieNormalizer ──► CookieJar
//! cookies.onChanged ─────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `broker` | Bridge command handlers |
//! | `capture` | Network capture hooks and body reconstruction |
//! | `cookies` | Cookie attribute normalization |
//! | `engine` | Engine, event loop and handles |
//! | `log` | Event-sourced capture log |
//! | `store` | Request cache |
//! | `tracker` | Frame href tracking |

// ============================================================================
// Submodules
// ============================================================================

/// Bridge command handlers.
pub mod broker;

/// Network capture hooks.
pub mod capture;

/// Cookie attribute normalization.
pub mod cookies;

/// Engine and event loop.
pub mod engine;

/// Capture event log.
pub mod log;

/// Request cache.
pub mod store;

/// Frame href tracking.
pub mod tracker;

// ============================================================================
// Re-exports
// ============================================================================

pub use broker::ReplayBroker;
pub use capture::CapturedBody;
pub use cookies::{CookieJar, CookieNormalizer, cookie_url, normalize};
pub use engine::{Background, BackgroundHandle, BackgroundLink};
pub use log::{Applied, CaptureEvent, CaptureLog, LogRecord};
pub use store::{InsertOutcome, RequestKey, RequestStore};
pub use tracker::FrameTracker;

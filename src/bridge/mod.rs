//! Cross-context bridge.
//!
//! Carries commands between the three execution contexts:
//!
//! ```text
//! ┌──────────────┐  FrameChannel   ┌──────────────┐  BackgroundPort  ┌──────────────┐
//! │ Embedding    │ ──────────────► │ Frame agent  │ ───────────────► │ Background   │
//! │ page         │ ◄── ReplyPort ─ │ (per iframe) │ ◄──── Reply ──── │ engine       │
//! └──────────────┘                 └──────────────┘                  └──────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Page-to-frame channel, inbox and registry |
//! | `port` | One-shot reply port and background seam |

// ============================================================================
// Submodules
// ============================================================================

/// Page-to-frame channel.
pub mod channel;

/// Reply ports and the background seam.
pub mod port;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{BridgeMessage, FrameChannel, FrameInbox, FrameRegistry};
pub use port::{BackgroundPort, ReplyPort};

//! Frame Replay - cross-frame request capture and replay for browser extensions.
//!
//! This library captures the network requests that embedded (cross-origin)
//! frames issue, caches them per tab and frame, and re-issues a chosen
//! request later from inside the frame that made it, so the replay carries
//! the frame's own cookies and origin.
//!
//! # Architecture
//!
//! Three execution contexts cooperate over message passing:
//!
//! - **Background (privileged)**: observes navigation and network events,
//!   owns the request cache, answers lookups
//! - **Frame agent (per iframe)**: runs DOM commands and replays requests
//! - **Embedding page**: drives frames through a per-frame bridge channel
//!
//! Key design principles:
//!
//! - The background owns all capture state; every mutation happens inside
//!   one event or command handler
//! - Every bridge request carries its own one-shot reply port
//! - Failures travel as `{success: false, error}` envelopes, never panics
//! - A replayed request is released exactly once, whatever the outcome
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use frame_replay::background::Background;
//! use frame_replay::frame::{FrameAgent, HttpFetcher};
//! use frame_replay::protocol::Event;
//! use frame_replay::{ReplayConfig, Result, TabId};
//! # use frame_replay::frame::DomDriver;
//! # fn dom() -> Arc<dyn DomDriver> { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ReplayConfig::default();
//!     let (background, _task) = Background::new(&config).spawn();
//!
//!     // Feed browser events into the background.
//!     background.emit(Event::new(
//!         "webNavigation.onCommitted",
//!         serde_json::json!({ "tabId": 4, "frameId": 12, "url": "https://embed.example.com/widget" }),
//!     ))?;
//!
//!     // Run an agent inside the frame.
//!     let tab = TabId::new(4).expect("non-negative tab id");
//!     let agent = FrameAgent::new(
//!         "https://embed.example.com/widget",
//!         dom(),
//!         Arc::new(background.link(tab)),
//!         Arc::new(HttpFetcher::new(&config)?),
//!         &config,
//!     );
//!
//!     let reply = agent
//!         .handle(&serde_json::json!({ "message": "replayRequest", "url": "api.example.com/submit" }))
//!         .await;
//!     println!("{}", serde_json::to_string(&reply)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`background`] | Capture cache, broker, cookie normalizer, event loop |
//! | [`bridge`] | Page-to-frame channels and reply ports |
//! | [`config`] | Timing and client configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`frame`] | Frame agent, DOM automation, replay executor |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`presence`] | Load-time announcements |
//! | [`protocol`] | Wire message types |

// ============================================================================
// Modules
// ============================================================================

/// Privileged background context.
///
/// - [`background::Background`] - engine owning the capture state
/// - [`background::RequestStore`] - per tab and frame request cache
/// - [`background::CookieNormalizer`] - `SameSite` rewriting
pub mod background;

/// Cross-context bridge.
pub mod bridge;

/// Engine configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Frame-side context.
pub mod frame;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Load-time announcements.
pub mod presence;

/// Wire message types.
///
/// Browser events, bridge commands and the reply envelope.
pub mod protocol;

// ============================================================================
// Re-exports
// ============================================================================

// Background types
pub use background::{Background, BackgroundHandle, BackgroundLink, RequestStore};

// Bridge types
pub use bridge::{BackgroundPort, FrameChannel, FrameInbox, FrameRegistry};

// Configuration
pub use config::ReplayConfig;

// Error types
pub use error::{Error, Result};

// Frame types
pub use frame::{FrameAgent, HttpFetcher, ReplayExecutor};

// Identifier types
pub use identifiers::{FrameHref, FrameId, MessageId, RequestId, TabId};

// Protocol types
pub use protocol::{BackgroundCommand, CapturedRequest, FrameCommand, FrameReady, Reply};

//! Frame-side context.
//!
//! Everything that runs inside an embedded frame: the agent answering the
//! embedding page, the DOM automation commands, and the replay executor
//! with its HTTP seam.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `agent` | Bridge message dispatch |
//! | `dom` | DOM driver seam and automation commands |
//! | `executor` | Replay preparation and release |
//! | `fetch` | Fetcher seam and `reqwest` implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Bridge message dispatch.
pub mod agent;

/// DOM automation.
pub mod dom;

/// Replay executor.
pub mod executor;

/// Outbound HTTP.
pub mod fetch;

// ============================================================================
// Re-exports
// ============================================================================

pub use agent::FrameAgent;
pub use dom::{DomCommands, DomDriver, ElementRef, FoundBy, Target, wait_for_element};
pub use executor::{ReplayExecutor, prepare};
pub use fetch::{FetchBody, FetchRequest, FetchResponse, Fetcher, HttpFetcher};

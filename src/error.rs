//! Error types for frame-replay.
//!
//! Every failure the engine can report is a variant here. Lookup, decode and
//! transport failures are never fatal: they travel back to the caller as
//! `{success: false, error}` envelopes (see [`crate::protocol::Reply`]),
//! and the display string of the variant is the diagnostic text.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Lookup | [`Error::HrefMissing`], [`Error::TabCacheMissing`], [`Error::FrameCacheMissing`], [`Error::NoMatch`] |
//! | Decode | [`Error::BodyDecode`] |
//! | Transport | [`Error::Transport`], [`Error::Http`] |
//! | Bridge | [`Error::Bridge`], [`Error::ChannelClosed`], [`Error::Timeout`] |
//! | DOM | [`Error::ElementNotFound`], [`Error::Dom`] |
//! | Cookies | [`Error::Cookie`] |
//! | Input | [`Error::InvalidArgument`], [`Error::Config`] |
//! | External | [`Error::Json`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::{FrameHref, TabId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// The caller did not say which frame it is.
    #[error("href not provided for {operation}")]
    HrefMissing {
        /// Bridge action that was missing the href.
        operation: &'static str,
    },

    /// Nothing has been captured for the tab.
    #[error("No requests logged for this tab.")]
    TabCacheMissing {
        /// Tab that was searched.
        tab_id: TabId,
    },

    /// Nothing has been captured for the frame href within the tab.
    #[error("No requests logged for this iframe href: {href}")]
    FrameCacheMissing {
        /// Bucket that was searched.
        href: FrameHref,
    },

    /// The bucket exists but no entry matches the URL fragment and headers.
    #[error("Request not found for URL and headers in iframe: {href}")]
    NoMatch {
        /// Bucket that was searched.
        href: FrameHref,
    },

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// Stored body payload is not valid base64.
    #[error("Failed to decode request body: {message}")]
    BodyDecode {
        /// Decoder message.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Network failure while issuing a replay or a side-channel call.
    #[error("Network error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ========================================================================
    // Bridge Errors
    // ========================================================================
    /// The other side of the bridge answered with a failure envelope.
    #[error("{message}")]
    Bridge {
        /// Error text from the envelope.
        message: String,
    },

    /// The other execution context went away.
    #[error("Channel closed")]
    ChannelClosed,

    /// Operation exceeded its deadline.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // DOM Errors
    // ========================================================================
    /// No element matched a selector or point.
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector (or point description) that was used.
        selector: String,
    },

    /// DOM operation failed inside the frame.
    #[error("Processing error: {message}")]
    Dom {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Cookie Errors
    // ========================================================================
    /// Cookie jar read or write failed.
    #[error("Cookie error: {message}")]
    Cookie {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// Malformed message or argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<RecvError> for Error {
    fn from(_: RecvError) -> Self {
        Self::ChannelClosed
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a missing-href error for a bridge action.
    #[inline]
    pub fn href_missing(operation: &'static str) -> Self {
        Self::HrefMissing { operation }
    }

    /// Creates a missing tab bucket error.
    #[inline]
    pub fn tab_cache_missing(tab_id: TabId) -> Self {
        Self::TabCacheMissing { tab_id }
    }

    /// Creates a missing frame bucket error.
    #[inline]
    pub fn frame_cache_missing(href: impl Into<FrameHref>) -> Self {
        Self::FrameCacheMissing { href: href.into() }
    }

    /// Creates a no-match error.
    #[inline]
    pub fn no_match(href: impl Into<FrameHref>) -> Self {
        Self::NoMatch { href: href.into() }
    }

    /// Creates a body decode error.
    #[inline]
    pub fn body_decode(message: impl Into<String>) -> Self {
        Self::BodyDecode {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an error from a bridge failure envelope.
    #[inline]
    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Creates a DOM processing error.
    #[inline]
    pub fn dom(message: impl Into<String>) -> Self {
        Self::Dom {
            message: message.into(),
        }
    }

    /// Creates a cookie error.
    #[inline]
    pub fn cookie(message: impl Into<String>) -> Self {
        Self::Cookie {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a cache lookup failure.
    #[inline]
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::HrefMissing { .. }
                | Self::TabCacheMissing { .. }
                | Self::FrameCacheMissing { .. }
                | Self::NoMatch { .. }
        )
    }

    /// Returns `true` if this is a network failure.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_))
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

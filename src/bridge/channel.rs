//! Page-to-frame message channel.
//!
//! A frame posts [`FrameReady`] once its script is loaded. The embedding
//! page then opens a [`FrameChannel`] for it; the frame consumes the other
//! end as a [`FrameInbox`]. Every request travels with its own
//! [`ReplyPort`], so concurrent requests never see each other's replies.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{FrameHref, MessageId};
use crate::protocol::{FrameCommand, FrameReady, Reply};

use super::port::ReplyPort;

// ============================================================================
// Constants
// ============================================================================

/// Readiness message type.
const READY_KIND: &str = "iframeContentLoaded";

/// Readiness status.
const READY_STATUS: &str = "ready";

// ============================================================================
// BridgeMessage
// ============================================================================

/// One request delivered to a frame.
#[derive(Debug)]
pub struct BridgeMessage {
    /// Raw message payload.
    pub payload: Value,
    /// Port for the single reply.
    pub reply: ReplyPort,
}

impl BridgeMessage {
    /// Returns the correlation ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.reply.id()
    }
}

// ============================================================================
// FrameChannel
// ============================================================================

/// Page side of a frame bridge.
#[derive(Debug, Clone)]
pub struct FrameChannel {
    href: FrameHref,
    tx: mpsc::UnboundedSender<BridgeMessage>,
    request_timeout: Duration,
}

impl FrameChannel {
    /// Opens a channel for a frame that signalled readiness.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the signal is not a readiness
    /// message.
    pub fn open(ready: &FrameReady, request_timeout: Duration) -> Result<(Self, FrameInbox)> {
        if ready.kind != READY_KIND || ready.status != READY_STATUS {
            return Err(Error::invalid_argument(format!(
                "not a readiness signal: type={} status={}",
                ready.kind, ready.status
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let href = FrameHref::new(ready.href.as_str());
        debug!(%href, "Frame bridge opened");

        Ok((
            Self {
                href: href.clone(),
                tx,
                request_timeout,
            },
            FrameInbox { href, rx },
        ))
    }

    /// Returns the frame's href.
    #[inline]
    #[must_use]
    pub fn href(&self) -> &FrameHref {
        &self.href
    }

    /// Sends a typed command and waits for the reply.
    ///
    /// # Errors
    ///
    /// See [`FrameChannel::request`].
    pub async fn send(&self, command: &FrameCommand) -> Result<Reply> {
        self.request(serde_json::to_value(command)?).await
    }

    /// Sends a raw message and waits for the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the frame is gone or dropped the port
    /// - [`Error::Timeout`] if no reply arrives in time
    pub async fn request(&self, payload: Value) -> Result<Reply> {
        let id = MessageId::generate();
        let (reply, rx) = ReplyPort::pair(id);

        self.tx
            .send(BridgeMessage { payload, reply })
            .map_err(|_| Error::ChannelClosed)?;
        trace!(%id, href = %self.href, "Bridge request sent");

        match timeout(self.request_timeout, rx).await {
            Ok(reply) => Ok(reply?),
            Err(_) => {
                warn!(%id, href = %self.href, "Bridge request timed out");
                Err(Error::timeout(
                    format!("bridge request to {}", self.href),
                    u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }

    /// Returns `true` if the frame side is gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// FrameInbox
// ============================================================================

/// Frame side of a bridge.
#[derive(Debug)]
pub struct FrameInbox {
    href: FrameHref,
    rx: mpsc::UnboundedReceiver<BridgeMessage>,
}

impl FrameInbox {
    /// Returns the frame's href.
    #[inline]
    #[must_use]
    pub fn href(&self) -> &FrameHref {
        &self.href
    }

    /// Receives the next message. `None` once every channel is dropped.
    pub async fn recv(&mut self) -> Option<BridgeMessage> {
        self.rx.recv().await
    }
}

// ============================================================================
// FrameRegistry
// ============================================================================

/// Page-side registry of open frame channels, keyed by href.
#[derive(Debug, Clone)]
pub struct FrameRegistry {
    channels: Arc<Mutex<FxHashMap<FrameHref, FrameChannel>>>,
    request_timeout: Duration,
}

impl FrameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            channels: Arc::new(Mutex::new(FxHashMap::default())),
            request_timeout,
        }
    }

    /// Handles a readiness signal, replacing any earlier channel for the href.
    ///
    /// # Errors
    ///
    /// See [`FrameChannel::open`].
    pub fn on_ready(&self, ready: &FrameReady) -> Result<FrameInbox> {
        let (channel, inbox) = FrameChannel::open(ready, self.request_timeout)?;
        self.channels.lock().insert(channel.href().clone(), channel);
        Ok(inbox)
    }

    /// Returns the channel for a frame.
    #[must_use]
    pub fn channel(&self, href: &str) -> Option<FrameChannel> {
        self.channels
            .lock()
            .get(href)
            .filter(|channel| !channel.is_closed())
            .cloned()
    }

    /// Drops channels whose frame side is gone. Returns how many.
    pub fn prune(&self) -> usize {
        let mut channels = self.channels.lock();
        let before = channels.len();
        channels.retain(|_, channel| !channel.is_closed());
        before - channels.len()
    }

    /// Returns the number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    /// Returns `true` if no channel is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

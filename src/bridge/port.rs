//! One-shot reply ports and the background seam.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::Result;
use crate::identifiers::MessageId;
use crate::protocol::{BackgroundCommand, Reply};

// ============================================================================
// ReplyPort
// ============================================================================

/// Reply side of one bridge request.
///
/// Sending consumes the port, so a request is answered at most once. A port
/// dropped without a reply closes the requester's channel.
#[derive(Debug)]
pub struct ReplyPort {
    id: MessageId,
    tx: oneshot::Sender<Reply>,
}

impl ReplyPort {
    /// Creates a port and the receiver the requester awaits.
    #[must_use]
    pub fn pair(id: MessageId) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (Self { id, tx }, rx)
    }

    /// Returns the message this port answers.
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Sends the reply.
    ///
    /// Returns `false` if the requester stopped waiting.
    pub fn send(self, reply: Reply) -> bool {
        let delivered = self.tx.send(reply).is_ok();
        if !delivered {
            trace!(id = %self.id, "Reply dropped, requester gone");
        }
        delivered
    }

    /// Returns `true` if the requester stopped waiting.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// BackgroundPort
// ============================================================================

/// Frame-side connection to the privileged background context.
///
/// The sender tab is attached by the implementation, never by the caller.
#[async_trait]
pub trait BackgroundPort: Send + Sync {
    /// Sends a command and waits for its reply.
    async fn send(&self, command: BackgroundCommand) -> Result<Reply>;
}

// ============================================================================
// Tests
// ============================================================================

//! Frame agent.
//!
//! One agent runs per embedded frame. It announces readiness to the
//! embedding page, then answers every bridge message with exactly one
//! [`Reply`]: DOM commands through [`DomCommands`], `replayRequest` through
//! the [`ReplayExecutor`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use crate::bridge::{BackgroundPort, BridgeMessage, FrameInbox};
use crate::config::ReplayConfig;
use crate::error::Result;
use crate::identifiers::FrameHref;
use crate::protocol::{FrameCommand, FrameReady, Reply};

use super::dom::{DomCommands, DomDriver, Target};
use super::executor::ReplayExecutor;
use super::fetch::Fetcher;

// ============================================================================
// FrameAgent
// ============================================================================

/// Per-frame command handler.
#[derive(Debug, Clone)]
pub struct FrameAgent {
    href: FrameHref,
    dom: DomCommands,
    executor: ReplayExecutor,
}

impl FrameAgent {
    /// Creates an agent for the frame at `href`.
    #[must_use]
    pub fn new(
        href: impl Into<FrameHref>,
        dom: Arc<dyn DomDriver>,
        background: Arc<dyn BackgroundPort>,
        fetcher: Arc<dyn Fetcher>,
        config: &ReplayConfig,
    ) -> Self {
        let href = href.into();
        Self {
            dom: DomCommands::new(dom, config),
            executor: ReplayExecutor::new(href.clone(), background, fetcher),
            href,
        }
    }

    /// Returns the frame href.
    #[inline]
    #[must_use]
    pub fn href(&self) -> &FrameHref {
        &self.href
    }

    /// Readiness signal to post to the embedding page.
    #[must_use]
    pub fn ready(&self) -> FrameReady {
        FrameReady::new(self.href.as_str())
    }

    /// Handles one raw bridge message.
    pub async fn handle(&self, message: &Value) -> Reply {
        match FrameCommand::parse(message) {
            Ok(command) => self.dispatch(command).await,
            Err(reply) => {
                warn!(href = %self.href, error = ?reply.error, "Rejected bridge message");
                reply
            }
        }
    }

    /// Runs a typed command.
    pub async fn dispatch(&self, command: FrameCommand) -> Reply {
        let action = command.name();
        trace!(href = %self.href, action, "Frame command");

        match command {
            FrameCommand::GetDom => self.dom.get_dom(self.href.as_str()).await.into(),

            FrameCommand::ScrollTo { selector } => {
                action_reply(action, self.dom.scroll_to(&selector).await.map(|()| Value::Null))
            }

            FrameCommand::Click { selector, x, y } => action_reply(
                action,
                self.dom
                    .click(&Target::from_parts(selector, x, y))
                    .await
                    .map(|()| Value::Null),
            ),

            FrameCommand::TextInput {
                text,
                selector,
                x,
                y,
            } => action_reply(
                action,
                self.dom
                    .text_input(&Target::from_parts(selector, x, y), text.as_deref().unwrap_or_default())
                    .await
                    .map(|()| Value::Null),
            ),

            FrameCommand::WaitForElement {
                selector,
                timeout,
                poll_interval,
            } => self
                .dom
                .wait_for_element(&selector, timeout, poll_interval)
                .await
                .into(),

            FrameCommand::ReplayRequest { url, headers } => action_reply(
                action,
                self.executor
                    .replay(&url, headers)
                    .await
                    .map(|response| json!({ "status": response.status, "text": response.text })),
            ),
        }
    }

    /// Serves an inbox until every page-side channel is dropped.
    ///
    /// Each message runs on its own task, so a slow replay or a long wait
    /// never holds up other commands.
    pub async fn serve(self: Arc<Self>, mut inbox: FrameInbox) {
        debug!(href = %self.href, "Frame agent serving");
        while let Some(BridgeMessage { payload, reply }) = inbox.recv().await {
            let agent = Arc::clone(&self);
            tokio::spawn(async move {
                let id = reply.id();
                let response = agent.handle(&payload).await;
                if !reply.send(response) {
                    trace!(%id, "Bridge reply undeliverable");
                }
            });
        }
        debug!(href = %self.href, "Frame agent stopped");
    }
}

/// Builds `{success, action, ...}`; replays put their result under `response`.
fn action_reply(action: &str, result: Result<Value>) -> Reply {
    match result {
        Ok(Value::Null) => Reply::ok().with_action(action),
        Ok(response) => Reply::ok().with_action(action).with_field("response", response),
        Err(e) => Reply::from_error(&e).with_action(action),
    }
}

// ============================================================================
// Tests
// ============================================================================

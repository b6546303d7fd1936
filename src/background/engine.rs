//! Privileged background engine and its event loop.
//!
//! [`Background`] owns all capture state. It can be driven directly
//! (`handle_event`, `handle_command`) or spawned as a tokio task that
//! drains browser events and bridge commands, in which case callers talk to
//! it through a [`BackgroundHandle`].
//!
//! # Event Loop
//!
//! The spawned task handles:
//!
//! - Browser events (navigation, network, tab, cookie)
//! - Bridge commands from frames, each with a one-shot reply channel
//! - Shutdown
//!
//! Events are preferred over commands when both are ready, so a command
//! issued after an event was emitted always observes that event.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::bridge::BackgroundPort;
use crate::config::ReplayConfig;
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::protocol::{BackgroundCommand, Event, ParsedEvent, Reply};

use super::broker::ReplayBroker;
use super::cookies::{CookieJar, CookieNormalizer};
use super::log::{Applied, CaptureEvent, CaptureLog};

// ============================================================================
// EngineCommand
// ============================================================================

/// Internal commands for the event loop.
enum EngineCommand {
    /// Run a bridge command for a tab and reply.
    Dispatch {
        tab_id: TabId,
        command: BackgroundCommand,
        reply_tx: oneshot::Sender<Reply>,
    },
    /// Stop the loop.
    Shutdown,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatch { tab_id, command, .. } => f
                .debug_struct("Dispatch")
                .field("tab_id", tab_id)
                .field("command", command)
                .finish_non_exhaustive(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// ============================================================================
// Background
// ============================================================================

/// The privileged background context.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct Background {
    log: Arc<Mutex<CaptureLog>>,
    broker: ReplayBroker,
    cookies: Option<CookieNormalizer>,
    command_timeout: Duration,
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("cookies", &self.cookies.is_some())
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl Background {
    /// Creates an engine with empty state.
    #[must_use]
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            log: Arc::new(Mutex::new(CaptureLog::new(config.history_capacity))),
            broker: ReplayBroker::new(),
            cookies: None,
            command_timeout: config.command_timeout,
        }
    }

    /// Enables cookie normalization through a jar.
    #[must_use]
    pub fn with_cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookies = Some(CookieNormalizer::new(jar));
        self
    }

    /// Handles a raw browser event.
    ///
    /// Returns the capture outcome for navigation, network and tab events.
    pub async fn handle_event(&self, event: &Event) -> Option<Applied> {
        let parsed = event.parse();
        let applied = self.apply(&parsed);
        if let Some(normalizer) = &self.cookies {
            normalize_cookies(normalizer, &parsed).await;
        }
        applied
    }

    /// Handles a bridge command from a frame in `tab_id`.
    pub fn handle_command(&self, tab_id: TabId, command: BackgroundCommand) -> Reply {
        let mut log = self.log.lock();
        self.broker.handle(log.store_mut(), tab_id, command)
    }

    /// Runs `f` with read access to the capture log.
    pub fn inspect<R>(&self, f: impl FnOnce(&CaptureLog) -> R) -> R {
        f(&self.log.lock())
    }

    /// Spawns the event loop.
    #[must_use]
    pub fn spawn(self) -> (BackgroundHandle, JoinHandle<()>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handle = BackgroundHandle {
            event_tx,
            command_tx,
            engine: self.clone(),
            command_timeout: self.command_timeout,
        };
        let task = tokio::spawn(self.run_event_loop(event_rx, command_rx));
        (handle, task)
    }

    /// Applies the capture part of an event.
    fn apply(&self, event: &ParsedEvent) -> Option<Applied> {
        let capture = match event {
            ParsedEvent::NavigationCommitted(details) => {
                let Some(tab_id) = details.tab() else {
                    return Some(Applied::SkippedNoTab);
                };
                CaptureEvent::FrameCommitted {
                    tab_id,
                    frame_id: details.frame_id,
                    url: details.url.clone(),
                }
            }
            ParsedEvent::BeforeRequest(details) => CaptureEvent::RequestInitiated(details.clone()),
            ParsedEvent::BeforeSendHeaders(details) => {
                CaptureEvent::HeadersFinalized(details.clone())
            }
            ParsedEvent::TabRemoved { tab_id: Some(tab_id) } => {
                CaptureEvent::TabClosed { tab_id: *tab_id }
            }
            ParsedEvent::TabRemoved { tab_id: None } => {
                warn!("Tab removal without a valid tab ID");
                return None;
            }
            ParsedEvent::Malformed { method, message } => {
                warn!(%method, %message, "Malformed browser event");
                return None;
            }
            ParsedEvent::Unknown { method, .. } => {
                trace!(%method, "Ignoring browser event");
                return None;
            }
            ParsedEvent::NavigationCompleted(_) | ParsedEvent::CookieChanged(_) => return None,
        };

        Some(self.log.lock().apply(capture))
    }

    /// Event loop.
    async fn run_event_loop(
        self,
        mut event_rx: mpsc::UnboundedReceiver<Event>,
        mut command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    ) {
        loop {
            tokio::select! {
                biased;

                event = event_rx.recv() => {
                    let Some(event) = event else {
                        debug!("Event channel closed");
                        break;
                    };

                    let parsed = event.parse();
                    self.apply(&parsed);

                    // Cookie writes go through the jar and must not hold up capture.
                    if let Some(normalizer) = self.cookies.clone()
                        && matches!(parsed, ParsedEvent::NavigationCompleted(_) | ParsedEvent::CookieChanged(_))
                    {
                        tokio::spawn(async move {
                            normalize_cookies(&normalizer, &parsed).await;
                        });
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(EngineCommand::Dispatch { tab_id, command, reply_tx }) => {
                            let reply = self.handle_command(tab_id, command);
                            if reply_tx.send(reply).is_err() {
                                trace!(%tab_id, "Command reply dropped, sender gone");
                            }
                        }

                        Some(EngineCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        debug!("Background event loop terminated");
    }
}

async fn normalize_cookies(normalizer: &CookieNormalizer, event: &ParsedEvent) {
    match event {
        ParsedEvent::NavigationCompleted(details) => {
            normalizer.on_frame_completed(details).await;
        }
        ParsedEvent::CookieChanged(change) => {
            normalizer.on_cookie_changed(change).await;
        }
        _ => {}
    }
}

// ============================================================================
// BackgroundHandle
// ============================================================================

/// Handle to a spawned [`Background`] event loop.
#[derive(Debug, Clone)]
pub struct BackgroundHandle {
    event_tx: mpsc::UnboundedSender<Event>,
    command_tx: mpsc::UnboundedSender<EngineCommand>,
    engine: Background,
    command_timeout: Duration,
}

impl BackgroundHandle {
    /// Delivers a browser event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the loop has stopped.
    pub fn emit(&self, event: Event) -> Result<()> {
        self.event_tx.send(event).map_err(|_| Error::ChannelClosed)
    }

    /// Runs a command for a tab and waits for the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the loop has stopped
    /// - [`Error::Timeout`] if no reply arrives in time
    pub async fn dispatch(&self, tab_id: TabId, command: BackgroundCommand) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(EngineCommand::Dispatch {
                tab_id,
                command,
                reply_tx,
            })
            .map_err(|_| Error::ChannelClosed)?;

        match timeout(self.command_timeout, reply_rx).await {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(Error::timeout(
                format!("background command for tab {tab_id}"),
                u64::try_from(self.command_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Returns a port that sends commands on behalf of a frame in `tab_id`.
    #[must_use]
    pub fn link(&self, tab_id: TabId) -> BackgroundLink {
        BackgroundLink {
            handle: self.clone(),
            tab_id,
        }
    }

    /// Returns the engine, for inspection.
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Background {
        &self.engine
    }

    /// Stops the loop.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(EngineCommand::Shutdown);
    }
}

// ============================================================================
// BackgroundLink
// ============================================================================

/// A frame's connection to the background, stamped with its tab.
#[derive(Debug, Clone)]
pub struct BackgroundLink {
    handle: BackgroundHandle,
    tab_id: TabId,
}

impl BackgroundLink {
    /// Returns the sender tab.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }
}

#[async_trait]
impl BackgroundPort for BackgroundLink {
    async fn send(&self, command: BackgroundCommand) -> Result<Reply> {
        self.handle.dispatch(self.tab_id, command).await
    }
}

// ============================================================================
// Tests
// ============================================================================

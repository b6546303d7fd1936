//! DOM automation inside a frame.
//!
//! The commands the embedding page can run against a frame's document:
//! serialize it, scroll, click, type and wait for elements. Every document
//! access goes through a [`DomDriver`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::{Instant, interval_at, sleep};
use tracing::{debug, trace, warn};

use crate::config::ReplayConfig;
use crate::error::{Error, Result};
use crate::protocol::Reply;

// ============================================================================
// Constants
// ============================================================================

/// Selector value that scrolls the whole document.
const SCROLL_BOTTOM: &str = "bottom";

// ============================================================================
// ElementRef
// ============================================================================

/// Handle to an element in the frame's document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// Driver-specific element ID.
    pub id: String,
    /// Tag name, e.g. `INPUT`.
    #[serde(rename = "tagName")]
    pub tag_name: String,
}

impl ElementRef {
    /// Creates an element handle.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }

    /// Returns `true` for elements whose text is set through `value`.
    #[must_use]
    pub fn is_text_control(&self) -> bool {
        self.tag_name.eq_ignore_ascii_case("input") || self.tag_name.eq_ignore_ascii_case("textarea")
    }
}

// ============================================================================
// DomDriver
// ============================================================================

/// Access to the frame's live document.
#[async_trait]
pub trait DomDriver: Send + Sync {
    /// Returns the serialized document element.
    async fn outer_html(&self) -> Result<String>;

    /// Returns the first element matching a CSS selector.
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementRef>>;

    /// Returns the topmost element at a viewport point.
    async fn element_from_point(&self, x: f64, y: f64) -> Result<Option<ElementRef>>;

    /// Smoothly scrolls the document to its bottom.
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Smoothly scrolls an element to the center of the viewport.
    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()>;

    /// Clicks an element.
    async fn click(&self, element: &ElementRef) -> Result<()>;

    /// Focuses an element.
    async fn focus(&self, element: &ElementRef) -> Result<()>;

    /// Returns `true` if the element is the active element.
    async fn is_focused(&self, element: &ElementRef) -> Result<bool>;

    /// Sets the `value` of a text control.
    async fn set_value(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// Dispatches a bubbling, cancelable `paste` carrying `text/plain`.
    async fn dispatch_paste(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// Dispatches a bubbling, cancelable `change`.
    async fn dispatch_change(&self, element: &ElementRef) -> Result<()>;

    /// Notified on every child-list mutation of the document subtree.
    fn mutations(&self) -> Arc<Notify>;
}

// ============================================================================
// Target
// ============================================================================

/// How a command picks its element.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// First match of a CSS selector.
    Selector(String),
    /// Element at a viewport point.
    Point {
        /// Viewport x.
        x: f64,
        /// Viewport y.
        y: f64,
    },
    /// Neither was given.
    Missing,
}

impl Target {
    /// Selector wins over a point; a point needs both coordinates.
    #[must_use]
    pub fn from_parts(selector: Option<String>, x: Option<f64>, y: Option<f64>) -> Self {
        match (selector, x, y) {
            (Some(selector), _, _) => Self::Selector(selector),
            (None, Some(x), Some(y)) => Self::Point { x, y },
            _ => Self::Missing,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Selector(selector) => selector.clone(),
            Self::Point { x, y } => format!("({x}, {y})"),
            Self::Missing => "undefined".to_string(),
        }
    }

    async fn locate(&self, dom: &dyn DomDriver) -> Result<ElementRef> {
        let found = match self {
            Self::Selector(selector) => dom.query_selector(selector).await?,
            Self::Point { x, y } => dom.element_from_point(*x, *y).await?,
            Self::Missing => None,
        };
        found.ok_or_else(|| Error::element_not_found(self.describe()))
    }
}

// ============================================================================
// Waiting
// ============================================================================

/// How a waited-for element was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoundBy {
    /// Present when the wait started.
    Initial,
    /// Appeared with a document mutation.
    Observer,
    /// Picked up by a periodic check.
    Polling,
}

impl FoundBy {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Observer => "observer",
            Self::Polling => "polling",
        }
    }
}

/// Waits until `selector` matches, racing mutation notifications, a poll
/// interval and the deadline.
///
/// Returns `Ok(None)` on timeout. A zero `poll_interval` polls every
/// millisecond.
///
/// # Errors
///
/// Propagates driver failures.
pub async fn wait_for_element(
    dom: &dyn DomDriver,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Option<FoundBy>> {
    let mutations = dom.mutations();

    // Register for mutations before the first check so none is missed.
    let notified = mutations.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();

    if dom.query_selector(selector).await?.is_some() {
        return Ok(Some(FoundBy::Initial));
    }

    let deadline = sleep(timeout);
    tokio::pin!(deadline);
    let poll_interval = poll_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);

    loop {
        tokio::select! {
            biased;

            () = &mut deadline => {
                debug!(selector, timeout_ms = timeout.as_millis(), "Element wait timed out");
                return Ok(None);
            }

            () = &mut notified => {
                notified.set(mutations.notified());
                notified.as_mut().enable();
                if dom.query_selector(selector).await?.is_some() {
                    return Ok(Some(FoundBy::Observer));
                }
            }

            _ = ticker.tick() => {
                if dom.query_selector(selector).await?.is_some() {
                    return Ok(Some(FoundBy::Polling));
                }
            }
        }
    }
}

// ============================================================================
// DomCommands
// ============================================================================

/// Runs DOM commands and builds their replies.
#[derive(Clone)]
pub struct DomCommands {
    dom: Arc<dyn DomDriver>,
    focus_settle: Duration,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for DomCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomCommands")
            .field("focus_settle", &self.focus_settle)
            .field("wait_timeout", &self.wait_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl DomCommands {
    /// Creates the command set over a driver.
    ///
    /// A zero configured poll interval falls back to the default one.
    #[must_use]
    pub fn new(dom: Arc<dyn DomDriver>, config: &ReplayConfig) -> Self {
        let poll_interval = if config.poll_interval.is_zero() {
            ReplayConfig::new().poll_interval
        } else {
            config.poll_interval
        };

        Self {
            dom,
            focus_settle: config.focus_settle,
            wait_timeout: config.wait_timeout,
            poll_interval,
        }
    }

    /// `getDOM`: `{success, message: "DOM", html, href}`.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn get_dom(&self, href: &str) -> Result<Reply> {
        let html = self.dom.outer_html().await?;
        Ok(Reply::ok()
            .with_field("message", "DOM")
            .with_field("html", html)
            .with_field("href", href))
    }

    /// `scrollTo`: `"bottom"` scrolls the document, anything else is a
    /// selector to bring into view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if the selector matches nothing.
    pub async fn scroll_to(&self, selector: &str) -> Result<()> {
        if selector == SCROLL_BOTTOM {
            return self.dom.scroll_to_bottom().await;
        }
        let element = Target::Selector(selector.to_string())
            .locate(self.dom.as_ref())
            .await?;
        self.dom.scroll_into_view(&element).await
    }

    /// `click`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if nothing is at the target.
    pub async fn click(&self, target: &Target) -> Result<()> {
        let element = target.locate(self.dom.as_ref()).await?;
        trace!(element = %element.id, "Clicking");
        self.dom.click(&element).await
    }

    /// `textInput`: focus, let focus settle, write, then fire `change`.
    ///
    /// # Errors
    ///
    /// - [`Error::ElementNotFound`] if nothing is at the target
    /// - [`Error::Dom`] if a step fails after the element was found
    pub async fn text_input(&self, target: &Target, text: &str) -> Result<()> {
        let element = target.locate(self.dom.as_ref()).await?;
        self.type_into(&element, text).await.map_err(|e| match e {
            Error::Dom { .. } => e,
            other => Error::dom(other.to_string()),
        })
    }

    async fn type_into(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.dom.focus(element).await?;
        sleep(self.focus_settle).await;

        if !self.dom.is_focused(element).await? {
            warn!(element = %element.id, "Initial focus failed, input may not work as expected");
        }

        if element.is_text_control() {
            self.dom.set_value(element, text).await?;
        } else {
            self.dom.dispatch_paste(element, text).await?;
        }
        self.dom.dispatch_change(element).await
    }

    /// `waitForElement`: `{success, found, method}` or a timeout failure.
    ///
    /// Timeout and poll interval default to the configured values.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn wait_for_element(
        &self,
        selector: &str,
        timeout_ms: Option<u64>,
        poll_interval_ms: Option<u64>,
    ) -> Result<Reply> {
        let timeout = timeout_ms.map_or(self.wait_timeout, Duration::from_millis);
        let poll_interval = poll_interval_ms
            .filter(|ms| *ms > 0)
            .map_or(self.poll_interval, Duration::from_millis);

        Ok(
            match wait_for_element(self.dom.as_ref(), selector, timeout, poll_interval).await? {
                Some(found_by) => Reply::ok()
                    .with_field("found", true)
                    .with_field("method", found_by.as_str()),
                None => Reply::failure(format!("Timeout waiting for element: {selector}"))
                    .with_field("found", false),
            },
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

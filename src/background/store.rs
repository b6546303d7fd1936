//! Request capture cache.
//!
//! [`RequestStore`] is the only mutable state shared across browser events.
//! It is owned by the background engine and exposes exactly the operations
//! the capture hooks and the replay broker need.
//!
//! # Layout
//!
//! ```text
//! TabId ─┬─ FrameHref ── [(RequestId, CapturedRequest), ...]   insertion order
//!        └─ released: {RequestId, ...}                         never reused
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{FrameHref, RequestId, TabId};
use crate::protocol::CapturedRequest;

// ============================================================================
// Types
// ============================================================================

/// Full identity of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Owning tab.
    pub tab_id: TabId,
    /// Frame href bucket.
    pub href: FrameHref,
    /// Network layer request ID.
    pub request_id: RequestId,
}

impl RequestKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub fn new(tab_id: TabId, href: FrameHref, request_id: RequestId) -> Self {
        Self {
            tab_id,
            href,
            request_id,
        }
    }
}

/// Result of inserting a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New entry appended to the bucket.
    Inserted,
    /// Existing entry with the same ID replaced in place (redirect).
    Replaced,
    /// The ID was already released in this tab and is not reused.
    Released,
}

/// Insertion-ordered entries of one frame href.
#[derive(Debug, Default)]
struct Bucket {
    entries: Vec<(RequestId, CapturedRequest)>,
}

impl Bucket {
    fn position(&self, request_id: &RequestId) -> Option<usize> {
        self.entries.iter().position(|(id, _)| id == request_id)
    }
}

/// Everything captured for one tab.
#[derive(Debug, Default)]
struct TabRequests {
    frames: FxHashMap<FrameHref, Bucket>,
    released: FxHashSet<RequestId>,
}

// ============================================================================
// RequestStore
// ============================================================================

/// `tab → frame href → request id → captured request`.
#[derive(Debug, Default)]
pub struct RequestStore {
    tabs: FxHashMap<TabId, TabRequests>,
}

impl RequestStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a captured request.
    ///
    /// An entry with the same ID in the same bucket is replaced in place and
    /// keeps its position. IDs released earlier in the tab's lifetime are
    /// refused.
    pub fn insert(&mut self, key: RequestKey, request: CapturedRequest) -> InsertOutcome {
        let tab = self.tabs.entry(key.tab_id).or_default();
        if tab.released.contains(&key.request_id) {
            return InsertOutcome::Released;
        }

        let bucket = tab.frames.entry(key.href).or_default();
        match bucket.position(&key.request_id) {
            Some(index) => {
                bucket.entries[index].1 = request;
                InsertOutcome::Replaced
            }
            None => {
                bucket.entries.push((key.request_id, request));
                InsertOutcome::Inserted
            }
        }
    }

    /// Merges headers into an existing entry, overwriting per name.
    ///
    /// Returns `false` (and changes nothing) if the entry does not exist.
    pub fn merge_headers<'a, I>(&mut self, key: &RequestKey, headers: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let Some(request) = self.entry_mut(key) else {
            return false;
        };

        for (name, value) in headers {
            request.headers.insert(name.to_string(), value.to_string());
        }
        true
    }

    /// Returns an entry.
    #[must_use]
    pub fn get(&self, key: &RequestKey) -> Option<&CapturedRequest> {
        let bucket = self
            .tabs
            .get(&key.tab_id)?
            .frames
            .get(key.href.as_str())?;
        bucket
            .position(&key.request_id)
            .map(|index| &bucket.entries[index].1)
    }

    /// Finds the first entry, in insertion order, whose URL contains
    /// `url_fragment` and whose headers include every pair in `headers`.
    ///
    /// # Errors
    ///
    /// - [`Error::TabCacheMissing`] if nothing was captured for the tab
    /// - [`Error::FrameCacheMissing`] if nothing was captured for the href
    /// - [`Error::NoMatch`] if the bucket has no matching entry
    pub fn resolve(
        &self,
        tab_id: TabId,
        href: &str,
        url_fragment: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(&RequestId, &CapturedRequest)> {
        let tab = self
            .tabs
            .get(&tab_id)
            .filter(|tab| !tab.frames.is_empty())
            .ok_or_else(|| Error::tab_cache_missing(tab_id))?;
        let bucket = tab
            .frames
            .get(href)
            .ok_or_else(|| Error::frame_cache_missing(href))?;

        bucket
            .entries
            .iter()
            .find(|(_, request)| request.url.contains(url_fragment) && request.has_headers(headers))
            .map(|(id, request)| (id, request))
            .ok_or_else(|| Error::no_match(href))
    }

    /// Deletes an entry. Idempotent.
    ///
    /// Returns `true` if an entry was removed. The ID is remembered so later
    /// events for it cannot recreate the entry. An emptied bucket stays, so a
    /// repeat lookup under its href reports [`Error::NoMatch`].
    pub fn release(&mut self, key: &RequestKey) -> bool {
        let Some(tab) = self.tabs.get_mut(&key.tab_id) else {
            return false;
        };

        let removed = tab
            .frames
            .get_mut(key.href.as_str())
            .and_then(|bucket| {
                bucket
                    .position(&key.request_id)
                    .map(|index| bucket.entries.remove(index))
            })
            .is_some();

        if removed {
            tab.released.insert(key.request_id.clone());
            debug!(tab_id = %key.tab_id, href = %key.href, request_id = %key.request_id, "Released captured request");
        }
        removed
    }

    /// Deletes every bucket of a live tab.
    ///
    /// Dropped IDs join the tab's released set and earlier releases are
    /// kept, so none of them is reused while the tab lives. Returns the
    /// number of entries dropped.
    pub fn clear_tab(&mut self, tab_id: TabId) -> usize {
        let Some(tab) = self.tabs.get_mut(&tab_id) else {
            return 0;
        };

        let mut dropped = 0;
        for (_, bucket) in tab.frames.drain() {
            dropped += bucket.entries.len();
            tab.released
                .extend(bucket.entries.into_iter().map(|(id, _)| id));
        }
        debug!(%tab_id, dropped, "Cleared tab cache");
        dropped
    }

    /// Forgets a closed tab entirely, released IDs included.
    ///
    /// Returns the number of entries dropped.
    pub fn forget_tab(&mut self, tab_id: TabId) -> usize {
        let dropped = self.tabs.remove(&tab_id).map_or(0, |tab| {
            tab.frames
                .values()
                .map(|bucket| bucket.entries.len())
                .sum()
        });
        debug!(%tab_id, dropped, "Forgot closed tab");
        dropped
    }

    /// Returns the number of entries held for a tab.
    #[must_use]
    pub fn len_for_tab(&self, tab_id: TabId) -> usize {
        self.tabs.get(&tab_id).map_or(0, |tab| {
            tab.frames
                .values()
                .map(|bucket| bucket.entries.len())
                .sum()
        })
    }

    /// Returns the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.keys().map(|tab_id| self.len_for_tab(*tab_id)).sum()
    }

    /// Returns `true` if nothing is cached.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_mut(&mut self, key: &RequestKey) -> Option<&mut CapturedRequest> {
        let bucket = self
            .tabs
            .get_mut(&key.tab_id)?
            .frames
            .get_mut(key.href.as_str())?;
        let index = bucket.position(&key.request_id)?;
        Some(&mut bucket.entries[index].1)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Frame identity tracking.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::identifiers::{FrameHref, FrameId, TabId};

// ============================================================================
// FrameTracker
// ============================================================================

/// Maps `(tab, frame)` to the URL the frame last committed.
///
/// Entries are only overwritten, never removed on navigation away, so a
/// request issued just before a new commit still resolves to the href it
/// was issued under. Only tab closure forgets a tab's frames.
#[derive(Debug, Default)]
pub struct FrameTracker {
    hrefs: FxHashMap<TabId, FxHashMap<FrameId, FrameHref>>,
}

impl FrameTracker {
    /// Creates an empty tracker.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a navigation commit. Top-level commits are ignored.
    ///
    /// Returns `true` if the commit was recorded.
    pub fn commit(&mut self, tab_id: TabId, frame_id: FrameId, url: &str) -> bool {
        if frame_id.is_main() {
            return false;
        }

        trace!(%tab_id, %frame_id, url, "Frame committed");
        self.hrefs
            .entry(tab_id)
            .or_default()
            .insert(frame_id, FrameHref::new(url));
        true
    }

    /// Returns the committed href of a frame, if known.
    #[must_use]
    pub fn href(&self, tab_id: TabId, frame_id: FrameId) -> Option<&FrameHref> {
        self.hrefs.get(&tab_id)?.get(&frame_id)
    }

    /// Resolves the bucket key for a request.
    ///
    /// Uses the frame's committed href; for an unknown frame, falls back to
    /// the request's own URL only when the request is itself a sub-frame
    /// document load.
    #[must_use]
    pub fn resolve(
        &self,
        tab_id: TabId,
        frame_id: FrameId,
        request_url: &str,
        is_sub_frame: bool,
    ) -> Option<FrameHref> {
        self.href(tab_id, frame_id)
            .cloned()
            .or_else(|| is_sub_frame.then(|| FrameHref::new(request_url)))
    }

    /// Forgets every frame of a tab.
    pub fn forget_tab(&mut self, tab_id: TabId) -> bool {
        self.hrefs.remove(&tab_id).is_some()
    }

    /// Returns the number of known frames in a tab.
    #[must_use]
    pub fn frame_count(&self, tab_id: TabId) -> usize {
        self.hrefs.get(&tab_id).map_or(0, FxHashMap::len)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Capture event log.
//!
//! Every navigation, network and tab event that touches capture state goes
//! through [`CaptureLog::apply`]. The log owns the frame tracker and the
//! request store, runs the matching hook, and keeps a bounded history of
//! what each event did. Orderings the browser may produce (headers for a
//! request that was never captured, events for a released ID) show up as
//! explicit outcomes instead of silent no-ops.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use tracing::debug;

use crate::identifiers::{FrameId, TabId};
use crate::protocol::{HeaderDetails, RequestDetails};

use super::capture;
use super::store::{InsertOutcome, RequestKey, RequestStore};
use super::tracker::FrameTracker;

// ============================================================================
// CaptureEvent
// ============================================================================

/// Input to the capture log.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// A frame committed a navigation.
    FrameCommitted {
        /// Tab.
        tab_id: TabId,
        /// Frame.
        frame_id: FrameId,
        /// Committed URL.
        url: String,
    },

    /// A request was initiated.
    RequestInitiated(RequestDetails),

    /// A request's headers were finalized.
    HeadersFinalized(HeaderDetails),

    /// A tab was closed.
    TabClosed {
        /// Tab.
        tab_id: TabId,
    },
}

impl CaptureEvent {
    /// Short name used in log records.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FrameCommitted { .. } => "frameCommitted",
            Self::RequestInitiated(_) => "requestInitiated",
            Self::HeadersFinalized(_) => "headersFinalized",
            Self::TabClosed { .. } => "tabClosed",
        }
    }
}

// ============================================================================
// Applied
// ============================================================================

/// What an event did to capture state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A non-top frame's href was recorded.
    FrameRecorded,
    /// Top-level navigation, nothing recorded.
    FrameIgnored,
    /// A request was stored (new or replaced by a redirect).
    Captured {
        /// Entry key.
        key: RequestKey,
        /// Inserted or replaced.
        outcome: InsertOutcome,
    },
    /// Headers were merged into an existing entry.
    HeadersMerged {
        /// Entry key.
        key: RequestKey,
        /// Headers in the event.
        count: usize,
    },
    /// Headers arrived for a request with no entry and were dropped.
    HeadersDropped {
        /// Key the headers were meant for.
        key: RequestKey,
    },
    /// Event from the top-level frame.
    SkippedTopFrame,
    /// Event from a frame with no known href.
    SkippedUnknownFrame,
    /// Event not associated with a tab.
    SkippedNoTab,
    /// Event for a request ID already released in the tab.
    SkippedReleased {
        /// Released key.
        key: RequestKey,
    },
    /// A tab was closed and its state dropped.
    TabCleared {
        /// Tab.
        tab_id: TabId,
        /// Entries dropped.
        dropped: usize,
    },
}

impl Applied {
    /// Returns `true` if the event changed capture state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::FrameRecorded
                | Self::Captured { .. }
                | Self::HeadersMerged { .. }
                | Self::TabCleared { .. }
        )
    }
}

// ============================================================================
// LogRecord
// ============================================================================

/// One entry of the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Monotonic sequence number.
    pub seq: u64,
    /// Event kind.
    pub kind: &'static str,
    /// Outcome.
    pub applied: Applied,
}

// ============================================================================
// CaptureLog
// ============================================================================

/// Event-sourced capture state.
#[derive(Debug)]
pub struct CaptureLog {
    tracker: FrameTracker,
    store: RequestStore,
    history: VecDeque<LogRecord>,
    capacity: usize,
    next_seq: u64,
}

impl CaptureLog {
    /// Creates an empty log keeping at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tracker: FrameTracker::new(),
            store: RequestStore::new(),
            history: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_seq: 0,
        }
    }

    /// Applies an event and records its outcome.
    pub fn apply(&mut self, event: CaptureEvent) -> Applied {
        let kind = event.kind();
        let applied = match event {
            CaptureEvent::FrameCommitted {
                tab_id,
                frame_id,
                url,
            } => {
                if self.tracker.commit(tab_id, frame_id, &url) {
                    Applied::FrameRecorded
                } else {
                    Applied::FrameIgnored
                }
            }
            CaptureEvent::RequestInitiated(details) => {
                capture::on_before_request(&self.tracker, &mut self.store, &details)
            }
            CaptureEvent::HeadersFinalized(details) => {
                capture::on_before_send_headers(&self.tracker, &mut self.store, &details)
            }
            CaptureEvent::TabClosed { tab_id } => {
                let dropped = self.store.forget_tab(tab_id);
                self.tracker.forget_tab(tab_id);
                Applied::TabCleared { tab_id, dropped }
            }
        };

        if let Applied::HeadersDropped { key } = &applied {
            debug!(tab_id = %key.tab_id, request_id = %key.request_id, "Headers for uncaptured request dropped");
        }

        self.record(kind, applied.clone());
        applied
    }

    /// Returns the frame tracker.
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &FrameTracker {
        &self.tracker
    }

    /// Returns the request store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    /// Returns the request store mutably, for the replay broker.
    #[inline]
    pub fn store_mut(&mut self) -> &mut RequestStore {
        &mut self.store
    }

    /// Iterates retained records, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &LogRecord> {
        self.history.iter()
    }

    /// Returns the most recent record.
    #[must_use]
    pub fn last(&self) -> Option<&LogRecord> {
        self.history.back()
    }

    /// Total number of events applied, including evicted records.
    #[inline]
    #[must_use]
    pub fn applied_count(&self) -> u64 {
        self.next_seq
    }

    fn record(&mut self, kind: &'static str, applied: Applied) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(LogRecord { seq, kind, applied });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use crate::identifiers::RequestId;
    use crate::protocol::HttpHeader;

    const WIDGET: &str = "https://embed.example.com/widget";

    fn tab(id: i64) -> TabId {
        TabId::new(id).expect("valid tab id")
    }

    fn initiated(id: &str) -> CaptureEvent {
        CaptureEvent::RequestInitiated(RequestDetails {
            tab_id: 1,
            frame_id: FrameId::new(7),
            request_id: RequestId::new(id),
            url: "https://api.example.com/submit".to_string(),
            method: "POST".to_string(),
            resource_type: "xmlhttprequest".to_string(),
            request_body: None,
        })
    }

    fn finalized(id: &str) -> CaptureEvent {
        CaptureEvent::HeadersFinalized(HeaderDetails {
            tab_id: 1,
            frame_id: FrameId::new(7),
            request_id: RequestId::new(id),
            url: "https://api.example.com/submit".to_string(),
            resource_type: "xmlhttprequest".to_string(),
            request_headers: vec![HttpHeader {
                name: "X-Token".to_string(),
                value: Some("t".to_string()),
            }],
        })
    }

    fn committed() -> CaptureEvent {
        CaptureEvent::FrameCommitted {
            tab_id: tab(1),
            frame_id: FrameId::new(7),
            url: WIDGET.to_string(),
        }
    }

    #[test]
    fn test_outcomes_are_recorded_in_order() {
        let mut log = CaptureLog::new(16);
        log.apply(committed());
        log.apply(finalized("1"));
        log.apply(initiated("1"));
        log.apply(finalized("1"));

        let kinds: Vec<_> = log.history().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec!["frameCommitted", "headersFinalized", "requestInitiated", "headersFinalized"]
        );

        let outcomes: Vec<_> = log.history().map(|r| &r.applied).collect();
        assert_eq!(outcomes[0], &Applied::FrameRecorded);
        assert!(matches!(outcomes[1], Applied::HeadersDropped { .. }));
        assert!(matches!(
            outcomes[2],
            Applied::Captured {
                outcome: InsertOutcome::Inserted,
                ..
            }
        ));
        assert!(matches!(outcomes[3], Applied::HeadersMerged { count: 1, .. }));
    }

    #[test]
    fn test_tab_close_cascades() {
        let mut log = CaptureLog::new(16);
        log.apply(committed());
        log.apply(initiated("1"));
        log.apply(initiated("2"));

        let applied = log.apply(CaptureEvent::TabClosed { tab_id: tab(1) });
        assert_eq!(
            applied,
            Applied::TabCleared {
                tab_id: tab(1),
                dropped: 2
            }
        );
        assert!(log.store().is_empty());
        assert_eq!(log.tracker().frame_count(tab(1)), 0);
    }

    #[test]
    fn test_released_id_is_reported() {
        let mut log = CaptureLog::new(16);
        log.apply(committed());
        log.apply(initiated("1"));

        let (id, _) = log
            .store()
            .resolve(tab(1), WIDGET, "submit", &BTreeMap::new())
            .expect("resolve");
        let key = RequestKey::new(tab(1), WIDGET.into(), id.clone());
        assert!(log.store_mut().release(&key));

        assert!(matches!(
            log.apply(initiated("1")),
            Applied::SkippedReleased { .. }
        ));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut log = CaptureLog::new(2);
        log.apply(committed());
        log.apply(initiated("1"));
        log.apply(initiated("2"));

        assert_eq!(log.applied_count(), 3);
        let seqs: Vec<_> = log.history().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(log.last().map(|r| r.seq), Some(2));
    }

    #[test]
    fn test_top_frame_commit_is_ignored() {
        let mut log = CaptureLog::new(4);
        let applied = log.apply(CaptureEvent::FrameCommitted {
            tab_id: tab(1),
            frame_id: FrameId::main(),
            url: "https://top.example.com/".to_string(),
        });
        assert_eq!(applied, Applied::FrameIgnored);
        assert!(!applied.is_mutation());
    }
}

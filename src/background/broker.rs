//! Replay broker.
//!
//! Answers the control commands a frame sends to the privileged context.
//! One handler per [`BackgroundCommand`] variant; every handler returns a
//! [`Reply`] and failures never leave the store half-updated.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{FrameHref, RequestId, TabId};
use crate::protocol::{BackgroundCommand, Reply};

use super::store::{RequestKey, RequestStore};

// ============================================================================
// ReplayBroker
// ============================================================================

/// Stateless command handler over a [`RequestStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayBroker;

impl ReplayBroker {
    /// Creates a broker.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Handles one command from a frame in `tab_id`.
    pub fn handle(&self, store: &mut RequestStore, tab_id: TabId, command: BackgroundCommand) -> Reply {
        trace!(%tab_id, ?command, "Background command");

        let result = match command {
            BackgroundCommand::GetRequestForReplay { url, headers, href } => {
                self.get_request_for_replay(store, tab_id, &url, headers, href)
            }
            BackgroundCommand::ClearTabCache => Ok(self.clear_tab_cache(store, tab_id)),
            BackgroundCommand::ClearReplayedRequest { request_id, href } => {
                self.clear_replayed_request(store, tab_id, request_id, href)
            }
        };

        result.into()
    }

    /// Looks up the first matching captured request.
    ///
    /// Reply payload: `{request, requestId}`.
    fn get_request_for_replay(
        &self,
        store: &RequestStore,
        tab_id: TabId,
        url: &str,
        headers: Option<BTreeMap<String, String>>,
        href: Option<String>,
    ) -> Result<Reply> {
        let href = href.ok_or_else(|| Error::href_missing("getRequestForReplay"))?;
        let headers = headers.unwrap_or_default();

        let (request_id, request) = store.resolve(tab_id, &href, url, &headers)?;
        debug!(%tab_id, %href, %request_id, "Resolved request for replay");

        Ok(Reply::ok()
            .with_field("request", serde_json::to_value(request)?)
            .with_field("requestId", request_id.as_str()))
    }

    /// Drops everything captured for the tab. Dropped IDs stay released.
    fn clear_tab_cache(&self, store: &mut RequestStore, tab_id: TabId) -> Reply {
        store.clear_tab(tab_id);
        Reply::ok()
    }

    /// Releases one entry. Releasing an absent entry succeeds.
    fn clear_replayed_request(
        &self,
        store: &mut RequestStore,
        tab_id: TabId,
        request_id: RequestId,
        href: Option<String>,
    ) -> Result<Reply> {
        let href = href.ok_or_else(|| Error::href_missing("clearReplayedRequest"))?;
        let key = RequestKey::new(tab_id, FrameHref::new(href), request_id);
        if !store.release(&key) {
            trace!(%tab_id, request_id = %key.request_id, "Release of absent entry");
        }
        Ok(Reply::ok())
    }
}

// ============================================================================
// Tests
// ============================================================================

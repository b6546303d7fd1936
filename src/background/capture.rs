//! Network capture hooks.
//!
//! The two hooks are pure observers: they read browser event details and
//! update the store, and nothing they do can delay or alter the request.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use tracing::{trace, warn};

use crate::error::Result;
use crate::protocol::{
    CapturedRequest, FormData, HeaderDetails, RequestBodyDescriptor, RequestDetails,
};

use super::log::Applied;
use super::store::{InsertOutcome, RequestKey, RequestStore};
use super::tracker::FrameTracker;

// ============================================================================
// CapturedBody
// ============================================================================

/// Body reconstructed from a browser body descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedBody {
    /// Nothing to replay.
    Empty,
    /// Structured form fields.
    Form(FormData),
    /// Concatenated raw bytes, base64 encoded.
    Raw(String),
}

impl CapturedBody {
    /// Reconstructs a body.
    ///
    /// Form fields win over raw bytes. Raw chunks are concatenated in the
    /// order supplied; an empty concatenation means no body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BodyDecode`] if a chunk's base64 text is malformed.
    pub fn from_descriptor(descriptor: &RequestBodyDescriptor) -> Result<Self> {
        if let Some(form) = &descriptor.form_data {
            return Ok(Self::Form(form.clone()));
        }

        let Some(chunks) = &descriptor.raw else {
            return Ok(Self::Empty);
        };

        let mut bytes = Vec::new();
        for chunk in chunks {
            chunk.append_to(&mut bytes)?;
        }
        if bytes.is_empty() {
            return Ok(Self::Empty);
        }
        Ok(Self::Raw(Base64Standard.encode(bytes)))
    }

    /// Writes the body into a captured request.
    pub fn apply_to(self, request: &mut CapturedRequest) {
        match self {
            Self::Empty => {}
            Self::Form(form) => request.form_data = Some(form),
            Self::Raw(encoded) => request.body = Some(encoded),
        }
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// Initiation hook: records a new request from a non-top frame.
pub(crate) fn on_before_request(
    tracker: &FrameTracker,
    store: &mut RequestStore,
    details: &RequestDetails,
) -> Applied {
    let Some(tab_id) = details.tab() else {
        return Applied::SkippedNoTab;
    };
    if details.frame_id.is_main() {
        return Applied::SkippedTopFrame;
    }

    let Some(href) = tracker.resolve(
        tab_id,
        details.frame_id,
        &details.url,
        details.is_sub_frame(),
    ) else {
        trace!(%tab_id, frame_id = %details.frame_id, url = %details.url, "Request from unknown frame");
        return Applied::SkippedUnknownFrame;
    };

    let mut request = CapturedRequest::new(&details.url, &details.method);
    if let Some(descriptor) = &details.request_body {
        match CapturedBody::from_descriptor(descriptor) {
            Ok(body) => body.apply_to(&mut request),
            Err(e) => {
                warn!(%tab_id, request_id = %details.request_id, error = %e, "Captured request without body");
            }
        }
    }

    let key = RequestKey::new(tab_id, href, details.request_id.clone());
    match store.insert(key.clone(), request) {
        InsertOutcome::Released => Applied::SkippedReleased { key },
        outcome => {
            trace!(tab_id = %key.tab_id, href = %key.href, request_id = %key.request_id, ?outcome, "Captured request");
            Applied::Captured { key, outcome }
        }
    }
}

/// Header-finalization hook: merges headers into an existing entry.
pub(crate) fn on_before_send_headers(
    tracker: &FrameTracker,
    store: &mut RequestStore,
    details: &HeaderDetails,
) -> Applied {
    let Some(tab_id) = details.tab() else {
        return Applied::SkippedNoTab;
    };
    if details.frame_id.is_main() {
        return Applied::SkippedTopFrame;
    }

    let Some(href) = tracker.resolve(
        tab_id,
        details.frame_id,
        &details.url,
        details.is_sub_frame(),
    ) else {
        return Applied::SkippedUnknownFrame;
    };

    let key = RequestKey::new(tab_id, href, details.request_id.clone());
    let headers = details
        .request_headers
        .iter()
        .filter_map(|header| header.value.as_deref().map(|value| (header.name.as_str(), value)));

    if store.merge_headers(&key, headers) {
        Applied::HeadersMerged {
            key,
            count: details.request_headers.len(),
        }
    } else {
        Applied::HeadersDropped { key }
    }
}

// ============================================================================
// Tests
// ============================================================================

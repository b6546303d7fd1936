//! Replay executor.
//!
//! Re-issues a captured request from inside the frame that originally made
//! it, then releases the cache entry.
//!
//! # Replay Flow
//!
//! 1. `getRequestForReplay` to the background (url fragment, headers, href)
//! 2. Prepare headers and body from the captured request
//! 3. Issue it through the frame's [`Fetcher`]
//! 4. `clearReplayedRequest`, exactly once, whatever happened in 2 and 3
//! 5. Report `{status, text}` or the failure reason

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::bridge::BackgroundPort;
use crate::error::{Error, Result};
use crate::identifiers::{FrameHref, RequestId};
use crate::protocol::{BackgroundCommand, CapturedRequest};

use super::fetch::{FetchBody, FetchRequest, FetchResponse, Fetcher};

// ============================================================================
// Constants
// ============================================================================

/// Headers the transport computes itself.
const STRIPPED_HEADERS: [&str; 2] = ["content-length", "host"];

/// Content type that selects url-encoded form replay.
const URLENCODED: &str = "application/x-www-form-urlencoded";

/// Reported when the background gives no reason for a failed lookup.
const LOOKUP_FALLBACK: &str = "Failed to get request for replay.";

// ============================================================================
// Preparation
// ============================================================================

/// Builds the outbound request from a captured one.
///
/// Drops `Content-Length` and `Host` (case-insensitive). Form fields are
/// sent url-encoded when the original `Content-Type` says so, otherwise as
/// multipart with any stale `Content-Type` removed. A raw body is base64
/// decoded verbatim.
///
/// # Errors
///
/// Returns [`Error::BodyDecode`] if the stored body is not valid base64.
pub fn prepare(request: &CapturedRequest) -> Result<FetchRequest> {
    let mut headers: BTreeMap<String, String> = request
        .headers
        .iter()
        .filter(|(name, _)| !STRIPPED_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let body = if let Some(form) = &request.form_data {
        let urlencoded = content_type(&headers).is_some_and(|value| value.contains(URLENCODED));
        remove_content_type(&mut headers);
        if urlencoded {
            headers.insert("Content-Type".to_string(), URLENCODED.to_string());
            FetchBody::UrlEncoded(form.to_urlencoded())
        } else {
            FetchBody::Multipart(form.clone())
        }
    } else {
        match request.decoded_body()? {
            Some(bytes) => FetchBody::Bytes(bytes),
            None => FetchBody::None,
        }
    };

    Ok(FetchRequest {
        method: request.method.clone(),
        url: request.url.clone(),
        headers,
        body,
    })
}

fn content_type(headers: &BTreeMap<String, String>) -> Option<&str> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.as_str())
}

fn remove_content_type(headers: &mut BTreeMap<String, String>) {
    headers.retain(|name, _| !name.eq_ignore_ascii_case("content-type"));
}

// ============================================================================
// ReplayExecutor
// ============================================================================

/// Runs replays for one frame.
#[derive(Clone)]
pub struct ReplayExecutor {
    href: FrameHref,
    background: Arc<dyn BackgroundPort>,
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for ReplayExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayExecutor")
            .field("href", &self.href)
            .finish_non_exhaustive()
    }
}

impl ReplayExecutor {
    /// Creates an executor for the frame at `href`.
    #[must_use]
    pub fn new(
        href: impl Into<FrameHref>,
        background: Arc<dyn BackgroundPort>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            href: href.into(),
            background,
            fetcher,
        }
    }

    /// Returns the frame href used as the cache key.
    #[inline]
    #[must_use]
    pub fn href(&self) -> &FrameHref {
        &self.href
    }

    /// Looks up, replays and releases a captured request.
    ///
    /// # Errors
    ///
    /// - The background's lookup failure text, as [`Error::Bridge`]
    /// - [`Error::BodyDecode`] if the stored body is malformed
    /// - [`Error::Transport`] if the request could not be issued
    pub async fn replay(
        &self,
        url: &str,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<FetchResponse> {
        let (request_id, request) = self.lookup(url, headers).await?;

        let result = match prepare(&request) {
            Ok(prepared) => self.fetcher.fetch(prepared).await,
            Err(e) => Err(e),
        };

        self.release(request_id).await;

        match &result {
            Ok(response) => debug!(href = %self.href, status = response.status, "Replay finished"),
            Err(e) => warn!(href = %self.href, error = %e, "Replay failed"),
        }
        result
    }

    async fn lookup(
        &self,
        url: &str,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<(RequestId, CapturedRequest)> {
        let mut reply = self
            .background
            .send(BackgroundCommand::GetRequestForReplay {
                url: url.to_string(),
                headers,
                href: Some(self.href.to_string()),
            })
            .await?
            .into_result(LOOKUP_FALLBACK)?;

        let request = reply
            .payload
            .remove("request")
            .ok_or_else(|| Error::bridge(LOOKUP_FALLBACK))?;
        let request: CapturedRequest = serde_json::from_value(request)?;

        let request_id = match reply.payload.remove("requestId") {
            Some(Value::String(id)) => RequestId::new(id),
            Some(Value::Number(id)) => RequestId::new(id.to_string()),
            _ => return Err(Error::bridge(LOOKUP_FALLBACK)),
        };

        Ok((request_id, request))
    }

    /// Releases the entry. Failures are logged; the replay outcome stands.
    async fn release(&self, request_id: RequestId) {
        let command = BackgroundCommand::ClearReplayedRequest {
            request_id,
            href: Some(self.href.to_string()),
        };
        match self.background.send(command).await {
            Ok(reply) if reply.success => {}
            Ok(reply) => warn!(href = %self.href, error = ?reply.error, "Release rejected"),
            Err(e) => warn!(href = %self.href, error = %e, "Release failed"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::protocol::{FormData, Reply};

    const WIDGET: &str = "https://embed.example.com/widget";

    /// Background stub that serves one request and records commands.
    struct StubBackground {
        request: Value,
        commands: Mutex<Vec<BackgroundCommand>>,
    }

    impl StubBackground {
        fn new(request: Value) -> Arc<Self> {
            Arc::new(Self {
                request,
                commands: Mutex::new(Vec::new()),
            })
        }

        fn releases(&self) -> usize {
            self.commands
                .lock()
                .iter()
                .filter(|c| matches!(c, BackgroundCommand::ClearReplayedRequest { .. }))
                .count()
        }
    }

    #[async_trait]
    impl BackgroundPort for StubBackground {
        async fn send(&self, command: BackgroundCommand) -> Result<Reply> {
            self.commands.lock().push(command.clone());
            Ok(match command {
                BackgroundCommand::GetRequestForReplay { .. } => Reply::ok()
                    .with_field("request", self.request.clone())
                    .with_field("requestId", "881"),
                _ => Reply::ok(),
            })
        }
    }

    struct StubFetcher {
        outcome: fn() -> Result<FetchResponse>,
        seen: Mutex<Vec<FetchRequest>>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
            self.seen.lock().push(request);
            (self.outcome)()
        }
    }

    fn ok_fetcher() -> Arc<StubFetcher> {
        Arc::new(StubFetcher {
            outcome: || {
                Ok(FetchResponse {
                    status: 200,
                    text: "ok".to_string(),
                })
            },
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_prepare_strips_transport_headers() {
        let mut request = CapturedRequest::new("https://api.example.com/submit", "POST");
        for (name, value) in [("content-length", "10"), ("HOST", "api"), ("X-Token", "t")] {
            request.headers.insert(name.to_string(), value.to_string());
        }

        let prepared = prepare(&request).expect("prepare");
        assert_eq!(prepared.headers.len(), 1);
        assert_eq!(prepared.headers.get("X-Token").map(String::as_str), Some("t"));
        assert_eq!(prepared.body, FetchBody::None);
    }

    #[test]
    fn test_prepare_urlencoded_form() {
        let mut request = CapturedRequest::new("https://api.example.com/submit", "POST");
        request.form_data = Some(FormData::new().with_field("a", vec!["1".to_string()]));
        request.headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded; charset=UTF-8".to_string(),
        );

        let prepared = prepare(&request).expect("prepare");
        assert_eq!(prepared.body, FetchBody::UrlEncoded("a=1".to_string()));
        assert_eq!(
            prepared.headers.get("Content-Type").map(String::as_str),
            Some(URLENCODED)
        );
        assert!(!prepared.headers.contains_key("content-type"));
    }

    #[test]
    fn test_prepare_multipart_drops_content_type() {
        let mut request = CapturedRequest::new("https://api.example.com/submit", "POST");
        request.form_data = Some(FormData::new().with_field("a", vec!["1".to_string()]));
        request.headers.insert(
            "Content-Type".to_string(),
            "multipart/form-data; boundary=stale".to_string(),
        );

        let prepared = prepare(&request).expect("prepare");
        assert!(matches!(prepared.body, FetchBody::Multipart(_)));
        assert!(content_type(&prepared.headers).is_none());
    }

    #[test]
    fn test_prepare_rejects_bad_base64() {
        let mut request = CapturedRequest::new("https://api.example.com/submit", "POST");
        request.body = Some("not base64!".to_string());
        assert!(matches!(prepare(&request), Err(Error::BodyDecode { .. })));
    }

    #[tokio::test]
    async fn test_replay_releases_once_on_success() {
        let background = StubBackground::new(json!({
            "url": "https://api.example.com/submit",
            "method": "POST",
            "headers": {},
        }));
        let fetcher = ok_fetcher();
        let executor = ReplayExecutor::new(WIDGET, background.clone(), fetcher.clone());

        let response = executor.replay("submit", None).await.expect("replay");
        assert_eq!(response.status, 200);
        assert_eq!(background.releases(), 1);
        assert_eq!(fetcher.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_releases_once_on_transport_failure() {
        let background = StubBackground::new(json!({
            "url": "https://api.example.com/submit",
            "method": "GET",
            "headers": {},
        }));
        let fetcher = Arc::new(StubFetcher {
            outcome: || Err(Error::transport("connection reset")),
            seen: Mutex::new(Vec::new()),
        });
        let executor = ReplayExecutor::new(WIDGET, background.clone(), fetcher);

        let err = executor.replay("submit", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Network error: connection reset");
        assert_eq!(background.releases(), 1);
    }

    #[tokio::test]
    async fn test_replay_releases_once_on_decode_failure() {
        let background = StubBackground::new(json!({
            "url": "https://api.example.com/submit",
            "method": "POST",
            "body": "***",
            "headers": {},
        }));
        let fetcher = ok_fetcher();
        let executor = ReplayExecutor::new(WIDGET, background.clone(), fetcher.clone());

        let err = executor.replay("submit", None).await.unwrap_err();
        assert!(matches!(err, Error::BodyDecode { .. }));
        assert_eq!(background.releases(), 1);
        assert!(fetcher.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_does_not_release() {
        struct Empty;

        #[async_trait]
        impl BackgroundPort for Empty {
            async fn send(&self, _command: BackgroundCommand) -> Result<Reply> {
                Ok(Reply::failure("No requests logged for this tab."))
            }
        }

        let executor = ReplayExecutor::new(WIDGET, Arc::new(Empty), ok_fetcher());
        let err = executor.replay("submit", None).await.unwrap_err();
        assert_eq!(err.to_string(), "No requests logged for this tab.");
    }
}

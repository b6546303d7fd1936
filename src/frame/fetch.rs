//! Outbound HTTP for replays.
//!
//! The replay executor hands a fully prepared [`FetchRequest`] to a
//! [`Fetcher`]. Inside a browser the fetcher is the frame's own network
//! stack, which carries the frame's cookies and origin; [`HttpFetcher`] is
//! the `reqwest` implementation used outside one.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ReplayConfig;
use crate::error::{Error, Result};
use crate::protocol::FormData;

// ============================================================================
// Types
// ============================================================================

/// Body of a replayed request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchBody {
    /// No body.
    #[default]
    None,
    /// `application/x-www-form-urlencoded` text.
    UrlEncoded(String),
    /// Multipart form; the transport picks the boundary and content type.
    Multipart(FormData),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

/// A request ready to be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// Headers to send.
    pub headers: BTreeMap<String, String>,
    /// Body.
    pub body: FetchBody,
}

/// Status and text of a replayed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub text: String,
}

// ============================================================================
// Fetcher
// ============================================================================

/// Issues replayed requests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Sends the request and reads the full response text.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

// ============================================================================
// HttpFetcher
// ============================================================================

/// [`Fetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher using the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client cannot be built.
    pub fn new(config: &ReplayConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.http_timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wraps an existing client.
    #[inline]
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::invalid_argument(format!("method {}: {e}", request.method)))?;
        let url = url::Url::parse(&request.url)?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            FetchBody::None => builder,
            FetchBody::UrlEncoded(text) => builder.body(text),
            FetchBody::Multipart(form) => builder.multipart(
                form.pairs()
                    .fold(Form::new(), |parts, (name, value)| {
                        parts.text(name.to_string(), value.to_string())
                    }),
            ),
            FetchBody::Bytes(bytes) => builder.body(bytes),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        debug!(status, url = %request.url, "Replayed request completed");
        Ok(FetchResponse { status, text })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_string, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&ReplayConfig::default()).expect("client")
    }

    fn request(server: &MockServer, method: &str, body: FetchBody) -> FetchRequest {
        FetchRequest {
            method: method.to_string(),
            url: format!("{}/submit", server.uri()),
            headers: BTreeMap::new(),
            body,
        }
    }

    #[tokio::test]
    async fn test_urlencoded_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_string("a=1&b=x+y"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let mut req = request(&server, "POST", FetchBody::UrlEncoded("a=1&b=x+y".to_string()));
        req.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );

        let response = fetcher().fetch(req).await.expect("fetch");
        assert_eq!(response, FetchResponse { status: 200, text: "ok".to_string() });
    }

    #[tokio::test]
    async fn test_multipart_sets_boundary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(header_exists("content-type"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .mount(&server)
            .await;

        let form = FormData::new().with_field("a", vec!["1".to_string()]);
        let response = fetcher()
            .fetch(request(&server, "POST", FetchBody::Multipart(form)))
            .await
            .expect("fetch");
        assert_eq!(response.status, 201);

        let received = server.received_requests().await.expect("recording");
        let content_type = received[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[tokio::test]
    async fn test_headers_are_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-token", "t"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let mut req = request(&server, "GET", FetchBody::None);
        req.headers.insert("X-Token".to_string(), "t".to_string());
        assert_eq!(fetcher().fetch(req).await.expect("fetch").status, 204);
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let response = fetcher()
            .fetch(request(&server, "POST", FetchBody::Bytes(b"{}".to_vec())))
            .await
            .expect("fetch");
        assert_eq!(response.status, 500);
        assert_eq!(response.text, "boom");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let req = FetchRequest {
            method: "GET".to_string(),
            url: "http://127.0.0.1:9/".to_string(),
            headers: BTreeMap::new(),
            body: FetchBody::None,
        };
        let err = fetcher().fetch(req).await.unwrap_err();
        assert!(err.is_transport_error());
    }
}

//! Browser cookie types.

use serde::{Deserialize, Serialize};

// ============================================================================
// SameSite
// ============================================================================

/// Cookie `SameSite` attribute as the browser cookies API spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    /// `SameSite=None`.
    NoRestriction,
    /// `SameSite=Lax`.
    Lax,
    /// `SameSite=Strict`.
    Strict,
    /// Attribute not set.
    Unspecified,
}

// ============================================================================
// Cookie
// ============================================================================

/// Cookie as returned by the browser cookies API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain, with a leading dot for domain cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag.
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    /// SameSite attribute.
    #[serde(rename = "sameSite", default = "default_same_site")]
    pub same_site: SameSite,
    /// Expiration timestamp in seconds (session cookie if absent).
    #[serde(
        rename = "expirationDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<f64>,
    /// Cookie store the cookie lives in.
    #[serde(rename = "storeId", default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

fn default_same_site() -> SameSite {
    SameSite::Unspecified
}

impl Cookie {
    /// Creates a session cookie with name and value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            expiration_date: None,
            store_id: None,
        }
    }

    /// Sets the domain.
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the secure flag.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the sameSite attribute.
    #[inline]
    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Sets the expiration date.
    #[inline]
    #[must_use]
    pub fn with_expiration_date(mut self, expiration_date: f64) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }
}

// ============================================================================
// CookieUpdate
// ============================================================================

/// Details for a cookie write (`cookies.set`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CookieUpdate {
    /// URL the cookie is associated with.
    pub url: String,
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Secure flag.
    pub secure: bool,
    /// HttpOnly flag.
    #[serde(rename = "httpOnly")]
    pub http_only: bool,
    /// SameSite attribute.
    #[serde(rename = "sameSite")]
    pub same_site: SameSite,
    /// Explicit domain (omitted for host-only cookies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiration in whole seconds.
    #[serde(rename = "expirationDate", skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<i64>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_from_browser_json() {
        let cookie: Cookie = serde_json::from_str(
            r#"{
                "name": "sid",
                "value": "abc",
                "domain": ".example.com",
                "path": "/",
                "secure": false,
                "httpOnly": true,
                "sameSite": "lax",
                "storeId": "0"
            }"#,
        )
        .expect("parse");

        assert_eq!(cookie.same_site, SameSite::Lax);
        assert!(cookie.http_only);
        assert_eq!(cookie.expiration_date, None);
    }

    #[test]
    fn test_same_site_defaults_to_unspecified() {
        let cookie: Cookie = serde_json::from_str(r#"{"name":"a","value":"b"}"#).expect("parse");
        assert_eq!(cookie.same_site, SameSite::Unspecified);
    }

    #[test]
    fn test_update_serialization() {
        let update = CookieUpdate {
            url: "https://example.com/".into(),
            name: "sid".into(),
            value: "abc".into(),
            secure: true,
            http_only: false,
            same_site: SameSite::NoRestriction,
            domain: None,
            path: Some("/".into()),
            expiration_date: Some(1_700_000_000),
        };
        let json = serde_json::to_string(&update).expect("serialize");
        assert!(json.contains("\"sameSite\":\"no_restriction\""));
        assert!(!json.contains("domain"));
    }
}

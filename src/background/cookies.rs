//! Cookie attribute normalization.
//!
//! Cookies set for framed sites are rewritten to `SameSite=None; Secure` so
//! they keep flowing when the site is embedded cross-site. The rewrite is a
//! pure function ([`normalize`]); [`CookieNormalizer`] drives it from
//! navigation and cookie events through a [`CookieJar`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Cookie, CookieChange, CookieUpdate, NavigationDetails, SameSite};

// ============================================================================
// CookieJar
// ============================================================================

/// Access to the browser cookie store.
#[async_trait]
pub trait CookieJar: Send + Sync {
    /// Returns every cookie that would be sent to `url`.
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>>;

    /// Returns one cookie with full attributes.
    async fn get(&self, url: &str, name: &str, store_id: Option<&str>) -> Result<Option<Cookie>>;

    /// Writes a cookie.
    async fn set(&self, update: CookieUpdate) -> Result<()>;
}

// ============================================================================
// Pure Functions
// ============================================================================

/// URL a cookie is associated with.
///
/// `http[s]://<domain without leading dot><path or "/">`, or `None` for a
/// cookie without a domain.
#[must_use]
pub fn cookie_url(cookie: &Cookie) -> Option<String> {
    let domain = cookie.domain.as_deref()?;
    let host = domain.strip_prefix('.').unwrap_or(domain);
    let scheme = if cookie.secure { "https" } else { "http" };
    let path = cookie.path.as_deref().unwrap_or("/");
    Some(format!("{scheme}://{host}{path}"))
}

/// Computes the update that makes a cookie cross-site capable.
///
/// Returns `Ok(None)` when the cookie already is `SameSite=None; Secure`.
///
/// # Errors
///
/// - [`crate::Error::Cookie`] if the cookie has no domain
/// - [`crate::Error::Url`] if the derived URL does not parse
pub fn normalize(cookie: &Cookie) -> Result<Option<CookieUpdate>> {
    let secure = match cookie.same_site {
        SameSite::Lax | SameSite::Strict | SameSite::Unspecified => true,
        SameSite::NoRestriction if !cookie.secure => true,
        SameSite::NoRestriction => return Ok(None),
    };

    let url = cookie_url(cookie).ok_or_else(|| {
        Error::cookie(format!(
            "Could not determine URL for cookie \"{}\"",
            cookie.name
        ))
    })?;
    let host = Url::parse(&url)?.host_str().unwrap_or_default().to_lowercase();

    let domain = cookie
        .domain
        .as_ref()
        .filter(|domain| !cookie.name.starts_with("__Host-") && domain.to_lowercase() != host)
        .cloned();

    #[allow(clippy::cast_possible_truncation)]
    let expiration_date = cookie.expiration_date.map(|seconds| seconds.floor() as i64);

    Ok(Some(CookieUpdate {
        url,
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        secure,
        http_only: cookie.http_only,
        same_site: SameSite::NoRestriction,
        domain,
        path: cookie.path.clone(),
        expiration_date,
    }))
}

// ============================================================================
// CookieNormalizer
// ============================================================================

/// Applies [`normalize`] in response to browser events.
///
/// Failures are logged and swallowed; the normalizer never affects capture.
#[derive(Clone)]
pub struct CookieNormalizer {
    jar: Arc<dyn CookieJar>,
}

impl std::fmt::Debug for CookieNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieNormalizer").finish_non_exhaustive()
    }
}

impl CookieNormalizer {
    /// Creates a normalizer over a jar.
    #[inline]
    #[must_use]
    pub fn new(jar: Arc<dyn CookieJar>) -> Self {
        Self { jar }
    }

    /// Handles `webNavigation.onCompleted`.
    ///
    /// Only non-top frames on http(s) pages are processed. Returns the
    /// number of cookies rewritten.
    pub async fn on_frame_completed(&self, details: &NavigationDetails) -> usize {
        if details.frame_id.is_main() || !is_http(&details.url) {
            return 0;
        }

        trace!(url = %details.url, "Frame navigation completed, checking cookies");
        match self.jar.get_all(&details.url).await {
            Ok(cookies) => {
                let mut rewritten = 0;
                for cookie in &cookies {
                    if self.apply(cookie).await {
                        rewritten += 1;
                    }
                }
                rewritten
            }
            Err(e) => {
                warn!(url = %details.url, error = %e, "Failed to read cookies");
                0
            }
        }
    }

    /// Handles `cookies.onChanged`. Removals are ignored.
    ///
    /// Returns `true` if the cookie was rewritten.
    pub async fn on_cookie_changed(&self, change: &CookieChange) -> bool {
        if change.removed {
            return false;
        }

        let Some(url) = cookie_url(&change.cookie) else {
            trace!(name = %change.cookie.name, "Changed cookie has no domain");
            return false;
        };

        match self
            .jar
            .get(&url, &change.cookie.name, change.cookie.store_id.as_deref())
            .await
        {
            Ok(Some(cookie)) => self.apply(&cookie).await,
            Ok(None) => false,
            Err(e) => {
                warn!(name = %change.cookie.name, error = %e, "Failed to re-read changed cookie");
                false
            }
        }
    }

    async fn apply(&self, cookie: &Cookie) -> bool {
        let update = match normalize(cookie) {
            Ok(Some(update)) => update,
            Ok(None) => return false,
            Err(e) => {
                warn!(name = %cookie.name, error = %e, "Skipping cookie update");
                return false;
            }
        };

        let (name, url) = (update.name.clone(), update.url.clone());
        match self.jar.set(update).await {
            Ok(()) => {
                debug!(%name, %url, "Cookie set to SameSite=None; Secure");
                true
            }
            Err(e) => {
                warn!(%name, %url, error = %e, "Failed to update cookie");
                false
            }
        }
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

// ============================================================================
// Tests
// ============================================================================

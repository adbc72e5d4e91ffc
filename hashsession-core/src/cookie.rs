//! `Set-Cookie` value encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attributes attached to the session cookie when a new key is issued.
///
/// Every attribute is optional; absent or empty attributes are left out of
/// the encoded header value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// `path` attribute
    pub path: Option<String>,
    /// `domain` attribute
    pub domain: Option<String>,
    /// `expires` attribute
    pub expires: Option<DateTime<Utc>>,
    /// `secure` flag
    pub secure: bool,
    /// `HttpOnly` flag
    pub http_only: bool,
}

impl CookieOptions {
    /// Create options with no attributes set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cookie path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the cookie domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set an absolute expiry for the cookie.
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set the `secure` flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the `HttpOnly` flag.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Encode a `Set-Cookie` value for `name=value` with these attributes.
    pub fn to_set_cookie_value(&self, name: &str, value: &str) -> String {
        encode_set_cookie(name, value, self)
    }
}

/// Encode one `Set-Cookie` header value.
///
/// Name and value are percent-encoded. Attributes follow in a fixed order:
/// `domain`, `path`, `expires`, `secure`, `HttpOnly`.
///
/// ```
/// use hashsession_core::cookie::{CookieOptions, encode_set_cookie};
///
/// let attrs = CookieOptions::new()
///     .with_path("/")
///     .with_secure(true)
///     .with_http_only(true);
///
/// assert_eq!(
///     encode_set_cookie("session", "abc123", &attrs),
///     "session=abc123; path=/; secure; HttpOnly"
/// );
/// ```
pub fn encode_set_cookie(name: &str, value: &str, attrs: &CookieOptions) -> String {
    let mut out = format!("{}={}", urlencoding::encode(name), urlencoding::encode(value));

    if let Some(domain) = attrs.domain.as_deref().filter(|d| !d.is_empty()) {
        out.push_str("; domain=");
        out.push_str(domain);
    }

    if let Some(path) = attrs.path.as_deref().filter(|p| !p.is_empty()) {
        out.push_str("; path=");
        out.push_str(path);
    }

    if let Some(expires) = attrs.expires {
        out.push_str("; expires=");
        out.push_str(&format_cookie_date(expires));
    }

    if attrs.secure {
        out.push_str("; secure");
    }

    if attrs.http_only {
        out.push_str("; HttpOnly");
    }

    out
}

/// `ddd, dd-MMM-yyyy HH:mm:ss GMT`
fn format_cookie_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d-%b-%Y %H:%M:%S GMT").to_string()
}

//! Session key resolution.
//!
//! A request either carries its session key in a cookie, or gets a freshly
//! minted key together with a `Set-Cookie` header on the response.

use crate::config::SessionOptions;
use crate::error::SessionResult;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Generator used to mint keys for requests without a session cookie.
pub type KeyGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Opaque identifier of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Wrap an existing key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Split one `Cookie` header value into trimmed `(name, value)` pairs.
///
/// Pairs that do not split on `=` into exactly two parts are skipped.
pub fn parse_cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|item| {
        let mut parts = item.split('=');
        let name = parts.next()?;
        let value = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some((name.trim(), value.trim()))
    })
}

/// Find the value of the first cookie named `name` across every `Cookie`
/// header of the request.
///
/// The value is returned trimmed but otherwise as sent; it is not
/// percent-decoded.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_cookie_pairs)
        .find(|(cookie_name, _)| *cookie_name == name)
        .map(|(_, value)| value.to_string())
}

/// Resolve the session key for a request.
///
/// Returns the key carried by the configured cookie. When the cookie is
/// missing or empty a new key is minted and one `Set-Cookie` value is
/// appended to `response_headers`; existing values are left untouched.
pub fn resolve_session_key<C>(
    request_headers: &HeaderMap,
    response_headers: &mut HeaderMap,
    options: &SessionOptions<C>,
) -> SessionResult<SessionKey> {
    if let Some(key) = find_cookie(request_headers, options.cookie_name())
        && !key.is_empty()
    {
        return Ok(SessionKey(key));
    }

    let key = SessionKey((options.key_generator())());
    let cookie = options
        .cookie()
        .to_set_cookie_value(options.cookie_name(), key.as_str());
    response_headers.append(SET_COOKIE, HeaderValue::from_str(&cookie)?);

    debug!(cookie_name = options.cookie_name(), "Issued new session key");

    Ok(key)
}

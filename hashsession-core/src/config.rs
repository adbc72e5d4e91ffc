//! Session configuration.

use crate::codec::{JsonCodec, ValueCodec};
use crate::cookie::CookieOptions;
use crate::error::{SessionError, SessionResult};
use crate::key::{KeyGenerator, SessionKey, generate_session_id};
use crate::router::{StoreGroup, StoreRouter};
use crate::store::HashStore;
use crate::tracer::TracerFactory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default cookie carrying the session key.
pub const DEFAULT_COOKIE_NAME: &str = "session";

/// Default session lifetime, renewed on every request.
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Shortest accepted session expiry.
pub const MIN_EXPIRE: Duration = Duration::from_secs(1);

/// Options shared by every session created by one middleware instance.
pub struct SessionOptions<C = JsonCodec> {
    router: StoreRouter,
    codec: C,
    cookie_name: String,
    cookie: CookieOptions,
    expire: Duration,
    key_generator: KeyGenerator,
    namespace: Option<String>,
    tracer: Option<TracerFactory>,
}

impl SessionOptions<JsonCodec> {
    /// Options for a single store with every other setting at its default.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashsession_core::{MemoryHashStore, SessionOptions};
    /// use std::sync::Arc;
    ///
    /// let options = SessionOptions::new(Arc::new(MemoryHashStore::new("local")));
    /// assert_eq!(options.cookie_name(), "session");
    /// ```
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self::from_router(StoreRouter::Fixed(store), JsonCodec)
    }

    /// Options spreading sessions across a group of stores.
    pub fn with_group(targets: Vec<Arc<dyn HashStore>>) -> SessionResult<Self> {
        Ok(Self::from_router(
            StoreRouter::Group(StoreGroup::new(targets)?),
            JsonCodec,
        ))
    }

    /// Start building options.
    pub fn builder() -> SessionOptionsBuilder<JsonCodec> {
        SessionOptionsBuilder::new()
    }
}

impl<C> SessionOptions<C> {
    fn from_router(router: StoreRouter, codec: C) -> Self {
        Self {
            router,
            codec,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie: CookieOptions::default(),
            expire: DEFAULT_EXPIRE,
            key_generator: Arc::new(generate_session_id),
            namespace: None,
            tracer: None,
        }
    }

    pub fn router(&self) -> &StoreRouter {
        &self.router
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Attributes of the `Set-Cookie` header issued for new keys.
    pub fn cookie(&self) -> &CookieOptions {
        &self.cookie
    }

    /// TTL applied to the session hash on every request.
    pub fn expire(&self) -> Duration {
        self.expire
    }

    pub fn key_generator(&self) -> &KeyGenerator {
        &self.key_generator
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn tracer(&self) -> Option<&TracerFactory> {
        self.tracer.as_ref()
    }

    /// Name of the remote hash holding the session.
    pub fn storage_key(&self, key: &SessionKey) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, key),
            None => key.to_string(),
        }
    }
}

impl<C> fmt::Debug for SessionOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("router", &self.router)
            .field("cookie_name", &self.cookie_name)
            .field("cookie", &self.cookie)
            .field("expire", &self.expire)
            .field("namespace", &self.namespace)
            .field("tracer", &self.tracer.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`SessionOptions`].
pub struct SessionOptionsBuilder<C = JsonCodec> {
    router: Option<SessionResult<StoreRouter>>,
    codec: C,
    cookie_name: String,
    cookie: CookieOptions,
    expire: Duration,
    key_generator: Option<KeyGenerator>,
    namespace: Option<String>,
    tracer: Option<TracerFactory>,
}

impl SessionOptionsBuilder<JsonCodec> {
    pub fn new() -> Self {
        Self {
            router: None,
            codec: JsonCodec,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie: CookieOptions::default(),
            expire: DEFAULT_EXPIRE,
            key_generator: None,
            namespace: None,
            tracer: None,
        }
    }
}

impl Default for SessionOptionsBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ValueCodec> SessionOptionsBuilder<C> {
    /// Route every session to one store.
    pub fn store(mut self, store: Arc<dyn HashStore>) -> Self {
        self.router = Some(Ok(StoreRouter::Fixed(store)));
        self
    }

    /// Spread sessions across a group of stores. Validation errors surface
    /// from [`build`](Self::build).
    pub fn group(mut self, targets: Vec<Arc<dyn HashStore>>) -> Self {
        self.router = Some(StoreGroup::new(targets).map(StoreRouter::Group));
        self
    }

    /// Use an already validated group.
    pub fn store_group(mut self, group: StoreGroup) -> Self {
        self.router = Some(Ok(StoreRouter::Group(group)));
        self
    }

    /// Replace the value codec.
    pub fn codec<C2: ValueCodec>(self, codec: C2) -> SessionOptionsBuilder<C2> {
        SessionOptionsBuilder {
            router: self.router,
            codec,
            cookie_name: self.cookie_name,
            cookie: self.cookie,
            expire: self.expire,
            key_generator: self.key_generator,
            namespace: self.namespace,
            tracer: self.tracer,
        }
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn cookie(mut self, cookie: CookieOptions) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn expire(mut self, expire: Duration) -> Self {
        self.expire = expire;
        self
    }

    /// Generator for keys of new sessions.
    pub fn key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    /// Prefix remote hash names with `namespace:`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn tracer(mut self, factory: TracerFactory) -> Self {
        self.tracer = Some(factory);
        self
    }

    /// Apply deserialized settings over the current values.
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.cookie_name = settings.cookie_name;
        self.expire = Duration::from_secs(settings.expire_secs);
        self.cookie = settings.cookie;
        if settings.namespace.is_some() {
            self.namespace = settings.namespace;
        }
        self
    }

    /// Build the options.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] when no store was configured, the
    /// group is empty or names a store twice, the cookie name is empty, or
    /// the expiry is shorter than one second.
    pub fn build(self) -> SessionResult<SessionOptions<C>> {
        let router = self
            .router
            .ok_or_else(|| SessionError::Config("no session store configured".to_string()))??;

        if self.cookie_name.is_empty() {
            return Err(SessionError::Config("cookie name must not be empty".to_string()));
        }

        // Stores take whole seconds; `EXPIRE key 0` deletes the hash.
        if self.expire < MIN_EXPIRE {
            return Err(SessionError::Config(format!(
                "session expiry must be at least one second, got {:?}",
                self.expire
            )));
        }

        Ok(SessionOptions {
            router,
            codec: self.codec,
            cookie_name: self.cookie_name,
            cookie: self.cookie,
            expire: self.expire,
            key_generator: self
                .key_generator
                .unwrap_or_else(|| Arc::new(generate_session_id)),
            namespace: self.namespace.filter(|ns| !ns.is_empty()),
            tracer: self.tracer,
        })
    }
}

/// Serializable session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub expire_secs: u64,
    pub cookie: CookieOptions,
    pub namespace: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            expire_secs: DEFAULT_EXPIRE.as_secs(),
            cookie: CookieOptions::default(),
            namespace: None,
        }
    }
}

impl SessionSettings {
    /// Read settings from the environment, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SESSION_COOKIE_NAME`
    /// - `SESSION_EXPIRE_SECS`
    /// - `SESSION_COOKIE_PATH`
    /// - `SESSION_COOKIE_DOMAIN`
    /// - `SESSION_COOKIE_SECURE`
    /// - `SESSION_COOKIE_HTTP_ONLY`
    /// - `SESSION_NAMESPACE`
    pub fn from_env() -> SessionResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SessionResult<Self> {
        let mut settings = Self::default();

        if let Some(name) = lookup("SESSION_COOKIE_NAME") {
            settings.cookie_name = name;
        }
        if let Some(secs) = lookup("SESSION_EXPIRE_SECS") {
            settings.expire_secs = secs.parse().map_err(|_| {
                SessionError::Config(format!("SESSION_EXPIRE_SECS is not a number: {secs}"))
            })?;
        }
        settings.cookie.path = lookup("SESSION_COOKIE_PATH").filter(|p| !p.is_empty());
        settings.cookie.domain = lookup("SESSION_COOKIE_DOMAIN").filter(|d| !d.is_empty());
        if let Some(flag) = lookup("SESSION_COOKIE_SECURE") {
            settings.cookie.secure = parse_flag("SESSION_COOKIE_SECURE", &flag)?;
        }
        if let Some(flag) = lookup("SESSION_COOKIE_HTTP_ONLY") {
            settings.cookie.http_only = parse_flag("SESSION_COOKIE_HTTP_ONLY", &flag)?;
        }
        settings.namespace = lookup("SESSION_NAMESPACE").filter(|ns| !ns.is_empty());

        Ok(settings)
    }
}

fn parse_flag(name: &str, value: &str) -> SessionResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SessionError::Config(format!("{name} is not a boolean: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHashStore;
    use std::collections::HashMap;

    fn store(name: &str) -> Arc<dyn HashStore> {
        Arc::new(MemoryHashStore::new(name))
    }

    #[test]
    fn test_defaults() {
        let options = SessionOptions::new(store("mem"));

        assert_eq!(options.cookie_name(), "session");
        assert_eq!(options.expire(), Duration::from_secs(2_592_000));
        assert_eq!(options.cookie(), &CookieOptions::default());
        assert!(options.namespace().is_none());
        assert!(options.tracer().is_none());
        assert_eq!((options.key_generator())().len(), 36);
    }

    #[test]
    fn test_builder_requires_store() {
        let result = SessionOptions::builder().build();
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_sub_second_expiry() {
        for expire in [Duration::ZERO, Duration::from_millis(999)] {
            let result = SessionOptions::builder()
                .store(store("mem"))
                .expire(expire)
                .build();
            assert!(matches!(result, Err(SessionError::Config(_))));
        }

        let options = SessionOptions::builder()
            .store(store("mem"))
            .expire(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(options.expire(), Duration::from_secs(1));

        let settings = SessionSettings {
            expire_secs: 0,
            ..SessionSettings::default()
        };
        let result = SessionOptions::builder()
            .store(store("mem"))
            .settings(settings)
            .build();
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_builder_reports_invalid_group() {
        let result = SessionOptions::builder()
            .group(vec![store("a"), store("a")])
            .build();
        assert!(matches!(result, Err(SessionError::Config(_))));

        let result = SessionOptions::with_group(Vec::new());
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_storage_key_with_namespace() {
        let options = SessionOptions::builder()
            .store(store("mem"))
            .namespace("app")
            .build()
            .unwrap();
        assert_eq!(options.storage_key(&"abc".into()), "app:abc");

        let bare = SessionOptions::new(store("mem"));
        assert_eq!(bare.storage_key(&"abc".into()), "abc");
    }

    #[test]
    fn test_settings_applied_to_builder() {
        let settings = SessionSettings {
            cookie_name: "sid".to_string(),
            expire_secs: 60,
            cookie: CookieOptions::new().with_secure(true),
            namespace: Some("web".to_string()),
        };

        let options = SessionOptions::builder()
            .store(store("mem"))
            .settings(settings)
            .build()
            .unwrap();

        assert_eq!(options.cookie_name(), "sid");
        assert_eq!(options.expire(), Duration::from_secs(60));
        assert!(options.cookie().secure);
        assert_eq!(options.namespace(), Some("web"));
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("SESSION_COOKIE_NAME", "sid"),
            ("SESSION_EXPIRE_SECS", "120"),
            ("SESSION_COOKIE_PATH", "/"),
            ("SESSION_COOKIE_HTTP_ONLY", "true"),
            ("SESSION_NAMESPACE", "app"),
        ]
        .into_iter()
        .collect();

        let settings =
            SessionSettings::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(settings.cookie_name, "sid");
        assert_eq!(settings.expire_secs, 120);
        assert_eq!(settings.cookie.path.as_deref(), Some("/"));
        assert!(settings.cookie.domain.is_none());
        assert!(settings.cookie.http_only);
        assert!(!settings.cookie.secure);
        assert_eq!(settings.namespace.as_deref(), Some("app"));
    }

    #[test]
    fn test_settings_reject_bad_values() {
        let result = SessionSettings::from_lookup(|name| {
            (name == "SESSION_EXPIRE_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(SessionError::Config(_))));

        let result = SessionSettings::from_lookup(|name| {
            (name == "SESSION_COOKIE_SECURE").then(|| "maybe".to_string())
        });
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: SessionSettings =
            serde_json::from_str(r#"{"cookie_name":"sid","cookie":{"secure":true}}"#).unwrap();
        assert_eq!(settings.cookie_name, "sid");
        assert_eq!(settings.expire_secs, DEFAULT_EXPIRE.as_secs());
        assert!(settings.cookie.secure);
    }
}

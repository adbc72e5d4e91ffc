//! Shared handle to the request's session.

use crate::codec::{JsonCodec, ValueCodec};
use crate::config::SessionOptions;
use crate::error::{SessionError, SessionResult};
use crate::key::SessionKey;
use crate::session::Session;
use futures::FutureExt;
use http::HeaderMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;
use tracing::error;

/// Cloneable access to the session of the current request.
///
/// Published in the request extensions by [`SessionLayer`](crate::SessionLayer)
/// and passed to handlers by [`with_session`]. Every method is synchronous.
pub struct SessionHandle<C = JsonCodec>(Arc<Mutex<Session<C>>>);

impl<C> Clone for SessionHandle<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C: ValueCodec> SessionHandle<C> {
    pub fn new(session: Session<C>) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub fn key(&self) -> SessionKey {
        self.0.lock().key().clone()
    }

    pub fn try_get<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        self.0.lock().try_get(field)
    }

    pub fn get<T: DeserializeOwned + Default>(&self, field: &str) -> T {
        self.0.lock().get(field)
    }

    pub fn set<T: Serialize + ?Sized>(
        &self,
        field: impl Into<String>,
        value: &T,
    ) -> SessionResult<()> {
        self.0.lock().set(field, value)
    }

    pub fn remove(&self, field: &str) -> bool {
        self.0.lock().remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.lock().contains(field)
    }

    pub fn pending_len(&self) -> usize {
        self.0.lock().pending_len()
    }

    /// Commit pending mutations. The lock is released while the transaction
    /// is in flight.
    pub(crate) async fn flush(&self) -> SessionResult<()> {
        let plan = self.0.lock().prepare_flush();
        let Some(plan) = plan else {
            return Ok(());
        };

        let committed = plan.execute().await?;
        self.0.lock().complete_flush(committed);
        Ok(())
    }
}

impl<C> std::fmt::Debug for SessionHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionHandle").field(&*self.0.lock()).finish()
    }
}

/// Run `handler` with a session and flush it afterwards.
///
/// The flush runs whether the handler succeeds, fails or panics; a panic is
/// resumed once the flush completes. A handler error takes precedence over a
/// flush error, which is then only logged.
///
/// # Examples
///
/// ```
/// use hashsession_core::{MemoryHashStore, SessionError, SessionOptions, with_session};
/// use http::HeaderMap;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let options = Arc::new(SessionOptions::new(Arc::new(MemoryHashStore::new("local"))));
/// let mut response_headers = HeaderMap::new();
///
/// let visits = with_session(&HeaderMap::new(), &mut response_headers, options, |session| async move {
///     let visits = session.get::<u32>("visits") + 1;
///     session.set("visits", &visits)?;
///     Ok::<_, SessionError>(visits)
/// })
/// .await
/// .unwrap();
///
/// assert_eq!(visits, 1);
/// assert!(response_headers.contains_key(http::header::SET_COOKIE));
/// # });
/// ```
pub async fn with_session<C, F, Fut, T, E>(
    request_headers: &HeaderMap,
    response_headers: &mut HeaderMap,
    options: Arc<SessionOptions<C>>,
    handler: F,
) -> Result<T, E>
where
    C: ValueCodec,
    F: FnOnce(SessionHandle<C>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<SessionError>,
{
    let session = Session::start(request_headers, response_headers, options).await?;
    let handle = SessionHandle::new(session);

    let for_handler = handle.clone();
    let outcome = AssertUnwindSafe(async move { handler(for_handler).await })
        .catch_unwind()
        .await;
    let flushed = handle.flush().await;

    match outcome {
        Err(panic) => {
            log_flush_failure(&handle, flushed);
            resume_unwind(panic)
        }
        Ok(Err(err)) => {
            log_flush_failure(&handle, flushed);
            Err(err)
        }
        Ok(Ok(value)) => {
            if let Err(err) = flushed {
                error!(key = %handle.key(), error = %err, "Session flush failed");
                return Err(err.into());
            }
            Ok(value)
        }
    }
}

pub(crate) fn log_flush_failure<C: ValueCodec>(handle: &SessionHandle<C>, flushed: SessionResult<()>) {
    if let Err(err) = flushed {
        error!(key = %handle.key(), error = %err, "Session flush failed after handler error");
    }
}

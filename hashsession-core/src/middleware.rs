//! Tower middleware attaching a session to every request.
//!
//! ```
//! use hashsession_core::{MemoryHashStore, SessionLayer, SessionOptions};
//! use std::sync::Arc;
//!
//! let options = SessionOptions::new(Arc::new(MemoryHashStore::new("local")));
//! let layer = SessionLayer::new(options);
//! # let _ = layer;
//! ```

use crate::codec::{JsonCodec, ValueCodec};
use crate::config::SessionOptions;
use crate::handle::{SessionHandle, log_flush_failure};
use crate::session::Session;
use futures::FutureExt;
use http::header::SET_COOKIE;
use http::{HeaderMap, Request, Response};
use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::error;

/// Boxed error returned by [`SessionService`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Layer producing [`SessionService`].
pub struct SessionLayer<C = JsonCodec> {
    options: Arc<SessionOptions<C>>,
}

impl<C> SessionLayer<C> {
    pub fn new(options: SessionOptions<C>) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// Share options with other layers or with [`with_session`](crate::with_session).
    pub fn from_shared(options: Arc<SessionOptions<C>>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Arc<SessionOptions<C>> {
        &self.options
    }
}

impl<C> Clone for SessionLayer<C> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
        }
    }
}

impl<S, C> Layer<S> for SessionLayer<C> {
    type Service = SessionService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            options: Arc::clone(&self.options),
        }
    }
}

/// Service loading the session before the inner service runs and flushing
/// it once the inner service completes.
///
/// A session that cannot be loaded fails the request before `inner` is
/// called. The `Set-Cookie` value of a newly issued key is appended to the
/// inner service's response.
pub struct SessionService<S, C = JsonCodec> {
    inner: S,
    options: Arc<SessionOptions<C>>,
}

impl<S: Clone, C> Clone for SessionService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            options: Arc::clone(&self.options),
        }
    }
}

impl<S, C, ReqBody, ResBody> Service<Request<ReqBody>> for SessionService<S, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    C: ValueCodec,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let options = Arc::clone(&self.options);

        Box::pin(async move {
            let mut issued = HeaderMap::new();
            let session = Session::start(req.headers(), &mut issued, options).await?;
            let handle = SessionHandle::new(session);
            req.extensions_mut().insert(handle.clone());

            // Convert before the flush await; `S::Error` need not be `Send`.
            let outcome = AssertUnwindSafe(async move {
                inner.call(req).await.map_err(Into::<BoxError>::into)
            })
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
                Ok(Ok(mut response)) => {
                    if let Err(err) = flushed {
                        error!(key = %handle.key(), error = %err, "Session flush failed");
                        return Err(err.into());
                    }
                    let headers = response.headers_mut();
                    for value in issued.get_all(SET_COOKIE) {
                        headers.append(SET_COOKIE, value.clone());
                    }
                    Ok(response)
                }
            }
        })
    }
}

/// Access to the session published by [`SessionLayer`].
pub trait RequestSessionExt {
    /// Session of a layer using the default codec.
    fn session(&self) -> Option<&SessionHandle>;

    /// Session of a layer using codec `C`.
    fn session_with<C: ValueCodec>(&self) -> Option<&SessionHandle<C>>;
}

impl<B> RequestSessionExt for Request<B> {
    fn session(&self) -> Option<&SessionHandle> {
        self.extensions().get::<SessionHandle>()
    }

    fn session_with<C: ValueCodec>(&self) -> Option<&SessionHandle<C>> {
        self.extensions().get::<SessionHandle<C>>()
    }
}

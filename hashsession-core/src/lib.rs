//! Per-request sessions backed by a remote hash store.
//!
//! Each request gets a [`Session`] that mirrors one remote hash. The hash is
//! read in full when the request starts and its TTL is renewed in the same
//! round trip. Handler code reads and writes the local copy; the accumulated
//! changes are committed as a single atomic transaction once the request
//! completes, including when the handler fails.
//!
//! ## Features
//!
//! - `redis` (default): [`HashStore`] implementation for
//!   `hashsession_redis::RedisService`
//!
//! ## Quick Start
//!
//! ```no_run
//! use hashsession_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryHashStore::new("local"));
//! let options = SessionOptions::builder()
//!     .store(store)
//!     .cookie(CookieOptions::new().with_path("/").with_http_only(true))
//!     .build()?;
//!
//! let layer = SessionLayer::new(options);
//! # let _ = layer;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod cookie;
pub mod error;
pub mod handle;
pub mod key;
pub mod memory;
pub mod middleware;
pub mod mutation;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod ring;
pub mod router;
pub mod session;
pub mod store;
pub mod tracer;

pub use codec::{JsonCodec, ValueCodec};
pub use config::{
    DEFAULT_COOKIE_NAME, DEFAULT_EXPIRE, MIN_EXPIRE, SessionOptions, SessionOptionsBuilder, SessionSettings,
};
pub use cookie::{CookieOptions, encode_set_cookie};
pub use error::{SessionError, SessionResult};
pub use handle::{SessionHandle, with_session};
pub use key::{KeyGenerator, SessionKey, generate_session_id, resolve_session_key};
pub use memory::{MemoryHashStore, MemoryStoreStats};
pub use middleware::{BoxError, RequestSessionExt, SessionLayer, SessionService};
pub use mutation::{MutationLog, PendingOperation};
#[cfg(feature = "redis")]
pub use redis_store::redis_group;
pub use ring::HashRing;
pub use router::{StoreGroup, StoreRouter};
pub use session::{CommittedFlush, FlushPlan, Session};
pub use store::{HashCommand, HashStore, HashTransaction};
pub use tracer::{CommandTracer, TracerFactory, TracingTracer};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::codec::{JsonCodec, ValueCodec};
    pub use crate::config::{SessionOptions, SessionSettings};
    pub use crate::cookie::CookieOptions;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::handle::{SessionHandle, with_session};
    pub use crate::key::SessionKey;
    pub use crate::memory::MemoryHashStore;
    pub use crate::middleware::{RequestSessionExt, SessionLayer};
    pub use crate::router::StoreGroup;
    pub use crate::store::HashStore;
    pub use crate::tracer::{CommandTracer, TracingTracer};
}

//! # hashsession Redis
//!
//! Redis client integration used by the hashsession store.
//!
//! ## Features
//!
//! - **Connection Pooling**: Efficient connection management with bb8
//! - **Hash Commands**: `HGETALL` with raw byte values and `EXPIRE`
//! - **Atomic Pipelines**: `MULTI`/`EXEC` execution of queued commands
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hashsession_redis::{RedisConfig, RedisService};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .url("redis://localhost:6379")
//!         .pool_size(10)
//!         .build();
//!
//!     let redis = RedisService::new(config).await?;
//!
//!     let fields = redis.hgetall_bytes("session-key").await?;
//!     redis.expire("session-key", Duration::from_secs(3600)).await?;
//!
//!     let mut pipe = hashsession_redis::redis::pipe();
//!     pipe.hset_multiple("session-key", &[("counter", b"1".to_vec())]).ignore();
//!     redis.exec_atomic(pipe).await?;
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pool;
mod service;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use error::{RedisError, Result};
pub use pool::{RedisConnection, RedisPool, RedisPoolBuilder};
pub use service::{PoolStats, RedisService};

// Re-export redis crate for convenience
pub use redis;

/// Prelude for common imports.
///
/// ```
/// use hashsession_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisConfigBuilder};
    pub use crate::error::{RedisError, Result};
    pub use crate::pool::{RedisConnection, RedisPool};
    pub use crate::service::RedisService;
}

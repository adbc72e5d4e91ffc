// hashsession - Redis hash backed request sessions
//
// A session mirrors one remote hash for the duration of a request: read once
// at the start, buffered in memory, and committed in a single MULTI/EXEC at
// the end.

// Re-export core functionality
pub use hashsession_core::*;

// Re-export the Redis integration
#[cfg(feature = "redis")]
pub use hashsession_redis;

#[cfg(feature = "redis")]
pub use hashsession_redis::{RedisConfig, RedisError, RedisService};

/// Prelude for common imports.
pub mod prelude {
    pub use hashsession_core::prelude::*;

    #[cfg(feature = "redis")]
    pub use hashsession_core::redis_group;
    #[cfg(feature = "redis")]
    pub use hashsession_redis::{RedisConfig, RedisService};
}

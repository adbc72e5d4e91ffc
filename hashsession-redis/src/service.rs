//! Redis service for session storage.

use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

use crate::{
    RedisConfig, Result,
    pool::{RedisConnection, RedisPool, RedisPoolBuilder, ping},
};

/// Redis service providing a connection pool and the hash commands a
/// session store needs.
///
/// Every call checks a connection out of the pool, so two calls issued
/// concurrently run on two connections.
pub struct RedisService {
    config: RedisConfig,
    pool: RedisPool,
}

impl RedisService {
    /// Create a new Redis service.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let pool = RedisPoolBuilder::new(config.clone()).build().await?;
        Ok(Self { config, pool })
    }

    /// Create from an existing pool.
    pub fn from_pool(config: RedisConfig, pool: RedisPool) -> Self {
        Self { config, pool }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    /// Get a connection from the pool.
    pub async fn get(&self) -> Result<RedisConnection<'_>> {
        let conn = self.pool.get().await?;
        Ok(RedisConnection::new(conn))
    }

    /// PING the server over a pooled connection.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get().await?;
        ping(&mut conn).await
    }

    /// Get pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// HGETALL with raw byte values.
    ///
    /// A missing key yields an empty map.
    pub async fn hgetall_bytes(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let mut conn = self.get().await?;
        let fields: HashMap<String, Vec<u8>> = conn.hgetall(key).await?;
        trace!(key, fields = fields.len(), "HGETALL");
        Ok(fields)
    }

    /// Set expiration on a key. Returns `false` when the key does not exist.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.get().await?;
        let result: bool = conn.expire(key, ttl.as_secs() as i64).await?;
        Ok(result)
    }

    /// Get TTL of a key.
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.get().await?;
        let ttl: i64 = conn.ttl(key).await?;
        if ttl < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl as u64)))
        }
    }

    /// Delete a key.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get().await?;
        let deleted: u32 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    /// Run a pipeline as one MULTI/EXEC block.
    ///
    /// Replies of the queued commands are discarded; either every command
    /// is applied or the call fails.
    pub async fn exec_atomic(&self, mut pipe: redis::Pipeline) -> Result<()> {
        pipe.atomic();
        let mut conn = self.get().await?;
        let _: () = pipe.query_async(&mut *conn).await?;
        Ok(())
    }
}

/// Connection pool statistics.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Total connections.
    pub connections: u32,
    /// Idle connections.
    pub idle_connections: u32,
}

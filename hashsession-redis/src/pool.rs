//! Redis connection pool.

use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::aio::MultiplexedConnection;
use std::ops::{Deref, DerefMut};
use tracing::info;

use crate::{RedisConfig, RedisError, Result};

/// Type alias for the connection pool.
pub type RedisPool = Pool<RedisConnectionManager>;

/// A pooled Redis connection.
pub struct RedisConnection<'a> {
    conn: PooledConnection<'a, RedisConnectionManager>,
}

impl<'a> RedisConnection<'a> {
    /// Create a new connection wrapper.
    pub fn new(conn: PooledConnection<'a, RedisConnectionManager>) -> Self {
        Self { conn }
    }
}

impl<'a> Deref for RedisConnection<'a> {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for RedisConnection<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

/// Builder for creating Redis connection pools.
pub struct RedisPoolBuilder {
    config: RedisConfig,
}

impl RedisPoolBuilder {
    /// Create a new pool builder.
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    /// Build the connection pool and verify it with a PING.
    pub async fn build(self) -> Result<RedisPool> {
        self.config.validate()?;

        let manager = RedisConnectionManager::new(self.config.connection_url())
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(self.config.pool_size)
            .min_idle(self.config.min_idle)
            .connection_timeout(self.config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| RedisError::Pool(e.to_string()))?;

        // Scoped so the probe connection goes back to the pool before returning it.
        {
            let mut conn = RedisConnection::new(pool.get().await?);
            ping(&mut conn).await?;
        }

        info!(
            pool_size = self.config.pool_size,
            target = %self.config.target_name(),
            "Redis session pool created"
        );

        Ok(pool)
    }
}

/// Send `PING`, mapping any failure to a connection error.
pub(crate) async fn ping(conn: &mut MultiplexedConnection) -> Result<()> {
    let reply: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| RedisError::Connection(e.to_string()))?;

    if reply != "PONG" {
        return Err(RedisError::Connection(format!("unexpected PING reply: {reply}")));
    }
    Ok(())
}

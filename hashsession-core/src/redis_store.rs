//! Redis backend for sessions.

use crate::error::SessionResult;
use crate::router::StoreGroup;
use crate::store::{HashCommand, HashStore, HashTransaction};
use async_trait::async_trait;
use hashsession_redis::redis;
use hashsession_redis::{RedisConfig, RedisService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
impl HashStore for RedisService {
    fn name(&self) -> String {
        self.config().target_name()
    }

    async fn hash_get_all(&self, key: &str) -> SessionResult<HashMap<String, Vec<u8>>> {
        Ok(self.hgetall_bytes(key).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> SessionResult<bool> {
        Ok(RedisService::expire(self, key, ttl).await?)
    }

    async fn execute(&self, transaction: HashTransaction) -> SessionResult<()> {
        if transaction.is_empty() {
            return Ok(());
        }
        self.exec_atomic(to_pipeline(transaction)).await?;
        Ok(())
    }
}

/// Translate a transaction into a pipeline of ignored replies.
fn to_pipeline(transaction: HashTransaction) -> redis::Pipeline {
    let mut pipe = redis::pipe();

    for command in transaction.into_commands() {
        match command {
            HashCommand::HashSet { key, entries } => {
                // Variadic HSET; `hset_multiple` would emit the deprecated HMSET.
                let mut cmd = redis::cmd("HSET");
                cmd.arg(key);
                for (field, value) in entries {
                    cmd.arg(field).arg(value);
                }
                pipe.add_command(cmd).ignore();
            }
            HashCommand::HashDelete { key, fields } => {
                pipe.hdel(key, fields).ignore();
            }
        }
    }

    pipe
}

/// Connect to every configured Redis and group them for routing.
///
/// Targets are named after [`RedisConfig::target_name`], so two configs
/// pointing at the same server and database are rejected unless they carry
/// distinct connection names.
pub async fn redis_group(configs: Vec<RedisConfig>) -> SessionResult<StoreGroup> {
    let mut targets: Vec<Arc<dyn HashStore>> = Vec::with_capacity(configs.len());
    for config in configs {
        targets.push(Arc::new(RedisService::new(config).await?));
    }
    StoreGroup::new(targets)
}

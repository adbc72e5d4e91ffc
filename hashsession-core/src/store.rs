//! Backing store interface.

use crate::error::SessionResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// One command queued in a [`HashTransaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashCommand {
    /// `HSET key field value [field value ...]`
    HashSet {
        key: String,
        entries: Vec<(String, Vec<u8>)>,
    },
    /// `HDEL key field [field ...]`
    HashDelete { key: String, fields: Vec<String> },
}

/// Commands that a store must apply as a single atomic unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashTransaction {
    commands: Vec<HashCommand>,
}

impl HashTransaction {
    /// Create an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a multi-field write.
    pub fn hash_set(&mut self, key: impl Into<String>, entries: Vec<(String, Vec<u8>)>) -> &mut Self {
        self.commands.push(HashCommand::HashSet {
            key: key.into(),
            entries,
        });
        self
    }

    /// Queue a multi-field delete.
    pub fn hash_delete(&mut self, key: impl Into<String>, fields: Vec<String>) -> &mut Self {
        self.commands.push(HashCommand::HashDelete {
            key: key.into(),
            fields,
        });
        self
    }

    pub fn commands(&self) -> &[HashCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<HashCommand> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A remote key-value store holding one hash per session.
///
/// Implementations own their connection management; callers never retry.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Name of this target, used for routing and in traces.
    fn name(&self) -> String;

    /// Read every field of a hash. A missing key yields an empty map.
    async fn hash_get_all(&self, key: &str) -> SessionResult<HashMap<String, Vec<u8>>>;

    /// Set the TTL of a key. Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> SessionResult<bool>;

    /// Apply every command of the transaction atomically.
    async fn execute(&self, transaction: HashTransaction) -> SessionResult<()>;
}

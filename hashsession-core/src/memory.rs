//! In-process hash store.

use crate::error::SessionResult;
use crate::store::{HashCommand, HashStore, HashTransaction};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Entry {
    fields: HashMap<String, Vec<u8>>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Hash store kept in process memory.
///
/// Follows Redis semantics where sessions depend on them: a hash with no
/// fields does not exist, `HSET` on a new key leaves it without a TTL, and
/// expired keys read as missing. Transactions are applied under one lock.
#[derive(Debug)]
pub struct MemoryHashStore {
    name: String,
    entries: Mutex<HashMap<String, Entry>>,
    stats: MemoryStoreStats,
}

/// Call counters of a [`MemoryHashStore`].
#[derive(Debug, Default)]
pub struct MemoryStoreStats {
    hash_get_all: AtomicU64,
    expire: AtomicU64,
    transactions: AtomicU64,
}

impl MemoryStoreStats {
    pub fn hash_get_all_calls(&self) -> u64 {
        self.hash_get_all.load(Ordering::Relaxed)
    }

    pub fn expire_calls(&self) -> u64 {
        self.expire.load(Ordering::Relaxed)
    }

    pub fn transactions(&self) -> u64 {
        self.transactions.load(Ordering::Relaxed)
    }

    /// Total number of remote calls served.
    pub fn total_calls(&self) -> u64 {
        self.hash_get_all_calls() + self.expire_calls() + self.transactions()
    }
}

impl MemoryHashStore {
    /// Create an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
            stats: MemoryStoreStats::default(),
        }
    }

    pub fn stats(&self) -> &MemoryStoreStats {
        &self.stats
    }

    /// Current value of one field, outside of any session.
    pub fn field(&self, key: &str, field: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.fields.get(field).cloned())
    }

    /// Insert a field directly, bypassing sessions.
    pub fn insert_field(&self, key: &str, field: impl Into<String>, bytes: Vec<u8>) {
        let mut entries = self.entries.lock();
        entries
            .entry(key.to_string())
            .or_default()
            .fields
            .insert(field.into(), bytes);
    }

    /// Remaining TTL of a key, `None` if it is missing or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl HashStore for MemoryHashStore {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn hash_get_all(&self, key: &str) -> SessionResult<HashMap<String, Vec<u8>>> {
        self.stats.hash_get_all.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, key, now);

        Ok(entries
            .get(key)
            .map(|entry| entry.fields.clone())
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> SessionResult<bool> {
        self.stats.expire.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, key, now);

        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn execute(&self, transaction: HashTransaction) -> SessionResult<()> {
        self.stats.transactions.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let mut entries = self.entries.lock();

        for command in transaction.into_commands() {
            match command {
                HashCommand::HashSet { key, entries: fields } => {
                    Self::purge_expired(&mut entries, &key, now);
                    entries.entry(key).or_default().fields.extend(fields);
                }
                HashCommand::HashDelete { key, fields } => {
                    Self::purge_expired(&mut entries, &key, now);
                    if let Some(entry) = entries.get_mut(&key) {
                        for field in &fields {
                            entry.fields.remove(field);
                        }
                        if entry.fields.is_empty() {
                            entries.remove(&key);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_reads_empty() {
        let store = MemoryHashStore::new("mem");
        assert!(store.hash_get_all("nope").await.unwrap().is_empty());
        assert!(!store.expire("nope", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_applies_set_and_delete() {
        let store = MemoryHashStore::new("mem");
        store.insert_field("k", "old", b"x".to_vec());

        let mut tx = HashTransaction::new();
        tx.hash_set("k", vec![("a".into(), b"1".to_vec())])
            .hash_delete("k", vec!["old".into()]);
        store.execute(tx).await.unwrap();

        let fields = store.hash_get_all("k").await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("a"), Some(&b"1".to_vec()));
        assert_eq!(store.stats().transactions(), 1);
    }

    #[tokio::test]
    async fn test_deleting_last_field_removes_key() {
        let store = MemoryHashStore::new("mem");
        store.insert_field("k", "only", b"x".to_vec());

        let mut tx = HashTransaction::new();
        tx.hash_delete("k", vec!["only".into()]);
        store.execute(tx).await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_keys_disappear() {
        let store = MemoryHashStore::new("mem");
        store.insert_field("k", "a", b"1".to_vec());
        assert!(store.expire("k", Duration::from_secs(30)).await.unwrap());
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(30)));

        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(store.hash_get_all("k").await.unwrap().is_empty());
        assert!(store.field("k", "a").is_none());
        assert_eq!(store.len(), 0);
    }
}

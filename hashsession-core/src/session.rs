//! Per-request session with a write-back cache.
//!
//! A [`Session`] loads the whole remote hash once when the request starts.
//! Reads and writes then hit the local cache only; writes are also recorded
//! in a [`MutationLog`] that is committed as one atomic transaction when the
//! request completes.

use crate::codec::{JsonCodec, ValueCodec};
use crate::config::SessionOptions;
use crate::error::SessionResult;
use crate::key::{SessionKey, resolve_session_key};
use crate::mutation::MutationLog;
use crate::store::{HashStore, HashTransaction};
use crate::tracer::{FLUSH_COMMAND, START_COMMAND, TracerFactory, traced};
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Session state for one in-flight request.
pub struct Session<C = JsonCodec> {
    key: SessionKey,
    storage_key: String,
    options: Arc<SessionOptions<C>>,
    cache: HashMap<String, Vec<u8>>,
    pending: MutationLog,
}

impl<C: ValueCodec> Session<C> {
    /// Resolve the session key from the request cookies and load the session.
    ///
    /// A newly minted key appends one `Set-Cookie` value to
    /// `response_headers`.
    pub async fn start(
        request_headers: &HeaderMap,
        response_headers: &mut HeaderMap,
        options: Arc<SessionOptions<C>>,
    ) -> SessionResult<Self> {
        let key = resolve_session_key(request_headers, response_headers, &options)?;
        Self::load(key, options).await
    }

    /// Load the session stored under `key`, renewing its TTL.
    ///
    /// The bulk read and the TTL renewal are sent concurrently; if either
    /// fails no session is returned.
    pub async fn load(key: SessionKey, options: Arc<SessionOptions<C>>) -> SessionResult<Self> {
        let storage_key = options.storage_key(&key);
        let target = options.router().target(&key).clone();
        let ttl = options.expire();

        let (cache, renewed) = traced(
            options.tracer(),
            &target.name(),
            START_COMMAND,
            &storage_key,
            async {
                futures::try_join!(
                    target.hash_get_all(&storage_key),
                    target.expire(&storage_key, ttl)
                )
            },
        )
        .await?;

        debug!(
            key = %storage_key,
            fields = cache.len(),
            renewed,
            "Session loaded"
        );

        Ok(Self {
            key,
            storage_key,
            options,
            cache,
            pending: MutationLog::new(),
        })
    }

    /// Read and decode a field.
    ///
    /// Returns `None` when the field is absent. A payload that fails to
    /// decode is treated as absent: it is dropped from the cache and a
    /// removal is queued so the next flush deletes it remotely.
    pub fn try_get<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        let bytes = self.cache.get(field)?;

        match self.options.codec().decode(bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key = %self.storage_key, field, error = %err, "Dropping undecodable session field");
                self.cache.remove(field);
                self.pending.remove(field);
                None
            }
        }
    }

    /// Read a field, falling back to `T::default()`.
    pub fn get<T: DeserializeOwned + Default>(&mut self, field: &str) -> T {
        self.try_get(field).unwrap_or_default()
    }

    /// Encode and store a field. Nothing changes if encoding fails.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        field: impl Into<String>,
        value: &T,
    ) -> SessionResult<()> {
        let bytes = self.options.codec().encode(value)?;
        let field = field.into();
        self.cache.insert(field.clone(), bytes.clone());
        self.pending.set(field, bytes);
        Ok(())
    }

    /// Remove a field. Returns `false` if it was not present.
    pub fn remove(&mut self, field: &str) -> bool {
        if self.cache.remove(field).is_none() {
            return false;
        }
        self.pending.remove(field);
        true
    }

    /// Commit pending mutations to the store.
    ///
    /// Does nothing when there is nothing to commit. On failure the pending
    /// log is kept as is.
    pub async fn flush_all(&mut self) -> SessionResult<()> {
        if let Some(plan) = self.prepare_flush() {
            let committed = plan.execute().await?;
            self.complete_flush(committed);
        }
        Ok(())
    }
}

impl<C> Session<C> {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Name of the remote hash.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn contains(&self, field: &str) -> bool {
        self.cache.contains_key(field)
    }

    /// Names of the cached fields, in no particular order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.cache.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn pending(&self) -> &MutationLog {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Snapshot the pending log into a transaction.
    ///
    /// Returns `None` when the log is empty or the key is empty. The session
    /// stays usable while the plan executes; only operations still matching
    /// the snapshot are cleared by [`complete_flush`](Self::complete_flush).
    pub fn prepare_flush(&self) -> Option<FlushPlan> {
        if self.pending.is_empty() || self.key.is_empty() {
            return None;
        }

        let (sets, removes) = self.pending.partition();

        let mut transaction = HashTransaction::new();
        if !sets.is_empty() {
            transaction.hash_set(self.storage_key.clone(), sets);
        }
        if !removes.is_empty() {
            transaction.hash_delete(self.storage_key.clone(), removes);
        }

        Some(FlushPlan {
            target: self.options.router().target(&self.key).clone(),
            storage_key: self.storage_key.clone(),
            tracer: self.options.tracer().cloned(),
            transaction,
            committed: CommittedFlush {
                log: self.pending.clone(),
            },
        })
    }

    /// Record a successful commit.
    pub fn complete_flush(&mut self, committed: CommittedFlush) {
        self.pending.acknowledge(&committed.log);
    }
}

/// A transaction ready to be sent, detached from its session.
pub struct FlushPlan {
    target: Arc<dyn HashStore>,
    storage_key: String,
    tracer: Option<TracerFactory>,
    transaction: HashTransaction,
    committed: CommittedFlush,
}

impl FlushPlan {
    pub fn transaction(&self) -> &HashTransaction {
        &self.transaction
    }

    /// Send the transaction to the session's store.
    pub async fn execute(self) -> SessionResult<CommittedFlush> {
        let target = self.target;
        let commands = self.transaction.len();

        traced(
            self.tracer.as_ref(),
            &target.name(),
            FLUSH_COMMAND,
            &self.storage_key,
            target.execute(self.transaction),
        )
        .await?;

        debug!(key = %self.storage_key, commands, "Session flushed");

        Ok(self.committed)
    }
}

/// Proof of a committed [`FlushPlan`], consumed by
/// [`Session::complete_flush`].
#[derive(Debug)]
pub struct CommittedFlush {
    log: MutationLog,
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("storage_key", &self.storage_key)
            .field("fields", &self.cache.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use hashsession_core::{
    CommandTracer, HashStore, HashTransaction, MemoryHashStore, SessionError, SessionResult,
    TracerFactory,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Store recording every transaction on top of a [`MemoryHashStore`].
pub struct RecordingStore {
    inner: MemoryHashStore,
    transactions: Mutex<Vec<HashTransaction>>,
    fail_reads: AtomicBool,
    fail_expire: AtomicBool,
    fail_execute: AtomicBool,
}

impl RecordingStore {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryHashStore::new(name),
            transactions: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_expire: AtomicBool::new(false),
            fail_execute: AtomicBool::new(false),
        })
    }

    pub fn memory(&self) -> &MemoryHashStore {
        &self.inner
    }

    pub fn transactions(&self) -> Vec<HashTransaction> {
        self.transactions.lock().clone()
    }

    pub fn remote_calls(&self) -> u64 {
        self.inner.stats().total_calls()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_expire(&self, fail: bool) {
        self.fail_expire.store(fail, Ordering::SeqCst);
    }

    pub fn fail_execute(&self, fail: bool) {
        self.fail_execute.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl HashStore for RecordingStore {
    fn name(&self) -> String {
        self.inner.name()
    }

    async fn hash_get_all(&self, key: &str) -> SessionResult<HashMap<String, Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SessionError::Connection("read refused".into()));
        }
        self.inner.hash_get_all(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> SessionResult<bool> {
        if self.fail_expire.load(Ordering::SeqCst) {
            return Err(SessionError::Store("expire refused".into()));
        }
        self.inner.expire(key, ttl).await
    }

    async fn execute(&self, transaction: HashTransaction) -> SessionResult<()> {
        self.transactions.lock().push(transaction.clone());
        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(SessionError::Store("EXECABORT".into()));
        }
        self.inner.execute(transaction).await
    }
}

/// Tracer appending `start:<command>` and `finish:<ok|err>` to a shared list.
pub struct EventTracer(Arc<Mutex<Vec<String>>>);

impl CommandTracer for EventTracer {
    fn command_start(&mut self, _target: &str, command: &str, _key: &str) {
        self.0.lock().push(format!("start:{command}"));
    }

    fn command_finish(&mut self, error: Option<&SessionError>) {
        let outcome = if error.is_some() { "err" } else { "ok" };
        self.0.lock().push(format!("finish:{outcome}"));
    }
}

pub fn event_tracer() -> (TracerFactory, Arc<Mutex<Vec<String>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let shared = events.clone();
    let factory: TracerFactory =
        Arc::new(move || Box::new(EventTracer(shared.clone())) as Box<dyn CommandTracer>);
    (factory, events)
}

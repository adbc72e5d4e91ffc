//! Pending mutations buffered by a session until flush.

use std::collections::BTreeMap;

/// One buffered change to a hash field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    /// Write the encoded value.
    Set(Vec<u8>),
    /// Delete the field.
    Remove,
}

/// Coalesced pending operations, keyed by field.
///
/// Recording an operation replaces whatever was pending for that field, so
/// the log holds at most one operation per field: the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationLog {
    operations: BTreeMap<String, PendingOperation>,
}

impl MutationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write, replacing any pending operation for the field.
    pub fn set(&mut self, field: impl Into<String>, bytes: Vec<u8>) {
        self.operations.insert(field.into(), PendingOperation::Set(bytes));
    }

    /// Record a delete, replacing any pending operation for the field.
    pub fn remove(&mut self, field: impl Into<String>) {
        self.operations.insert(field.into(), PendingOperation::Remove);
    }

    /// Pending operation for a field.
    pub fn get(&self, field: &str) -> Option<&PendingOperation> {
        self.operations.get(field)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PendingOperation)> {
        self.operations.iter()
    }

    /// Split into the fields to write and the fields to delete.
    pub fn partition(&self) -> (Vec<(String, Vec<u8>)>, Vec<String>) {
        let mut sets = Vec::new();
        let mut removes = Vec::new();

        for (field, op) in &self.operations {
            match op {
                PendingOperation::Set(bytes) => sets.push((field.clone(), bytes.clone())),
                PendingOperation::Remove => removes.push(field.clone()),
            }
        }

        (sets, removes)
    }

    /// Drop the operations that were committed, keeping any that were
    /// replaced after the snapshot was taken.
    pub fn acknowledge(&mut self, committed: &MutationLog) {
        for (field, op) in &committed.operations {
            if self.operations.get(field) == Some(op) {
                self.operations.remove(field);
            }
        }
    }
}

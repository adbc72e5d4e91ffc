//! Consistent hash ring with virtual nodes.
//!
//! Each target occupies `vnodes` positions on a 64-bit ring; a key belongs to
//! the first position at or after its own hash. Adding a target only remaps
//! about 1/N of the keys.

use std::collections::BTreeMap;

/// Default virtual nodes per target.
pub const DEFAULT_VNODES: u32 = 160;

/// Hash ring mapping keys to target indices.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Sorted ring position → target index.
    ring: BTreeMap<u64, usize>,
    labels: Vec<String>,
    vnodes: u32,
}

impl HashRing {
    /// Create an empty ring. A `vnodes` of zero is treated as one.
    pub fn new(vnodes: u32) -> Self {
        Self {
            ring: BTreeMap::new(),
            labels: Vec::new(),
            vnodes: vnodes.max(1),
        }
    }

    /// Build a ring from target labels, in index order.
    pub fn with_labels<I, S>(vnodes: u32, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ring = Self::new(vnodes);
        for label in labels {
            ring.add_node(label);
        }
        ring
    }

    /// Add a target and return its index.
    pub fn add_node(&mut self, label: impl Into<String>) -> usize {
        let label = label.into();
        let index = self.labels.len();
        let label_hash = fnv1a_hash(label.as_bytes());

        for i in 0..self.vnodes {
            // Golden-ratio mixing spreads the positions of one label.
            let mixed = label_hash.wrapping_add((i as u64).wrapping_mul(0x9e3779b97f4a7c15));
            self.ring.insert(fnv1a_hash(&mixed.to_le_bytes()), index);
        }

        self.labels.push(label);
        index
    }

    /// Index of the target owning `key`, `None` on an empty ring.
    pub fn get_node(&self, key: &str) -> Option<usize> {
        let hash = fnv1a_hash(key.as_bytes());
        self.ring
            .range(hash..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, index)| *index)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn vnode_count(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// FNV-1a 64-bit hash.
fn fnv1a_hash(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_ring_returns_none() {
        let ring = HashRing::new(100);
        assert!(ring.is_empty());
        assert_eq!(ring.get_node("key"), None);
    }

    #[test]
    fn test_single_node_takes_every_key() {
        let ring = HashRing::with_labels(100, ["a"]);
        assert_eq!(ring.get_node("x"), Some(0));
        assert_eq!(ring.get_node("y"), Some(0));
        assert_eq!(ring.vnode_count(), 100);
    }

    #[test]
    fn test_same_labels_give_same_assignment() {
        let first = HashRing::with_labels(DEFAULT_VNODES, ["r1", "r2", "r3"]);
        let second = HashRing::with_labels(DEFAULT_VNODES, ["r1", "r2", "r3"]);

        for i in 0..500 {
            let key = format!("session-{i}");
            assert_eq!(first.get_node(&key), second.get_node(&key));
        }
    }

    #[test]
    fn test_distribution_touches_every_node() {
        let ring = HashRing::with_labels(DEFAULT_VNODES, ["r1", "r2", "r3", "r4"]);
        let mut counts: HashMap<usize, usize> = HashMap::new();

        for i in 0..4000 {
            let node = ring.get_node(&format!("key-{i}")).unwrap();
            *counts.entry(node).or_default() += 1;
        }

        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            assert!(*count > 400, "unbalanced ring: {counts:?}");
        }
    }

    #[test]
    fn test_adding_node_remaps_minority() {
        let before = HashRing::with_labels(DEFAULT_VNODES, ["r1", "r2", "r3"]);
        let after = HashRing::with_labels(DEFAULT_VNODES, ["r1", "r2", "r3", "r4"]);

        let moved = (0..3000)
            .map(|i| format!("key-{i}"))
            .filter(|key| before.get_node(key) != after.get_node(key))
            .count();

        assert!(moved < 1500, "{moved} of 3000 keys moved");
    }
}

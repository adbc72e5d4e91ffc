//! Store selection per session key.

use crate::error::{SessionError, SessionResult};
use crate::key::SessionKey;
use crate::ring::{DEFAULT_VNODES, HashRing};
use crate::store::HashStore;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Chooses the backing store for a session.
#[derive(Clone)]
pub enum StoreRouter {
    /// Every session goes to the same store.
    Fixed(Arc<dyn HashStore>),
    /// Sessions are spread across a group by consistent hashing.
    Group(StoreGroup),
}

impl StoreRouter {
    /// Store owning `key`. Deterministic and free of I/O.
    pub fn target(&self, key: &SessionKey) -> &Arc<dyn HashStore> {
        match self {
            Self::Fixed(store) => store,
            Self::Group(group) => group.target(key),
        }
    }

    /// Number of stores behind this router.
    pub fn len(&self) -> usize {
        match self {
            Self::Fixed(_) => 1,
            Self::Group(group) => group.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for StoreRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(store) => f.debug_tuple("Fixed").field(&store.name()).finish(),
            Self::Group(group) => f.debug_tuple("Group").field(group).finish(),
        }
    }
}

impl From<Arc<dyn HashStore>> for StoreRouter {
    fn from(store: Arc<dyn HashStore>) -> Self {
        Self::Fixed(store)
    }
}

impl From<StoreGroup> for StoreRouter {
    fn from(group: StoreGroup) -> Self {
        Self::Group(group)
    }
}

/// A non-empty set of uniquely named stores.
#[derive(Clone)]
pub struct StoreGroup {
    targets: Vec<Arc<dyn HashStore>>,
    ring: HashRing,
}

impl StoreGroup {
    /// Build a group with the default number of virtual nodes.
    pub fn new(targets: Vec<Arc<dyn HashStore>>) -> SessionResult<Self> {
        Self::with_vnodes(targets, DEFAULT_VNODES)
    }

    /// Build a group with `vnodes` ring positions per store.
    pub fn with_vnodes(targets: Vec<Arc<dyn HashStore>>, vnodes: u32) -> SessionResult<Self> {
        if targets.is_empty() {
            return Err(SessionError::Config(
                "store group must contain at least one target".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut ring = HashRing::new(vnodes);
        for target in &targets {
            let name = target.name();
            if !seen.insert(name.clone()) {
                return Err(SessionError::Config(format!(
                    "duplicate store name in group: {name}"
                )));
            }
            ring.add_node(name);
        }

        Ok(Self { targets, ring })
    }

    /// Store owning `key`.
    pub fn target(&self, key: &SessionKey) -> &Arc<dyn HashStore> {
        // The ring holds one node per target, so the index is always in range.
        let index = self.ring.get_node(key.as_str()).unwrap_or(0);
        &self.targets[index]
    }

    pub fn targets(&self) -> &[Arc<dyn HashStore>] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl fmt::Debug for StoreGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.targets.iter().map(|t| t.name()).collect();
        f.debug_struct("StoreGroup")
            .field("targets", &names)
            .field("vnodes", &self.ring.vnode_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHashStore;
    use proptest::prelude::*;

    fn stores(names: &[&str]) -> Vec<Arc<dyn HashStore>> {
        names
            .iter()
            .map(|name| Arc::new(MemoryHashStore::new(*name)) as Arc<dyn HashStore>)
            .collect()
    }

    #[test]
    fn test_fixed_router_always_returns_store() {
        let store: Arc<dyn HashStore> = Arc::new(MemoryHashStore::new("only"));
        let router = StoreRouter::from(store);

        assert_eq!(router.target(&"a".into()).name(), "only");
        assert_eq!(router.target(&"b".into()).name(), "only");
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_empty_group_rejected() {
        let result = StoreGroup::new(Vec::new());
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = StoreGroup::new(stores(&["r1", "r2", "r1"]));
        match result {
            Err(SessionError::Config(msg)) => assert!(msg.contains("r1")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_group_uses_every_target() {
        let group = StoreGroup::new(stores(&["r1", "r2", "r3"])).unwrap();
        let used: HashSet<_> = (0..300)
            .map(|i| group.target(&SessionKey::new(format!("key-{i}"))).name())
            .collect();
        assert_eq!(used.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_group_routing_is_deterministic(key in "[a-zA-Z0-9-]{1,40}") {
            let first = StoreGroup::new(stores(&["r1", "r2", "r3"])).unwrap();
            let second = StoreGroup::new(stores(&["r1", "r2", "r3"])).unwrap();
            let key = SessionKey::new(key);

            prop_assert_eq!(first.target(&key).name(), second.target(&key).name());
            prop_assert_eq!(first.target(&key).name(), first.target(&key).name());
        }
    }
}

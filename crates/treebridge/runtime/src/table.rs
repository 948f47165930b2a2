//! Node Identity Table
//!
//! Arena-plus-index bookkeeping: each provider has one [`NodeMap`] mapping
//! issued [`NodeId`]s back to the provider's nodes. A successful root
//! resolution replaces the provider's map wholesale, which invalidates every
//! identity issued from the previous tree.
//!
//! Identities come from a single counter shared by all providers of a bridge,
//! so no two internal nodes ever carry the same id.

use crate::registry::RegistrationSerial;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use treebridge_types::{ExternalNode, NodeId, ProviderId};

#[derive(Debug)]
struct IdentityAllocator {
    next: AtomicU64,
}

impl IdentityAllocator {
    fn allocate(&self) -> NodeId {
        NodeId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// The identity map for one provider's current tree
pub struct NodeMap {
    registration: RegistrationSerial,
    nodes: DashMap<NodeId, ExternalNode>,
    ids: Arc<IdentityAllocator>,
}

impl NodeMap {
    fn new(registration: RegistrationSerial, ids: Arc<IdentityAllocator>) -> Self {
        Self {
            registration,
            nodes: DashMap::new(),
            ids,
        }
    }

    /// Allocate a fresh identity for `node` and remember it
    pub fn put(&self, node: ExternalNode) -> NodeId {
        let id = self.ids.allocate();
        self.nodes.insert(id, node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<ExternalNode> {
        self.nodes.get(&id).map(|node| Arc::clone(node.value()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn registration(&self) -> RegistrationSerial {
        self.registration
    }
}

/// Per-provider identity maps
pub struct NodeIdentityTable {
    tables: DashMap<ProviderId, Arc<NodeMap>>,
    ids: Arc<IdentityAllocator>,
}

impl NodeIdentityTable {
    pub fn new(first_node_id: u64) -> Self {
        Self {
            tables: DashMap::new(),
            ids: Arc::new(IdentityAllocator {
                next: AtomicU64::new(first_node_id),
            }),
        }
    }

    /// Replace the provider's map with an empty one
    pub fn reset(&self, provider_id: &ProviderId, registration: RegistrationSerial) -> Arc<NodeMap> {
        let map = Arc::new(NodeMap::new(registration, Arc::clone(&self.ids)));
        self.tables.insert(provider_id.clone(), Arc::clone(&map));
        map
    }

    /// Reset and register the root in one step.
    ///
    /// The new map is filled before it is published, so no concurrent lookup
    /// can observe an empty tree for this provider. A map owned by a later
    /// registration is never replaced; `None` means this registration has
    /// been superseded.
    pub fn publish_root(
        &self,
        provider_id: &ProviderId,
        registration: RegistrationSerial,
        root: ExternalNode,
    ) -> Option<NodeId> {
        match self.tables.entry(provider_id.clone()) {
            Entry::Occupied(current) if current.get().registration > registration => None,
            Entry::Occupied(mut current) => {
                let map = NodeMap::new(registration, Arc::clone(&self.ids));
                let id = map.put(root);
                current.insert(Arc::new(map));
                Some(id)
            }
            Entry::Vacant(slot) => {
                let map = NodeMap::new(registration, Arc::clone(&self.ids));
                let id = map.put(root);
                slot.insert(Arc::new(map));
                Some(id)
            }
        }
    }

    /// Register `node` in the provider's current map.
    ///
    /// Returns `None` when the provider has never been rooted.
    pub fn put(&self, provider_id: &ProviderId, node: ExternalNode) -> Option<NodeId> {
        let map = self.snapshot(provider_id)?;
        Some(map.put(node))
    }

    /// Look an identity up in the provider's current map.
    ///
    /// A provider that was never rooted, an identity from a replaced tree and
    /// an identity that was never issued all miss the same way.
    pub fn get(&self, provider_id: &ProviderId, id: NodeId) -> Option<ExternalNode> {
        self.tables.get(provider_id)?.get(id)
    }

    /// The provider's current map, for callers that must keep working
    /// against one tree across an await point
    pub fn snapshot(&self, provider_id: &ProviderId) -> Option<Arc<NodeMap>> {
        self.tables.get(provider_id).map(|map| Arc::clone(map.value()))
    }

    /// Drop the provider's map if it still belongs to `registration`
    pub fn discard(&self, provider_id: &ProviderId, registration: RegistrationSerial) -> bool {
        self.tables
            .remove_if(provider_id, |_, map| map.registration == registration)
            .is_some()
    }

    pub fn provider_count(&self) -> usize {
        self.tables.len()
    }
}

//! Provider Registry - the set of live providers keyed by provider id

use crate::consumer::ConsumerProxy;
use crate::provider::TreeNodeProvider;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use treebridge_types::{BridgeError, BridgeResult, ProviderId};

/// Serial distinguishing successive registrations under the same id.
///
/// Serials only grow, so a later registration always compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationSerial(u64);

impl RegistrationSerial {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// A provider as seen by an in-flight call
#[derive(Clone)]
pub struct ProviderLease {
    pub serial: RegistrationSerial,
    pub provider: Arc<dyn TreeNodeProvider>,
}

/// Registered providers
pub struct ProviderRegistry {
    providers: DashMap<ProviderId, ProviderLease>,
    next_serial: AtomicU64,
    consumer: Arc<dyn ConsumerProxy>,
}

impl ProviderRegistry {
    pub fn new(consumer: Arc<dyn ConsumerProxy>) -> Self {
        Self {
            providers: DashMap::new(),
            next_serial: AtomicU64::new(1),
            consumer,
        }
    }

    /// Register a provider and announce it to the consumer.
    ///
    /// An id that is already taken is rejected; the existing registration
    /// and its node table are left alone.
    pub fn register(
        &self,
        provider_id: ProviderId,
        provider: Arc<dyn TreeNodeProvider>,
    ) -> BridgeResult<RegistrationSerial> {
        let serial = RegistrationSerial::new(self.next_serial.fetch_add(1, Ordering::Relaxed));

        match self.providers.entry(provider_id.clone()) {
            Entry::Occupied(_) => return Err(BridgeError::DuplicateProvider(provider_id)),
            Entry::Vacant(slot) => {
                slot.insert(ProviderLease { serial, provider });
            }
        }

        tracing::info!(provider_id = %provider_id, "tree node provider registered");
        self.consumer.provider_registered(&provider_id);
        Ok(serial)
    }

    /// Remove the registration identified by `serial`.
    ///
    /// Returns false when the id is unknown or now belongs to a newer
    /// registration.
    pub fn unregister(&self, provider_id: &ProviderId, serial: RegistrationSerial) -> bool {
        let removed = self
            .providers
            .remove_if(provider_id, |_, lease| lease.serial == serial)
            .is_some();

        if removed {
            tracing::info!(provider_id = %provider_id, "tree node provider unregistered");
            self.consumer.provider_unregistered(provider_id);
        }
        removed
    }

    pub fn lookup(&self, provider_id: &ProviderId) -> Option<ProviderLease> {
        self.providers.get(provider_id).map(|lease| lease.clone())
    }

    /// Whether `serial` is still the live registration for `provider_id`
    pub fn is_current(&self, provider_id: &ProviderId, serial: RegistrationSerial) -> bool {
        self.providers
            .get(provider_id)
            .is_some_and(|lease| lease.serial == serial)
    }

    pub fn contains(&self, provider_id: &ProviderId) -> bool {
        self.providers.contains_key(provider_id)
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.providers.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn count(&self) -> usize {
        self.providers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ChannelConsumerProxy;
    use crate::provider::JsonTreeProvider;
    use serde_json::json;
    use treebridge_types::ProviderNotice;

    fn provider() -> Arc<dyn TreeNodeProvider> {
        Arc::new(JsonTreeProvider::new(json!({ "label": "root" })))
    }

    #[test]
    fn register_announces_and_rejects_duplicates() {
        let (proxy, mut notices) = ChannelConsumerProxy::new();
        let registry = ProviderRegistry::new(Arc::new(proxy));
        let id = ProviderId::from("files");

        registry.register(id.clone(), provider()).unwrap();
        assert_eq!(
            notices.try_recv().unwrap(),
            ProviderNotice::Registered(id.clone())
        );

        let err = registry.register(id.clone(), provider()).unwrap_err();
        assert_eq!(err, BridgeError::DuplicateProvider(id));
        assert!(notices.try_recv().is_err());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn stale_serial_cannot_remove_newer_registration() {
        let registry = ProviderRegistry::new(Arc::new(crate::consumer::NoopConsumerProxy));
        let id = ProviderId::from("files");

        let first = registry.register(id.clone(), provider()).unwrap();
        assert!(registry.unregister(&id, first));
        let second = registry.register(id.clone(), provider()).unwrap();

        assert!(!registry.unregister(&id, first));
        assert!(registry.is_current(&id, second));
        assert!(!registry.is_current(&id, first));
    }

    #[test]
    fn lookup_misses_unknown_ids() {
        let registry = ProviderRegistry::new(Arc::new(crate::consumer::NoopConsumerProxy));
        assert!(registry.lookup(&ProviderId::from("ghost")).is_none());
        assert!(registry.provider_ids().is_empty());
    }
}

//! Tree bridge facade
//!
//! Wires the registry, the identity table and the two services together and
//! exposes the consumer-facing operations, both as plain async methods and as
//! a [`BridgeCall`] handler for transports.

use crate::commands::CommandRegistry;
use crate::config::BridgeConfig;
use crate::consumer::ConsumerProxy;
use crate::dispatcher::CommandDispatcher;
use crate::provider::TreeNodeProvider;
use crate::registry::{ProviderRegistry, RegistrationSerial};
use crate::resolution::ResolutionService;
use crate::table::NodeIdentityTable;
use crate::telemetry::{BridgeTelemetry, TelemetrySnapshot};
use std::sync::Arc;
use treebridge_types::{
    BridgeCall, BridgeReply, BridgeRequest, BridgeResult, BridgeValue, InternalNode, ProviderId,
};

/// Handle to a running bridge; cheap to clone
#[derive(Clone)]
pub struct TreeBridge {
    registry: Arc<ProviderRegistry>,
    table: Arc<NodeIdentityTable>,
    resolution: ResolutionService,
    dispatcher: CommandDispatcher,
    telemetry: Arc<BridgeTelemetry>,
}

impl TreeBridge {
    pub fn new(
        config: &BridgeConfig,
        commands: Arc<dyn CommandRegistry>,
        consumer: Arc<dyn ConsumerProxy>,
    ) -> Self {
        let registry = Arc::new(ProviderRegistry::new(consumer));
        let table = Arc::new(NodeIdentityTable::new(config.identity.first_node_id));
        let telemetry = Arc::new(BridgeTelemetry::new(&config.telemetry));

        let resolution = ResolutionService::new(
            Arc::clone(&registry),
            Arc::clone(&table),
            Arc::clone(&telemetry),
        );
        let dispatcher =
            CommandDispatcher::new(Arc::clone(&table), commands, Arc::clone(&telemetry));

        Self {
            registry,
            table,
            resolution,
            dispatcher,
            telemetry,
        }
    }

    /// Make a provider resolvable under `provider_id`.
    ///
    /// Keep the returned registration; disposing it is the only way to take
    /// the provider down again.
    pub fn register_provider(
        &self,
        provider_id: impl Into<ProviderId>,
        provider: Arc<dyn TreeNodeProvider>,
    ) -> BridgeResult<ProviderRegistration> {
        let provider_id = provider_id.into();
        let serial = self.registry.register(provider_id.clone(), provider)?;
        Ok(ProviderRegistration {
            provider_id,
            serial,
            registry: Arc::clone(&self.registry),
            table: Arc::clone(&self.table),
        })
    }

    pub async fn provide_root_node(&self, provider_id: &ProviderId) -> BridgeResult<InternalNode> {
        self.resolution.provide_root(provider_id).await
    }

    pub async fn resolve_children(
        &self,
        provider_id: &ProviderId,
        node: &InternalNode,
    ) -> BridgeResult<Vec<InternalNode>> {
        self.resolution.resolve_children(provider_id, node).await
    }

    pub async fn execute_node_command(
        &self,
        provider_id: &ProviderId,
        node: &InternalNode,
    ) -> BridgeResult<()> {
        self.dispatcher.execute_node_command(provider_id, node).await
    }

    /// Serve one call from a transport. Failures become rejected replies.
    pub async fn handle(&self, call: BridgeCall) -> BridgeReply {
        let BridgeCall {
            call_id,
            provider_id,
            request,
        } = call;

        let outcome = match request {
            BridgeRequest::ProvideRootNode => self
                .provide_root_node(&provider_id)
                .await
                .map(BridgeValue::Node),
            BridgeRequest::ResolveChildren { node } => self
                .resolve_children(&provider_id, &node)
                .await
                .map(BridgeValue::Children),
            BridgeRequest::ExecuteCommand { node } => self
                .execute_node_command(&provider_id, &node)
                .await
                .map(|()| BridgeValue::Unit),
        };

        match outcome {
            Ok(value) => BridgeReply::resolved(call_id, value),
            Err(err) => BridgeReply::rejected(call_id, err),
        }
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.registry.provider_ids()
    }

    pub fn is_registered(&self, provider_id: &ProviderId) -> bool {
        self.registry.contains(provider_id)
    }

    /// Number of providers that currently own a node table
    pub fn rooted_provider_count(&self) -> usize {
        self.table.provider_count()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }
}

/// A live provider registration
#[must_use = "dropping the registration leaves the provider registered with no way to remove it"]
pub struct ProviderRegistration {
    provider_id: ProviderId,
    serial: RegistrationSerial,
    registry: Arc<ProviderRegistry>,
    table: Arc<NodeIdentityTable>,
}

impl ProviderRegistration {
    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    /// Unregister the provider and drop its node table.
    ///
    /// Calls already in flight settle, but fail once they notice the
    /// registration is gone. A registration that was already superseded
    /// leaves the newer one alone.
    pub fn dispose(self) {
        if self.registry.unregister(&self.provider_id, self.serial) {
            self.table.discard(&self.provider_id, self.serial);
        }
    }
}

impl std::fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("provider_id", &self.provider_id)
            .field("serial", &self.serial)
            .finish()
    }
}

//! Resolution Service
//!
//! Fetches roots and children from providers and turns the opaque nodes they
//! return into internal nodes registered in the Node Identity Table.

use crate::provider::{settle, TreeNodeProvider};
use crate::registry::{ProviderLease, ProviderRegistry};
use crate::table::NodeIdentityTable;
use crate::telemetry::{BridgeOperation, BridgeTelemetry};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use treebridge_types::{
    BridgeError, BridgeResult, ExternalNode, InternalNode, NodeId, ProviderId, ResolutionPhase,
};

#[derive(Clone)]
pub struct ResolutionService {
    registry: Arc<ProviderRegistry>,
    table: Arc<NodeIdentityTable>,
    telemetry: Arc<BridgeTelemetry>,
}

impl ResolutionService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        table: Arc<NodeIdentityTable>,
        telemetry: Arc<BridgeTelemetry>,
    ) -> Self {
        Self {
            registry,
            table,
            telemetry,
        }
    }

    /// Fetch the provider's root and start a new tree for it.
    ///
    /// A failing provider leaves the previous tree, and every identity issued
    /// from it, untouched.
    #[instrument(skip_all, fields(provider_id = %provider_id))]
    pub async fn provide_root(&self, provider_id: &ProviderId) -> BridgeResult<InternalNode> {
        let result = self.provide_root_inner(provider_id).await;
        self.telemetry
            .record(BridgeOperation::ProvideRoot, provider_id, &result);
        result
    }

    async fn provide_root_inner(&self, provider_id: &ProviderId) -> BridgeResult<InternalNode> {
        let lease = self.lease(provider_id)?;

        let root = settle(lease.provider.provide_root_node())
            .await
            .map_err(|err| resolution_failure(provider_id, ResolutionPhase::Root, err))?;

        self.ensure_current(provider_id, &lease)?;
        // A newer registration already owns the table.
        let id = self
            .table
            .publish_root(provider_id, lease.serial, Arc::clone(&root))
            .ok_or_else(|| BridgeError::ProviderNotFound(provider_id.clone()))?;

        // Unregistered while publishing: drop the table we just installed.
        if !self.registry.is_current(provider_id, lease.serial) {
            self.table.discard(provider_id, lease.serial);
            return Err(BridgeError::ProviderNotFound(provider_id.clone()));
        }

        debug!(node_id = %id, "root node published");
        Ok(wrap(id, provider_id, lease.provider.as_ref(), &root))
    }

    /// Fetch the children of a node from the provider's current tree.
    ///
    /// Children are registered in the same tree the parent came from and are
    /// returned in the provider's order.
    #[instrument(skip_all, fields(provider_id = %provider_id, node_id = %node.id))]
    pub async fn resolve_children(
        &self,
        provider_id: &ProviderId,
        node: &InternalNode,
    ) -> BridgeResult<Vec<InternalNode>> {
        let result = self.resolve_children_inner(provider_id, node.id).await;
        self.telemetry
            .record(BridgeOperation::ResolveChildren, provider_id, &result);
        result
    }

    async fn resolve_children_inner(
        &self,
        provider_id: &ProviderId,
        node_id: NodeId,
    ) -> BridgeResult<Vec<InternalNode>> {
        let lease = self.lease(provider_id)?;

        let stale = || BridgeError::StaleNodeReference {
            provider_id: provider_id.clone(),
            node_id,
        };
        let tree = self
            .table
            .snapshot(provider_id)
            .filter(|tree| tree.registration() == lease.serial)
            .ok_or_else(stale)?;
        let parent = tree.get(node_id).ok_or_else(stale)?;

        let children = settle(lease.provider.resolve_children(&parent))
            .await
            .map_err(|err| resolution_failure(provider_id, ResolutionPhase::Children, err))?;

        self.ensure_current(provider_id, &lease)?;

        debug!(count = children.len(), "children resolved");
        Ok(children
            .into_iter()
            .map(|child| {
                let id = tree.put(Arc::clone(&child));
                wrap(id, provider_id, lease.provider.as_ref(), &child)
            })
            .collect())
    }

    fn lease(&self, provider_id: &ProviderId) -> BridgeResult<ProviderLease> {
        self.registry
            .lookup(provider_id)
            .ok_or_else(|| BridgeError::ProviderNotFound(provider_id.clone()))
    }

    fn ensure_current(&self, provider_id: &ProviderId, lease: &ProviderLease) -> BridgeResult<()> {
        if self.registry.is_current(provider_id, lease.serial) {
            Ok(())
        } else {
            debug!("provider unregistered while the call was in flight");
            Err(BridgeError::ProviderNotFound(provider_id.clone()))
        }
    }
}

fn resolution_failure(
    provider_id: &ProviderId,
    phase: ResolutionPhase,
    err: anyhow::Error,
) -> BridgeError {
    warn!(provider_id = %provider_id, %phase, error = %err, "tree node provider failed");
    BridgeError::ProviderResolutionFailure {
        provider_id: provider_id.clone(),
        phase,
    }
}

/// Build the consumer-facing wrapper; provider hooks win over the node's own
/// answers.
fn wrap(
    id: NodeId,
    provider_id: &ProviderId,
    provider: &dyn TreeNodeProvider,
    node: &ExternalNode,
) -> InternalNode {
    InternalNode {
        id,
        provider_id: provider_id.clone(),
        label: provider
            .label(node)
            .or_else(|| node.label())
            .unwrap_or_default(),
        has_children: provider
            .has_children(node)
            .or_else(|| node.has_children())
            .unwrap_or(true),
        click_command: provider
            .click_command(node)
            .or_else(|| node.click_command()),
    }
}

//! Command Dispatcher - runs the command bound to an activated node

use crate::commands::CommandRegistry;
use crate::provider::settle;
use crate::table::NodeIdentityTable;
use crate::telemetry::{BridgeOperation, BridgeTelemetry};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use treebridge_types::{BridgeError, BridgeResult, InternalNode, ProviderId};

#[derive(Clone)]
pub struct CommandDispatcher {
    table: Arc<NodeIdentityTable>,
    commands: Arc<dyn CommandRegistry>,
    telemetry: Arc<BridgeTelemetry>,
}

impl CommandDispatcher {
    pub fn new(
        table: Arc<NodeIdentityTable>,
        commands: Arc<dyn CommandRegistry>,
        telemetry: Arc<BridgeTelemetry>,
    ) -> Self {
        Self {
            table,
            commands,
            telemetry,
        }
    }

    /// Run the node's click command, if it has one.
    ///
    /// The command registry is called exactly once with the command's bound
    /// arguments and the provider's node as context. Its result is dropped.
    #[instrument(skip_all, fields(provider_id = %provider_id, node_id = %node.id))]
    pub async fn execute_node_command(
        &self,
        provider_id: &ProviderId,
        node: &InternalNode,
    ) -> BridgeResult<()> {
        let result = self.execute_inner(provider_id, node).await;
        self.telemetry
            .record(BridgeOperation::ExecuteCommand, provider_id, &result);
        result
    }

    async fn execute_inner(&self, provider_id: &ProviderId, node: &InternalNode) -> BridgeResult<()> {
        let Some(click) = &node.click_command else {
            debug!("node has no click command");
            return Ok(());
        };

        // No provider check: an unregistered provider has no table.
        let external = self
            .table
            .get(provider_id, node.id)
            .ok_or_else(|| BridgeError::StaleNodeReference {
                provider_id: provider_id.clone(),
                node_id: node.id,
            })?;

        settle(
            self.commands
                .execute_command(&click.command, &click.arguments, external),
        )
        .await
        .map(|_| debug!(command = %click.command, "command executed"))
        .map_err(|err| {
            warn!(
                provider_id = %provider_id,
                command = %click.command,
                error = %err,
                "command execution failed"
            );
            BridgeError::CommandExecutionFailure {
                command: click.command.clone(),
                provider_id: provider_id.clone(),
            }
        })
    }
}

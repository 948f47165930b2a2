//! Bridge error types

use crate::ids::{NodeId, ProviderId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which provider operation a resolution failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPhase {
    Root,
    Children,
}

impl ResolutionPhase {
    fn action(self) -> &'static str {
        match self {
            ResolutionPhase::Root => "provide root node",
            ResolutionPhase::Children => "resolve children",
        }
    }
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPhase::Root => f.write_str("root"),
            ResolutionPhase::Children => f.write_str("children"),
        }
    }
}

/// Per-call bridge failures.
///
/// Provider and command errors are reduced to the provider id,
/// phase and command name; the underlying error never crosses the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("No tree node provider with id '{0}' registered.")]
    ProviderNotFound(ProviderId),

    #[error("A tree node provider with id '{0}' is already registered.")]
    DuplicateProvider(ProviderId),

    #[error("Tree node provider '{provider_id}' failed to {}.", .phase.action())]
    ProviderResolutionFailure {
        provider_id: ProviderId,
        phase: ResolutionPhase,
    },

    #[error("Failed to execute command '{command}' provided by tree node provider '{provider_id}'.")]
    CommandExecutionFailure {
        command: String,
        provider_id: ProviderId,
    },

    #[error("{node_id} is not part of the current tree of provider '{provider_id}'.")]
    StaleNodeReference {
        provider_id: ProviderId,
        node_id: NodeId,
    },
}

impl BridgeError {
    pub fn kind(&self) -> FaultKind {
        match self {
            BridgeError::ProviderNotFound(_) => FaultKind::ProviderNotFound,
            BridgeError::DuplicateProvider(_) => FaultKind::DuplicateProvider,
            BridgeError::ProviderResolutionFailure { .. } => FaultKind::ProviderResolutionFailure,
            BridgeError::CommandExecutionFailure { .. } => FaultKind::CommandExecutionFailure,
            BridgeError::StaleNodeReference { .. } => FaultKind::StaleNodeReference,
        }
    }

    pub fn provider_id(&self) -> &ProviderId {
        match self {
            BridgeError::ProviderNotFound(id) | BridgeError::DuplicateProvider(id) => id,
            BridgeError::ProviderResolutionFailure { provider_id, .. }
            | BridgeError::CommandExecutionFailure { provider_id, .. }
            | BridgeError::StaleNodeReference { provider_id, .. } => provider_id,
        }
    }
}

/// Stable code for a failure, as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    ProviderNotFound,
    DuplicateProvider,
    ProviderResolutionFailure,
    CommandExecutionFailure,
    StaleNodeReference,
}

/// Result type for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_provider_and_phase() {
        let err = BridgeError::ProviderResolutionFailure {
            provider_id: "files".into(),
            phase: ResolutionPhase::Root,
        };
        assert_eq!(
            err.to_string(),
            "Tree node provider 'files' failed to provide root node."
        );

        let err = BridgeError::ProviderResolutionFailure {
            provider_id: "files".into(),
            phase: ResolutionPhase::Children,
        };
        assert_eq!(
            err.to_string(),
            "Tree node provider 'files' failed to resolve children."
        );
        assert_eq!(err.kind(), FaultKind::ProviderResolutionFailure);
    }

    #[test]
    fn command_failure_names_command() {
        let err = BridgeError::CommandExecutionFailure {
            command: "files.open".into(),
            provider_id: "files".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to execute command 'files.open' provided by tree node provider 'files'."
        );
        assert_eq!(err.provider_id().as_str(), "files");
    }

    #[test]
    fn fault_kinds_use_snake_case_codes() {
        let code = serde_json::to_string(&FaultKind::StaleNodeReference).unwrap();
        assert_eq!(code, "\"stale_node_reference\"");
    }
}

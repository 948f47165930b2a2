//! Call accounting for the bridge

use crate::config::TelemetryConfig;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use treebridge_types::{BridgeError, FaultKind, ProviderId};

/// Bridge operations reachable from the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeOperation {
    ProvideRoot,
    ResolveChildren,
    ExecuteCommand,
}

/// Counts settled calls and their failures
pub struct BridgeTelemetry {
    config: TelemetryConfig,
    calls: DashMap<BridgeOperation, u64>,
    failures: DashMap<FaultKind, u64>,
}

impl BridgeTelemetry {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            config: config.clone(),
            calls: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    /// Record a settled call
    pub fn record<T>(
        &self,
        operation: BridgeOperation,
        provider_id: &ProviderId,
        result: &Result<T, BridgeError>,
    ) {
        if !self.config.enabled {
            return;
        }

        *self.calls.entry(operation).or_insert(0) += 1;
        if let Err(err) = result {
            *self.failures.entry(err.kind()).or_insert(0) += 1;
        }

        if self.config.log_calls {
            match result {
                Ok(_) => tracing::debug!(?operation, provider_id = %provider_id, "call resolved"),
                Err(err) => tracing::debug!(
                    ?operation,
                    provider_id = %provider_id,
                    kind = ?err.kind(),
                    "call rejected"
                ),
            }
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            calls: self.calls.iter().map(|e| (*e.key(), *e.value())).collect(),
            failures: self.failures.iter().map(|e| (*e.key(), *e.value())).collect(),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub calls: HashMap<BridgeOperation, u64>,
    pub failures: HashMap<FaultKind, u64>,
}

impl TelemetrySnapshot {
    pub fn calls(&self, operation: BridgeOperation) -> u64 {
        self.calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn failures(&self, kind: FaultKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }
}

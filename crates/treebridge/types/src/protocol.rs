//! Wire protocol between the consumer and the bridge.
//!
//! A transport carries [`BridgeCall`]s to the bridge and [`BridgeReply`]s
//! back, matching them by [`CallId`]. Announcements about providers travel
//! the other way as [`ProviderNotice`]s.

use crate::error::{BridgeError, FaultKind};
use crate::ids::{CallId, ProviderId};
use crate::node::InternalNode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum BridgeRequest {
    ProvideRootNode,
    ResolveChildren { node: InternalNode },
    ExecuteCommand { node: InternalNode },
}

impl BridgeRequest {
    pub fn method(&self) -> &'static str {
        match self {
            BridgeRequest::ProvideRootNode => "provideRootNode",
            BridgeRequest::ResolveChildren { .. } => "resolveChildren",
            BridgeRequest::ExecuteCommand { .. } => "executeCommand",
        }
    }
}

/// A single call, keyed by provider id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCall {
    pub call_id: CallId,
    pub provider_id: ProviderId,
    pub request: BridgeRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum BridgeValue {
    Node(InternalNode),
    Children(Vec<InternalNode>),
    Unit,
}

/// Failure as it crosses the boundary: a stable code plus the message
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct BridgeFault {
    pub kind: FaultKind,
    pub message: String,
}

impl From<&BridgeError> for BridgeFault {
    fn from(err: &BridgeError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<BridgeError> for BridgeFault {
    fn from(err: BridgeError) -> Self {
        Self::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BridgeOutcome {
    Resolved(BridgeValue),
    Rejected(BridgeFault),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReply {
    pub call_id: CallId,
    pub outcome: BridgeOutcome,
}

impl BridgeReply {
    pub fn resolved(call_id: CallId, value: BridgeValue) -> Self {
        Self {
            call_id,
            outcome: BridgeOutcome::Resolved(value),
        }
    }

    pub fn rejected(call_id: CallId, fault: impl Into<BridgeFault>) -> Self {
        Self {
            call_id,
            outcome: BridgeOutcome::Rejected(fault.into()),
        }
    }

    pub fn into_result(self) -> Result<BridgeValue, BridgeFault> {
        match self.outcome {
            BridgeOutcome::Resolved(value) => Ok(value),
            BridgeOutcome::Rejected(fault) => Err(fault),
        }
    }
}

/// Provider lifecycle announcements sent to the consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "providerId", rename_all = "camelCase")]
pub enum ProviderNotice {
    Registered(ProviderId),
    Unregistered(ProviderId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use serde_json::json;

    #[test]
    fn call_is_tagged_by_method() {
        let call = BridgeCall {
            call_id: CallId::new(9),
            provider_id: "files".into(),
            request: BridgeRequest::ProvideRootNode,
        };
        let wire = serde_json::to_value(&call).unwrap();
        assert_eq!(
            wire,
            json!({ "callId": 9, "providerId": "files", "request": { "method": "provideRootNode" } })
        );
    }

    #[test]
    fn rejected_reply_carries_kind_and_message() {
        let err = BridgeError::ProviderNotFound("ghost".into());
        let reply = BridgeReply::rejected(CallId::new(1), &err);
        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(wire["outcome"]["rejected"]["kind"], "provider_not_found");
        assert_eq!(
            wire["outcome"]["rejected"]["message"],
            "No tree node provider with id 'ghost' registered."
        );

        let fault = reply.into_result().unwrap_err();
        assert_eq!(fault.kind, FaultKind::ProviderNotFound);
    }

    #[test]
    fn children_reply_decodes() {
        let wire = json!({
            "callId": 2,
            "outcome": { "resolved": { "type": "children", "value": [
                { "id": 2, "providerId": "files", "label": "a", "hasChildren": true }
            ] } }
        });
        let reply: BridgeReply = serde_json::from_value(wire).unwrap();
        match reply.into_result().unwrap() {
            BridgeValue::Children(children) => {
                assert_eq!(children.len(), 1);
                assert_eq!(children[0].id, NodeId::new(2));
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn notices_name_the_provider() {
        let wire = serde_json::to_value(ProviderNotice::Registered("files".into())).unwrap();
        assert_eq!(wire, json!({ "event": "registered", "providerId": "files" }));
    }
}

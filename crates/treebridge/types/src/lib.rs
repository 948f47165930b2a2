//! Tree Bridge Types
//!
//! Shared vocabulary for the tree bridge:
//!
//! - **ProviderId / NodeId**: identities that survive the process boundary
//! - **InternalNode**: the bridge-owned wrapper handed to the consumer
//! - **TreeNode / ExternalNode**: the only view the bridge has of provider data
//! - **BridgeError**: per-call failure taxonomy
//! - **Protocol**: serializable call/reply envelopes carried by a transport

#![deny(unsafe_code)]

pub mod error;
pub mod ids;
pub mod node;
pub mod protocol;

pub use error::{BridgeError, BridgeResult, FaultKind, ResolutionPhase};
pub use ids::{CallId, NodeId, ProviderId};
pub use node::{external, json_label, AsAny, ClickCommand, ExternalNode, InternalNode, TreeNode};
pub use protocol::{
    BridgeCall, BridgeFault, BridgeOutcome, BridgeReply, BridgeRequest, BridgeValue,
    ProviderNotice,
};

//! Tree Bridge Runtime
//!
//! Serves tree-shaped data owned by providers to a consumer that never sees
//! the providers' node types:
//!
//! - **ProviderRegistry**: live providers keyed by provider id
//! - **NodeIdentityTable**: per-provider maps from issued identities back to
//!   provider nodes, replaced wholesale on every successful re-root
//! - **ResolutionService**: root and child resolution
//! - **CommandDispatcher**: runs the command bound to an activated node
//! - **BridgeServer**: the transport side, one task per call
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let bridge = TreeBridge::new(&config, commands, consumer);
//! let files = bridge.register_provider("files", Arc::new(JsonTreeProvider::new(tree)))?;
//! let root = bridge.provide_root_node(files.provider_id()).await?;
//! let children = bridge.resolve_children(files.provider_id(), &root).await?;
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod bridge;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod provider;
pub mod registry;
pub mod resolution;
pub mod server;
pub mod table;
pub mod telemetry;

// Re-exports
pub use bridge::{ProviderRegistration, TreeBridge};
pub use commands::{CommandRegistry, InMemoryCommandRegistry};
pub use config::{BridgeConfig, IdentityConfig, LoggingConfig, ServerConfig, TelemetryConfig};
pub use consumer::{ChannelConsumerProxy, ConsumerProxy, NoopConsumerProxy};
pub use dispatcher::CommandDispatcher;
pub use error::{ConfigError, ServerError};
pub use provider::{JsonNode, JsonTreeProvider, TreeNodeProvider};
pub use registry::{ProviderLease, ProviderRegistry, RegistrationSerial};
pub use resolution::ResolutionService;
pub use server::{BridgeClient, BridgeServer, ServerHandle};
pub use table::{NodeIdentityTable, NodeMap};
pub use telemetry::{BridgeOperation, BridgeTelemetry, TelemetrySnapshot};

pub use treebridge_types::{
    external, BridgeCall, BridgeError, BridgeFault, BridgeOutcome, BridgeReply, BridgeRequest,
    BridgeResult, BridgeValue, CallId, ClickCommand, ExternalNode, FaultKind, InternalNode, NodeId,
    ProviderId, ProviderNotice, ResolutionPhase, TreeNode,
};

//! Runtime error types

use thiserror::Error;
use treebridge_types::{BridgeFault, CallId};

pub use treebridge_types::{BridgeError, BridgeResult};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors seen by a client of the call server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bridge server is not accepting calls")]
    Closed,

    #[error("Bridge server dropped the reply to {0}")]
    ReplyDropped(CallId),

    #[error("Unexpected reply to {call_id}: expected {expected}")]
    UnexpectedReply {
        call_id: CallId,
        expected: &'static str,
    },

    #[error(transparent)]
    Rejected(#[from] BridgeFault),
}

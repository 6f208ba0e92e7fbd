use serde_json::Value;
use thiserror::Error;

/// RPC channel errors.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The remote side answered with a rejected response.
    #[error("Remote call rejected: {0}")]
    Rejected(Value),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Call timed out")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

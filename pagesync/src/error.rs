use pagesync_core::ModelError;
use pagesync_rpc::RpcError;
use thiserror::Error;

use crate::spa::SpaState;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration must be a JSON object")]
    NotAnObject,

    #[error("Configuration mixes proxy keys ({proxy}) with token keys ({token})")]
    Ambiguous { proxy: String, token: String },

    #[error("Configuration matches neither the proxy nor the token shape")]
    Unrecognized,

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL `{0}` has no origin")]
    OpaqueOrigin(String),
}

/// Errors surfaced by the HTTP collaborator.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Unexpected response from {url}: {reason}")]
    Response { url: String, reason: String },
}

/// Page synchronizer errors.
#[derive(Debug, Error)]
pub enum SpaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Operation requires state {expected:?}, page is {actual:?}")]
    InvalidState { expected: SpaState, actual: SpaState },
}

//! # pagesync-rpc: Request/response and event protocol between windows
//!
//! A small bidirectional RPC layer for the SPA and the editor frame that
//! hosts it. Calls are correlated by id; events are fire-and-forget.
//!
//! ## Modules
//!
//! - [`protocol`]: JSON message envelope
//! - [`channel`]: pending-call table, command callbacks, event listeners
//! - [`transport`]: post-message transport with origin filtering

pub mod channel;
pub mod error;
mod lock;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use channel::{Callback, PendingCall, RpcChannel, RpcConfig, Subscription, Transport};
pub use error::RpcError;
pub use protocol::{Message, ResponseState};
pub use transport::{
    listen, origin_matches, window_pair, MessageTarget, PostMessageTransport, Window,
    WindowMessage, WindowTarget, ANY_ORIGIN,
};

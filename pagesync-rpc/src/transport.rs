//! Cross-window transport with origin verification.
//!
//! ```text
//!   SPA window                                   editor window
//! ┌──────────────┐  post_message(data, origin) ┌──────────────┐
//! │ RpcChannel   │ ──────────────────────────► │ inbox        │
//! │   ▲          │                             │              │
//! │   │ listen() │ ◄────────────────────────── │ MessageTarget│
//! │ inbox        │   WindowMessage { origin }  │              │
//! └──────────────┘                             └──────────────┘
//! ```
//!
//! Outgoing messages are addressed to one origin; incoming messages from any
//! other origin, or with no payload, never reach the protocol layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::{RpcChannel, Transport};
use crate::error::RpcError;
use crate::protocol::Message;

/// Matches every origin.
pub const ANY_ORIGIN: &str = "*";

/// A message as delivered to a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMessage {
    /// Origin of the sending window.
    pub origin: String,
    pub data: Option<Value>,
}

/// The counter-frame messages are posted to.
pub trait MessageTarget: Send + Sync {
    /// Deliver `data` if the target's origin matches `target_origin`.
    fn post_message(&self, data: Value, target_origin: &str) -> Result<(), RpcError>;
}

/// Whether a message from `actual` passes a filter configured for `expected`.
pub fn origin_matches(expected: &str, actual: &str) -> bool {
    expected == ANY_ORIGIN || expected == actual
}

pub struct PostMessageTransport {
    target: Arc<dyn MessageTarget>,
    origin: String,
}

impl PostMessageTransport {
    pub fn new(target: Arc<dyn MessageTarget>, origin: impl Into<String>) -> Self {
        Self {
            target,
            origin: origin.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Payload of `message` if it passes the origin and payload checks.
    pub fn accept<'a>(&self, message: &'a WindowMessage) -> Option<&'a Value> {
        accept(&self.origin, message)
    }
}

impl Transport for PostMessageTransport {
    fn send(&self, message: &Message) -> Result<(), RpcError> {
        self.target.post_message(message.encode()?, &self.origin)
    }
}

fn accept<'a>(origin: &str, message: &'a WindowMessage) -> Option<&'a Value> {
    if !origin_matches(origin, &message.origin) {
        log::debug!("Dropping message from unexpected origin {}", message.origin);
        return None;
    }
    match &message.data {
        Some(Value::Null) | None => {
            log::trace!("Dropping message without payload from {}", message.origin);
            None
        }
        Some(data) => Some(data),
    }
}

/// Pump `inbox` into `channel`, keeping only messages from `origin`.
///
/// The task ends when the inbox closes or the channel is destroyed.
pub fn listen(
    channel: Arc<RpcChannel>,
    origin: impl Into<String>,
    mut inbox: mpsc::UnboundedReceiver<WindowMessage>,
) -> JoinHandle<()> {
    let origin = origin.into();
    tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            if channel.is_closed() {
                break;
            }
            if let Some(data) = accept(&origin, &message) {
                channel.receive(data);
            }
        }
        log::debug!("Stopped listening for messages from {origin}");
    })
}

// ---------------------------------------------------------------
// In-process windows
// ---------------------------------------------------------------

/// Posts into another in-process window's inbox.
#[derive(Clone)]
pub struct WindowTarget {
    /// Origin of the posting window, stamped on every message.
    sender_origin: String,
    /// Origin of the receiving window.
    recipient_origin: String,
    outbox: mpsc::UnboundedSender<WindowMessage>,
}

impl WindowTarget {
    pub fn new(
        sender_origin: impl Into<String>,
        recipient_origin: impl Into<String>,
        outbox: mpsc::UnboundedSender<WindowMessage>,
    ) -> Self {
        Self {
            sender_origin: sender_origin.into(),
            recipient_origin: recipient_origin.into(),
            outbox,
        }
    }
}

impl MessageTarget for WindowTarget {
    fn post_message(&self, data: Value, target_origin: &str) -> Result<(), RpcError> {
        if !origin_matches(target_origin, &self.recipient_origin) {
            log::debug!(
                "Not delivering to {}: addressed to {target_origin}",
                self.recipient_origin
            );
            return Ok(());
        }
        self.outbox
            .send(WindowMessage {
                origin: self.sender_origin.clone(),
                data: Some(data),
            })
            .map_err(|_| RpcError::Transport("Window closed".to_string()))
    }
}

/// One side of an in-process window pair.
pub struct Window {
    pub origin: String,
    /// Posts to the other window.
    pub target: Arc<dyn MessageTarget>,
    /// Messages posted to this window.
    pub inbox: mpsc::UnboundedReceiver<WindowMessage>,
}

/// Two windows at `a` and `b` that can post to each other.
pub fn window_pair(a: &str, b: &str) -> (Window, Window) {
    let (to_a, inbox_a) = mpsc::unbounded_channel();
    let (to_b, inbox_b) = mpsc::unbounded_channel();
    (
        Window {
            origin: a.to_string(),
            target: Arc::new(WindowTarget::new(a, b, to_b)),
            inbox: inbox_a,
        },
        Window {
            origin: b.to_string(),
            target: Arc::new(WindowTarget::new(b, a, to_a)),
            inbox: inbox_b,
        },
    )
}

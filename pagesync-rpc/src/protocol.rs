//! JSON message envelope exchanged between the two windows.
//!
//! ```text
//! Event:    { type: "event",    event,  payload? }
//! Request:  { type: "request",  id,     command, payload: [args] }
//! Response: { type: "response", id,     state: "fulfilled" | "rejected", result }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// Outcome carried by a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseState {
    Fulfilled,
    Rejected,
}

/// Top-level protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Fire-and-forget notification.
    Event {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Remote command invocation; answered by exactly one response.
    Request {
        id: String,
        command: String,
        #[serde(default)]
        payload: Vec<Value>,
    },
    /// Answer to the request with the same `id`.
    Response {
        id: String,
        state: ResponseState,
        #[serde(default)]
        result: Value,
    },
}

impl Message {
    pub fn event(event: impl Into<String>, payload: Option<Value>) -> Self {
        Self::Event {
            event: event.into(),
            payload,
        }
    }

    pub fn request(id: impl Into<String>, command: impl Into<String>, payload: Vec<Value>) -> Self {
        Self::Request {
            id: id.into(),
            command: command.into(),
            payload,
        }
    }

    pub fn fulfilled(id: impl Into<String>, result: Value) -> Self {
        Self::Response {
            id: id.into(),
            state: ResponseState::Fulfilled,
            result,
        }
    }

    pub fn rejected(id: impl Into<String>, result: Value) -> Self {
        Self::Response {
            id: id.into(),
            state: ResponseState::Rejected,
            result,
        }
    }

    /// Response to request `id` carrying `outcome`.
    pub fn response(id: impl Into<String>, outcome: Result<Value, Value>) -> Self {
        match outcome {
            Ok(result) => Self::fulfilled(id, result),
            Err(reason) => Self::rejected(id, reason),
        }
    }

    pub fn encode(&self) -> Result<Value, RpcError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a raw window payload. Anything that is not a well-formed
    /// protocol message yields `None`.
    pub fn decode(raw: &Value) -> Option<Self> {
        match Self::deserialize(raw) {
            Ok(message) => Some(message),
            Err(e) => {
                log::trace!("Dropping malformed message: {e}");
                None
            }
        }
    }
}

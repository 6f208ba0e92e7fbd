//! Correlated request/response calls and fire-and-forget events over one
//! transport.
//!
//! Each outgoing request is recorded in the pending-call table under a fresh
//! id until its response arrives. Incoming requests are answered exactly once,
//! fulfilled with the registered callback's result or rejected with its error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::RpcError;
use crate::lock::{lock, read, write};
use crate::protocol::{Message, ResponseState};

/// Sends encoded protocol messages to the counter-party.
pub trait Transport: Send + Sync {
    fn send(&self, message: &Message) -> Result<(), RpcError>;
}

/// Channel configuration.
#[derive(Debug, Clone, Default)]
pub struct RpcConfig {
    /// Upper bound on how long a call waits for its response. `None` waits
    /// until the response arrives or the channel is destroyed.
    pub call_timeout: Option<Duration>,
}

/// Handle returned by [`RpcChannel::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

pub type Callback = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, Value>> + Send + Sync>;
pub type EventListener = Arc<dyn Fn(&Value) + Send + Sync>;

type Outcome = Result<Value, Value>;
type PendingTable = Arc<Mutex<HashMap<String, oneshot::Sender<Outcome>>>>;

pub struct RpcChannel {
    transport: Arc<dyn Transport>,
    config: RpcConfig,
    pending: PendingTable,
    callbacks: RwLock<HashMap<String, Callback>>,
    listeners: RwLock<HashMap<String, Vec<(Subscription, EventListener)>>>,
    next_subscription: AtomicU64,
    ids: Box<dyn Fn() -> String + Send + Sync>,
    closed: AtomicBool,
}

impl RpcChannel {
    pub fn new(transport: Arc<dyn Transport>, config: RpcConfig) -> Self {
        Self {
            transport,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            callbacks: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            ids: Box::new(|| Uuid::new_v4().to_string()),
            closed: AtomicBool::new(false),
        }
    }

    /// Replace the request id source. Ids colliding with an in-flight call
    /// are drawn again.
    pub fn with_id_source<F>(mut self, ids: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.ids = Box::new(ids);
        self
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    // ---------------------------------------------------------------
    // Outgoing calls
    // ---------------------------------------------------------------

    /// Send a request for `command` and return a handle on its response.
    pub fn request(&self, command: &str, args: Vec<Value>) -> Result<PendingCall, RpcError> {
        if self.is_closed() {
            return Err(RpcError::ChannelClosed);
        }

        let (tx, rx) = oneshot::channel();
        let id = {
            let mut pending = lock(&self.pending);
            let mut id = (self.ids)();
            while pending.contains_key(&id) {
                id = (self.ids)();
            }
            pending.insert(id.clone(), tx);
            id
        };

        if let Err(e) = self.transport.send(&Message::request(id.clone(), command, args)) {
            lock(&self.pending).remove(&id);
            return Err(e);
        }

        Ok(PendingCall {
            id,
            receiver: rx,
            pending: self.pending.clone(),
            timeout: self.config.call_timeout,
        })
    }

    /// Call `command` on the remote side and wait for its result.
    pub async fn call(&self, command: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        self.request(command, args)?.wait().await
    }

    /// Number of calls still waiting for a response.
    pub fn pending_calls(&self) -> usize {
        lock(&self.pending).len()
    }

    // ---------------------------------------------------------------
    // Local commands and events
    // ---------------------------------------------------------------

    /// Serve `command` with `callback`. Replaces any previous callback.
    pub fn register<F, Fut>(&self, command: impl Into<String>, callback: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        let callback: Callback = Arc::new(move |args| callback(args).boxed());
        write(&self.callbacks).insert(command.into(), callback);
    }

    pub fn unregister(&self, command: &str) -> bool {
        write(&self.callbacks).remove(command).is_some()
    }

    /// Listen for remote `event`s.
    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let subscription = Subscription(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        write(&self.listeners)
            .entry(event.into())
            .or_default()
            .push((subscription, Arc::new(listener)));
        subscription
    }

    pub fn off(&self, subscription: Subscription) -> bool {
        let mut listeners = write(&self.listeners);
        let mut removed = false;
        for registered in listeners.values_mut() {
            let before = registered.len();
            registered.retain(|(id, _)| *id != subscription);
            removed |= registered.len() != before;
        }
        listeners.retain(|_, registered| !registered.is_empty());
        removed
    }

    /// Send a fire-and-forget event to the remote side.
    pub fn emit(&self, event: &str, payload: Option<Value>) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::ChannelClosed);
        }
        self.transport.send(&Message::event(event, payload))
    }

    // ---------------------------------------------------------------
    // Incoming messages
    // ---------------------------------------------------------------

    /// Handle one raw incoming payload, awaiting any callback it invokes.
    pub async fn process(&self, raw: &Value) {
        if let Some(message) = Message::decode(raw) {
            self.dispatch(message).await;
        }
    }

    /// Handle one raw incoming payload without waiting on callbacks.
    ///
    /// Events and responses are handled before this returns. Requests are
    /// served on a spawned task so a callback that itself calls the remote
    /// side cannot stall the responses it is waiting for. Requires a Tokio
    /// runtime.
    pub fn receive(self: &Arc<Self>, raw: &Value) {
        let Some(message) = Message::decode(raw) else {
            return;
        };
        if self.is_closed() {
            log::debug!("Channel closed, dropping {message:?}");
            return;
        }
        match message {
            Message::Request { id, command, payload } => {
                let channel = self.clone();
                tokio::spawn(async move { channel.serve(id, command, payload).await });
            }
            Message::Event { event, payload } => self.deliver(&event, payload.unwrap_or(Value::Null)),
            Message::Response { id, state, result } => self.settle(&id, state, result),
        }
    }

    pub async fn dispatch(&self, message: Message) {
        if self.is_closed() {
            log::debug!("Channel closed, dropping {message:?}");
            return;
        }
        match message {
            Message::Event { event, payload } => self.deliver(&event, payload.unwrap_or(Value::Null)),
            Message::Response { id, state, result } => self.settle(&id, state, result),
            Message::Request { id, command, payload } => self.serve(id, command, payload).await,
        }
    }

    fn deliver(&self, event: &str, payload: Value) {
        let snapshot: Vec<EventListener> = read(&self.listeners)
            .get(event)
            .map(|registered| registered.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();
        if snapshot.is_empty() {
            log::trace!("No listener for event `{event}`");
        }
        for listener in snapshot {
            listener(&payload);
        }
    }

    fn settle(&self, id: &str, state: ResponseState, result: Value) {
        let Some(tx) = lock(&self.pending).remove(id) else {
            log::debug!("Dropping response for unknown call {id}");
            return;
        };
        let outcome = match state {
            ResponseState::Fulfilled => Ok(result),
            ResponseState::Rejected => Err(result),
        };
        // The caller may have stopped waiting.
        let _ = tx.send(outcome);
    }

    async fn serve(&self, id: String, command: String, args: Vec<Value>) {
        let callback = read(&self.callbacks).get(&command).cloned();
        let outcome = match callback {
            Some(callback) => {
                let invoked = AssertUnwindSafe(async move { callback(args).await });
                match invoked.catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        log::warn!("Command `{command}` panicked");
                        Err(json!(format!("Command `{command}` panicked")))
                    }
                }
            }
            None => {
                log::debug!("Rejecting request for unregistered command `{command}`");
                Err(json!(format!("Command `{command}` is not registered")))
            }
        };

        if self.is_closed() {
            return;
        }
        if let Err(e) = self.transport.send(&Message::response(id, outcome)) {
            log::warn!("Failed to answer `{command}`: {e}");
        }
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the channel. Pending calls fail with [`RpcError::ChannelClosed`].
    /// Idempotent.
    pub fn destroy(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        lock(&self.pending).clear();
        write(&self.callbacks).clear();
        write(&self.listeners).clear();
    }
}

/// An in-flight call.
#[must_use = "a pending call does nothing unless waited on"]
pub struct PendingCall {
    id: String,
    receiver: oneshot::Receiver<Outcome>,
    pending: PendingTable,
    timeout: Option<Duration>,
}

impl PendingCall {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn wait(self) -> Result<Value, RpcError> {
        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.receiver).await {
                Ok(received) => received,
                Err(_) => {
                    lock(&self.pending).remove(&self.id);
                    return Err(RpcError::Timeout);
                }
            },
            None => self.receiver.await,
        };

        match received {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(reason)) => Err(RpcError::Rejected(reason)),
            Err(_) => Err(RpcError::ChannelClosed),
        }
    }
}

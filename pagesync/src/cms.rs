//! The editor side of the RPC channel.
//!
//! ```text
//!   SPA                                   editor
//!    │ ── event "ready" ───────────────────▶ │   once the document is not loading
//!    │ ◀── event "update" { id, properties } │   per edit
//!    │ ── request "sync" ──────────────────▶ │   re-position overlays
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pagesync_rpc::{RpcChannel, RpcError, Subscription};
use tokio::sync::{mpsc, watch};

use crate::propagator::UpdateEvent;

pub const EVENT_READY: &str = "ready";
pub const EVENT_UPDATE: &str = "update";
pub const COMMAND_SYNC: &str = "sync";

/// Readiness of the document hosting the SPA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

pub struct CmsBridge {
    rpc: Arc<RpcChannel>,
    subscription: Mutex<Option<Subscription>>,
}

impl CmsBridge {
    pub fn new(rpc: Arc<RpcChannel>) -> Self {
        Self {
            rpc,
            subscription: Mutex::new(None),
        }
    }

    pub fn rpc(&self) -> &Arc<RpcChannel> {
        &self.rpc
    }

    /// Send the `ready` handshake as soon as `readiness` leaves `Loading`.
    ///
    /// Returns `Ok(false)` if the readiness source went away while the
    /// document was still loading.
    pub async fn announce_ready(
        &self,
        mut readiness: watch::Receiver<ReadyState>,
    ) -> Result<bool, RpcError> {
        while *readiness.borrow_and_update() == ReadyState::Loading {
            if readiness.changed().await.is_err() {
                log::debug!("Document never finished loading, skipping handshake");
                return Ok(false);
            }
        }
        log::debug!("Sending ready handshake");
        self.rpc.emit(EVENT_READY, None)?;
        Ok(true)
    }

    /// Route the editor's `update` events into a queue. Replaces an earlier
    /// subscription.
    pub fn subscribe_updates(&self) -> mpsc::UnboundedReceiver<UpdateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.rpc.on(EVENT_UPDATE, move |payload| {
            match serde_json::from_value::<UpdateEvent>(payload.clone()) {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => log::debug!("Dropping malformed update event: {e}"),
            }
        });

        let previous = self.subscription().replace(subscription);
        if let Some(previous) = previous {
            self.rpc.off(previous);
        }
        rx
    }

    pub fn unsubscribe(&self) {
        let current = self.subscription().take();
        if let Some(subscription) = current {
            self.rpc.off(subscription);
        }
    }

    fn subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the editor to re-synchronize its overlays with the rendered page.
    pub async fn sync(&self) -> Result<(), RpcError> {
        self.rpc.call(COMMAND_SYNC, Vec::new()).await.map(|_| ())
    }

    /// Drop the update subscription and release the channel. Idempotent.
    pub fn destroy(&self) {
        self.unsubscribe();
        self.rpc.destroy();
    }
}

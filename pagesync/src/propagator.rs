//! Update propagation.
//!
//! An edit event names a component by id. The propagator re-renders that
//! component on the backend, merges the returned fragment into the page and
//! lets the page's event bus carry it to the matching container item.

use std::sync::Arc;

use pagesync_core::{Page, PageModel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::Api;
use crate::error::SpaError;

/// Payload of the editor's `update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub id: String,
    #[serde(default)]
    pub properties: Value,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// No fetch was made: the id is not on this page, the component has no
    /// self link, or the page was destroyed while the fragment was in flight.
    Ignored,
    /// The fragment was merged; carries the merged model.
    Applied(Arc<PageModel>),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Apply one edit event to `page`.
pub async fn propagate(page: &Page, api: &Api, event: &UpdateEvent) -> Result<UpdateOutcome, SpaError> {
    let Some(component) = page.component_by_id(&event.id) else {
        log::debug!("Ignoring update for {}: not on this page", event.id);
        return Ok(UpdateOutcome::Ignored);
    };
    let Some(url) = component.url(&page.factories().links) else {
        log::debug!("Ignoring update for {}: no self link", event.id);
        return Ok(UpdateOutcome::Ignored);
    };

    let fragment = api.component(&url, &event.properties).await?;
    Ok(match page.apply_update(&fragment) {
        Some(model) => UpdateOutcome::Applied(model),
        None => UpdateOutcome::Ignored,
    })
}

/// Consumes edit events in arrival order.
pub struct UpdatePropagator {
    page: Arc<Page>,
    api: Arc<Api>,
}

impl UpdatePropagator {
    pub fn new(page: Arc<Page>, api: Arc<Api>) -> Self {
        Self { page, api }
    }

    /// Process `events` one at a time until the sender side goes away.
    /// A failed fetch is logged and leaves the page untouched.
    pub fn spawn(self, mut events: mpsc::UnboundedReceiver<UpdateEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match propagate(&self.page, &self.api, &event).await {
                    Ok(UpdateOutcome::Applied(_)) => log::debug!("Applied update for {}", event.id),
                    Ok(UpdateOutcome::Ignored) => {}
                    Err(e) => log::warn!("Update for {} failed: {e}", event.id),
                }
            }
        })
    }
}

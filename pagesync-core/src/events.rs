//! Explicitly owned event bus.
//!
//! Every `Page` owns one bus for page-level events and every component owns
//! one for its own updates. Nothing is process-global, so destroying a page
//! drops exactly its listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::lock::{read, write};
use crate::model::PageModel;
use crate::reference::Reference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub struct EventBus<E> {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Listener<E>)>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        write(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Remove one listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener registered at the time of the call.
    ///
    /// Listeners run outside the lock and may subscribe or unsubscribe.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<Listener<E>> = read(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    pub fn clear(&self) {
        write(&self.listeners).clear();
    }

    pub fn len(&self) -> usize {
        read(&self.listeners).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.listeners).is_empty()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Page-level events.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// A fragment was merged into the page graph. `target` is the fragment's
    /// root, i.e. the node the editor changed.
    Updated {
        model: Arc<PageModel>,
        target: Reference,
    },
}

/// Events a component publishes to its own consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentEvent {
    /// The component adopted a new model and meta-data.
    Updated { id: String },
}

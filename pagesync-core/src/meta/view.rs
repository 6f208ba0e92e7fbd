//! Keeps one entity's meta-data rendered while the entity is updated.

use std::sync::Arc;

use super::host::{MarkerHost, NodeId};
use super::{MetaCollection, MetaDisposer};

/// A consumer's rendering of one entity's meta-data.
///
/// Holds the collection currently rendered around `head..=tail` and swaps it
/// when the entity publishes a new one. Collections are compared by identity,
/// so handing back the same `Arc` does not touch the host.
pub struct MetaView {
    head: NodeId,
    tail: NodeId,
    current: Option<(Arc<MetaCollection>, MetaDisposer)>,
}

impl MetaView {
    pub fn new(head: NodeId, tail: NodeId) -> Self {
        Self {
            head,
            tail,
            current: None,
        }
    }

    /// Render `meta`, replacing the previous rendering. Returns `false` when
    /// `meta` is the collection already rendered.
    pub fn update(&mut self, host: &mut dyn MarkerHost, meta: &Arc<MetaCollection>) -> bool {
        if let Some((rendered, _)) = &self.current {
            if Arc::ptr_eq(rendered, meta) {
                return false;
            }
        }
        self.dispose(host);
        let disposer = meta.render(host, self.head, self.tail);
        self.current = Some((meta.clone(), disposer));
        true
    }

    pub fn current(&self) -> Option<&Arc<MetaCollection>> {
        self.current.as_ref().map(|(meta, _)| meta)
    }

    pub fn dispose(&mut self, host: &mut dyn MarkerHost) {
        if let Some((_, disposer)) = self.current.take() {
            disposer.dispose(host);
        }
    }
}

//! Meta-data brackets.
//!
//! An entity's meta-data is a pair of ordered record lists. Rendering the
//! collection brackets an externally rendered output range with sentinel
//! markers so the editor can find that range again:
//!
//! ```text
//!   <!--begin 1--> <!--begin 2--> [head ... tail] <!--end 1--> <!--end 2-->
//! ```
//!
//! Every `render` call is tracked on its own. Its `MetaDisposer` removes the
//! markers of that call only, so one collection may be rendered by several
//! consumers at once.

pub mod host;
pub mod view;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::ModelError;
use crate::factory::Registry;
use crate::lock::lock;
use crate::model::{MetaModel, MetaModels};

pub use host::{MarkerHost, MemoryDocument, MemoryNode, NodeId};
pub use view::MetaView;

pub const META_TYPE_COMMENT: &str = "comment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaPosition {
    Begin,
    End,
}

/// One resolved meta-data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    meta_type: String,
    data: String,
    position: MetaPosition,
}

impl Meta {
    pub fn new(meta_type: impl Into<String>, data: impl Into<String>, position: MetaPosition) -> Self {
        Self {
            meta_type: meta_type.into(),
            data: data.into(),
            position,
        }
    }

    pub fn meta_type(&self) -> &str {
        &self.meta_type
    }

    /// Opaque payload written into the marker.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn position(&self) -> MetaPosition {
        self.position
    }
}

pub type MetaBuilder = Arc<dyn Fn(&MetaModel, MetaPosition) -> Meta + Send + Sync>;

/// Builds `Meta` records keyed by their `type`. Unknown types are an error.
pub struct MetaFactory {
    registry: Registry<String, MetaBuilder>,
}

impl MetaFactory {
    /// An empty factory with no registered meta types.
    pub fn empty() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn register<F>(&mut self, meta_type: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&MetaModel, MetaPosition) -> Meta + Send + Sync + 'static,
    {
        self.registry.register(meta_type.into(), Arc::new(builder));
        self
    }

    pub fn create(&self, model: &MetaModel, position: MetaPosition) -> Result<Meta, ModelError> {
        let build = self
            .registry
            .get(model.meta_type.as_str())
            .ok_or_else(|| ModelError::UnknownMetaType(model.meta_type.clone()))?;
        Ok(build(model, position))
    }

    pub fn create_collection(&self, models: &MetaModels) -> Result<MetaCollection, ModelError> {
        let begin = models
            .begin
            .iter()
            .map(|model| self.create(model, MetaPosition::Begin))
            .collect::<Result<Vec<_>, _>>()?;
        let end = models
            .end
            .iter()
            .map(|model| self.create(model, MetaPosition::End))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MetaCollection::new(begin, end))
    }
}

impl Default for MetaFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register(META_TYPE_COMMENT, |model, position| {
            Meta::new(META_TYPE_COMMENT, model.data.clone(), position)
        });
        factory
    }
}

#[derive(Debug, Default)]
struct RenderLedger {
    next_render: u64,
    live: BTreeMap<u64, Vec<NodeId>>,
}

/// Begin/end meta-data of one entity.
#[derive(Debug)]
pub struct MetaCollection {
    begin: Vec<Meta>,
    end: Vec<Meta>,
    ledger: Arc<Mutex<RenderLedger>>,
}

impl MetaCollection {
    pub fn new(begin: Vec<Meta>, end: Vec<Meta>) -> Self {
        Self {
            begin,
            end,
            ledger: Arc::new(Mutex::new(RenderLedger::default())),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn begin(&self) -> &[Meta] {
        &self.begin
    }

    pub fn end(&self) -> &[Meta] {
        &self.end
    }

    pub fn is_empty(&self) -> bool {
        self.begin.is_empty() && self.end.is_empty()
    }

    /// Bracket the range `head..=tail` with this collection's markers.
    ///
    /// Begin markers go before `head` in declaration order. End markers go
    /// after `tail`, inserted last-first so they read in declaration order.
    /// A detached `head` or `tail` renders nothing.
    pub fn render(&self, host: &mut dyn MarkerHost, head: NodeId, tail: NodeId) -> MetaDisposer {
        if !host.is_attached(head) || !host.is_attached(tail) {
            return MetaDisposer::noop();
        }

        let mut markers = Vec::with_capacity(self.begin.len() + self.end.len());
        for meta in &self.begin {
            markers.extend(host.insert_before(head, meta.data()));
        }
        for meta in self.end.iter().rev() {
            markers.extend(host.insert_after(tail, meta.data()));
        }

        let mut ledger = lock(&self.ledger);
        let render = ledger.next_render;
        ledger.next_render += 1;
        ledger.live.insert(render, markers);

        MetaDisposer {
            ledger: Some(self.ledger.clone()),
            render,
        }
    }

    /// Remove every marker not yet removed by its own disposer.
    pub fn clear(&self, host: &mut dyn MarkerHost) {
        let live = std::mem::take(&mut lock(&self.ledger).live);
        for marker in live.into_values().flatten() {
            host.remove(marker);
        }
    }

    /// Number of renders whose markers are still in place.
    pub fn live_renders(&self) -> usize {
        lock(&self.ledger).live.len()
    }
}

impl Default for MetaCollection {
    fn default() -> Self {
        Self::empty()
    }
}

/// Cleanup handle of one `MetaCollection::render` call.
#[derive(Debug)]
#[must_use = "dropping a disposer leaves its markers in place until `clear`"]
pub struct MetaDisposer {
    ledger: Option<Arc<Mutex<RenderLedger>>>,
    render: u64,
}

impl MetaDisposer {
    fn noop() -> Self {
        Self {
            ledger: None,
            render: 0,
        }
    }

    /// Remove the markers created by the render call this disposer belongs to.
    pub fn dispose(self, host: &mut dyn MarkerHost) {
        let Some(ledger) = self.ledger else {
            return;
        };
        let markers = lock(&ledger).live.remove(&self.render);
        for marker in markers.into_iter().flatten() {
            host.remove(marker);
        }
    }
}

//! Component entities and the component factory.
//!
//! A component wraps its model, its meta-data bracket and the list of its
//! already-built children. Containers and container items are components
//! with a different `ComponentKind`; the kind is chosen by the builder
//! registered for the node's `type`.

use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::events::{ComponentEvent, EventBus, ListenerId};
use crate::factory::Registry;
use crate::link::{Link, LinkFactory};
use crate::lock::{read, write};
use crate::meta::{MetaCollection, MetaFactory};
use crate::model::{node_id, node_type, ComponentModel, PageModel};
use crate::reference::{resolve, Reference};

pub const TYPE_COMPONENT: &str = "component";
pub const TYPE_CONTAINER: &str = "container";
pub const TYPE_CONTAINER_ITEM: &str = "container-item";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Component,
    Container,
    ContainerItem,
}

/// Markup a container renders around its items, taken from the model's `xtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    Box,
    Inline,
    NoMarkup,
    OrderedList,
    UnorderedList,
}

impl ContainerType {
    pub fn from_xtype(xtype: Option<&str>) -> Self {
        match xtype.map(str::to_ascii_lowercase).as_deref() {
            Some("hst.span") => Self::Inline,
            Some("hst.nomarkup") => Self::NoMarkup,
            Some("hst.orderedlist") => Self::OrderedList,
            Some("hst.unorderedlist") => Self::UnorderedList,
            _ => Self::Box,
        }
    }
}

pub struct Component {
    id: String,
    kind: ComponentKind,
    model: RwLock<Arc<ComponentModel>>,
    meta: RwLock<Arc<MetaCollection>>,
    children: Vec<Arc<Component>>,
    events: EventBus<ComponentEvent>,
}

impl Component {
    pub fn new(
        kind: ComponentKind,
        model: ComponentModel,
        meta: MetaCollection,
        children: Vec<Arc<Component>>,
    ) -> Self {
        Self {
            id: model.id.clone(),
            kind,
            model: RwLock::new(Arc::new(model)),
            meta: RwLock::new(Arc::new(meta)),
            children,
            events: EventBus::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Current model snapshot.
    pub fn model(&self) -> Arc<ComponentModel> {
        read(&self.model).clone()
    }

    pub fn name(&self) -> Option<String> {
        read(&self.model).name.clone()
    }

    pub fn label(&self) -> Option<String> {
        read(&self.model).label.clone()
    }

    pub fn models(&self) -> Map<String, Value> {
        read(&self.model).models.clone()
    }

    /// One entry of the component's `models` map.
    pub fn model_value(&self, name: &str) -> Option<Value> {
        read(&self.model).models.get(name).cloned()
    }

    pub fn parameters(&self) -> Map<String, Value> {
        read(&self.model).meta.params.clone()
    }

    pub fn properties(&self) -> Map<String, Value> {
        read(&self.model).meta.params_info.clone()
    }

    /// Current meta-data bracket. A new `Arc` is published on every update.
    pub fn meta(&self) -> Arc<MetaCollection> {
        read(&self.meta).clone()
    }

    pub fn self_link(&self) -> Option<Link> {
        read(&self.model).links.self_link.clone()
    }

    pub fn url(&self, links: &LinkFactory) -> Option<String> {
        links.create(&self.self_link()?)
    }

    pub fn children(&self) -> &[Arc<Component>] {
        &self.children
    }

    /// Follow `path` through child names. An empty path yields `self`.
    pub fn component(self: &Arc<Self>, path: &[&str]) -> Option<Arc<Component>> {
        path.iter().try_fold(self.clone(), |current, name| {
            current
                .children
                .iter()
                .find(|child| child.name().as_deref() == Some(*name))
                .cloned()
        })
    }

    /// Depth-first search for the component with `id`, `self` included.
    pub fn component_by_id(self: &Arc<Self>, id: &str) -> Option<Arc<Component>> {
        let mut stack = vec![self.clone()];
        while let Some(component) = stack.pop() {
            if component.id == id {
                return Some(component);
            }
            stack.extend(component.children.iter().rev().cloned());
        }
        None
    }

    /// Visit `self` and every descendant, parents first.
    pub fn walk(self: &Arc<Self>, visit: &mut dyn FnMut(&Arc<Component>)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn container_type(&self) -> Option<ContainerType> {
        match self.kind {
            ComponentKind::Container => {
                Some(ContainerType::from_xtype(read(&self.model).xtype.as_deref()))
            }
            _ => None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.kind == ComponentKind::ContainerItem && read(&self.model).meta.hidden
    }

    /// The catalog type of a container item (its label).
    pub fn item_type(&self) -> Option<String> {
        match self.kind {
            ComponentKind::ContainerItem => self.label(),
            _ => None,
        }
    }

    pub fn on_update<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ComponentEvent) + Send + Sync + 'static,
    {
        self.events.on(listener)
    }

    pub fn off_update(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn clear_listeners(&self) {
        self.events.clear();
    }

    /// Adopt the node `target` points at if it carries this component's id.
    ///
    /// Returns `Ok(false)` when the update is for another entity.
    pub(crate) fn apply_update(
        &self,
        model: &PageModel,
        target: &Reference,
        meta_factory: &MetaFactory,
    ) -> Result<bool, ModelError> {
        let Some(node) = resolve(model, target) else {
            return Ok(false);
        };
        if node_id(node) != Some(self.id.as_str()) {
            return Ok(false);
        }

        let updated: ComponentModel =
            serde_json::from_value(node.clone()).map_err(|source| ModelError::InvalidModel {
                id: self.id.clone(),
                source,
            })?;
        let meta = meta_factory.create_collection(&updated.meta.markers)?;

        *write(&self.model) = Arc::new(updated);
        *write(&self.meta) = Arc::new(meta);
        self.events.emit(&ComponentEvent::Updated {
            id: self.id.clone(),
        });
        Ok(true)
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name())
            .field("children", &self.children.len())
            .finish()
    }
}

pub type ComponentBuilder = Arc<
    dyn Fn(ComponentModel, Vec<Arc<Component>>, &MetaFactory) -> Result<Component, ModelError>
        + Send
        + Sync,
>;

/// Builds components keyed by node `type`. Unknown types are an error.
pub struct ComponentFactory {
    registry: Registry<String, ComponentBuilder>,
}

impl ComponentFactory {
    /// An empty factory with no registered component types.
    pub fn empty() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn register<F>(&mut self, component_type: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(ComponentModel, Vec<Arc<Component>>, &MetaFactory) -> Result<Component, ModelError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(component_type.into(), Arc::new(builder));
        self
    }

    pub fn is_registered(&self, component_type: &str) -> bool {
        self.registry.contains(component_type)
    }

    /// Build the entity for `node` from its already-built `children`.
    pub fn create(
        &self,
        node: &Value,
        children: Vec<Arc<Component>>,
        meta_factory: &MetaFactory,
    ) -> Result<Arc<Component>, ModelError> {
        let component_type = node_type(node).unwrap_or_default();
        let build = self
            .registry
            .get(component_type)
            .ok_or_else(|| ModelError::UnknownComponentType(component_type.to_string()))?;

        let model: ComponentModel =
            serde_json::from_value(node.clone()).map_err(|source| ModelError::InvalidModel {
                id: node_id(node).unwrap_or_default().to_string(),
                source,
            })?;
        build(model, children, meta_factory).map(Arc::new)
    }
}

fn builder_for(
    kind: ComponentKind,
) -> impl Fn(ComponentModel, Vec<Arc<Component>>, &MetaFactory) -> Result<Component, ModelError>
       + Send
       + Sync
       + 'static {
    move |model, children, meta_factory| {
        let meta = meta_factory.create_collection(&model.meta.markers)?;
        Ok(Component::new(kind, model, meta, children))
    }
}

impl Default for ComponentFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory
            .register(TYPE_COMPONENT, builder_for(ComponentKind::Component))
            .register(TYPE_CONTAINER, builder_for(ComponentKind::Container))
            .register(TYPE_CONTAINER_ITEM, builder_for(ComponentKind::ContainerItem));
        factory
    }
}

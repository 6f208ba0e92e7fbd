//! # pagesync-core: Page model, component tree and meta-data brackets
//!
//! Turns the flat, reference-based page model a content backend delivers into
//! a typed component tree, and keeps that tree in step with fragment updates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  resolve   ┌──────────────┐  fold (leaves first)  ┌──────────────┐
//! │ PageModel    │ ─────────► │ TreeBuilder  │ ────────────────────► │ Component    │
//! │ (flat graph) │            │ + factories  │                       │ tree (Arc)   │
//! └──────┬───────┘            └──────────────┘                       └──────┬───────┘
//!        │ merge(fragment)                                                  │
//!        ▼                                                                  ▼
//! ┌──────────────┐   PageEvent::Updated   ┌──────────────┐   render   ┌──────────────┐
//! │ Page         │ ─────────────────────► │ ContainerItem│ ─────────► │ MetaCollection│
//! │ (aggregate)  │      (EventBus)        │ listeners    │            │ + MarkerHost │
//! └──────────────┘                        └──────────────┘            └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`reference`]: `$ref` pointers and total resolution
//! - [`model`]: serde models of the page model document
//! - [`factory`]: the type-keyed registry every factory is built on
//! - [`component`]: component entities and their factory
//! - [`content`]: documents, menus, image sets and pagination
//! - [`link`]: link-to-URL factory
//! - [`button`]: edit button brackets
//! - [`meta`]: meta-data brackets around rendered output
//! - [`tree`]: bottom-up component tree builder
//! - [`events`]: per-page event bus
//! - [`page`]: the page aggregate

pub mod button;
pub mod component;
pub mod content;
pub mod error;
pub mod events;
pub mod factory;
pub mod link;
pub mod meta;
pub mod model;
pub mod page;
pub mod reference;
pub mod tree;

mod lock;

// Re-exports for convenience
pub use button::{ButtonFactory, BUTTON_EDIT_MENU, BUTTON_MANAGE_CONTENT};
pub use component::{
    Component, ComponentFactory, ComponentKind, ContainerType, TYPE_COMPONENT, TYPE_CONTAINER,
    TYPE_CONTAINER_ITEM,
};
pub use content::{Content, ContentFactory, Document, ImageSet, Menu, MenuItem, Pagination};
pub use error::ModelError;
pub use events::{ComponentEvent, EventBus, ListenerId, PageEvent};
pub use factory::Registry;
pub use link::{Link, LinkFactory, LinkType};
pub use meta::host::{MarkerHost, MemoryDocument, MemoryNode, NodeId};
pub use meta::view::MetaView;
pub use meta::{Meta, MetaCollection, MetaDisposer, MetaFactory, MetaPosition};
pub use model::{ComponentModel, MetaModel, MetaModels, PageMeta, PageModel};
pub use page::{Factories, Page};
pub use reference::{is_reference, resolve, Reference};
pub use tree::TreeBuilder;

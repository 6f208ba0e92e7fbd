//! The page aggregate.
//!
//! A `Page` owns the current model snapshot, the component tree built from
//! it, a content cache and the page-level event bus. Container items listen
//! on that bus and adopt their node when an update targets them.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::button::ButtonFactory;
use crate::component::{Component, ComponentFactory, ComponentKind};
use crate::content::{Content, ContentFactory, Document};
use crate::error::ModelError;
use crate::events::{EventBus, ListenerId, PageEvent};
use crate::link::{Link, LinkFactory};
use crate::lock::{read, write};
use crate::meta::{MetaCollection, MetaFactory};
use crate::model::{MetaModels, PageModel, Visit, Visitor};
use crate::reference::{resolve, Reference};
use crate::tree::TreeBuilder;

/// Every registry a page builds entities with.
#[derive(Default)]
pub struct Factories {
    pub components: ComponentFactory,
    pub content: ContentFactory,
    pub meta: MetaFactory,
    pub links: LinkFactory,
    pub buttons: ButtonFactory,
}

pub struct Page {
    model: RwLock<Arc<PageModel>>,
    root: Arc<Component>,
    content: RwLock<HashMap<String, Arc<Content>>>,
    events: Arc<EventBus<PageEvent>>,
    factories: Arc<Factories>,
    destroyed: AtomicBool,
}

impl Page {
    pub fn new(model: PageModel, factories: Arc<Factories>) -> Result<Self, ModelError> {
        let root = TreeBuilder::new(&factories.components, &factories.meta).build(&model)?;
        let events = Arc::new(EventBus::new());

        let subscribed = subscribe_items(&root, &events, &factories);
        log::debug!(
            "Page built from {}: {} container item(s) subscribed",
            model.root,
            subscribed
        );

        Ok(Self {
            model: RwLock::new(Arc::new(model)),
            root,
            content: RwLock::new(HashMap::new()),
            events,
            factories,
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn from_value(value: Value, factories: Arc<Factories>) -> Result<Self, ModelError> {
        Self::new(serde_json::from_value(value)?, factories)
    }

    /// Current model snapshot.
    pub fn model(&self) -> Arc<PageModel> {
        read(&self.model).clone()
    }

    pub fn root(&self) -> &Arc<Component> {
        &self.root
    }

    pub fn factories(&self) -> &Arc<Factories> {
        &self.factories
    }

    pub fn events(&self) -> &EventBus<PageEvent> {
        &self.events
    }

    /// Component at a name path below the root. An empty path yields the root.
    pub fn component(&self, path: &[&str]) -> Option<Arc<Component>> {
        self.root.component(path)
    }

    pub fn component_by_id(&self, id: &str) -> Option<Arc<Component>> {
        self.root.component_by_id(id)
    }

    /// Content entity behind `reference`, decoded once and cached by pointer.
    pub fn content(&self, reference: &Reference) -> Option<Arc<Content>> {
        if let Some(content) = read(&self.content).get(&reference.pointer) {
            return Some(content.clone());
        }

        let model = self.model();
        let node = resolve(&model, reference)?;
        let content = Arc::new(self.factories.content.create(node));
        let mut cache = write(&self.content);
        Some(cache.entry(reference.pointer.clone()).or_insert(content).clone())
    }

    /// The main document of a detail page.
    pub fn document(&self) -> Option<Document> {
        let reference = self.model().document.clone()?;
        self.content(&reference)?.as_document().cloned()
    }

    pub fn title(&self) -> Option<String> {
        self.root.model().meta.page_title.clone()
    }

    pub fn is_preview(&self) -> bool {
        self.model().meta.preview
    }

    pub fn version(&self) -> Option<String> {
        self.model().meta.version.clone()
    }

    pub fn visitor(&self) -> Option<Visitor> {
        self.model().meta.visitor.clone()
    }

    pub fn visit(&self) -> Option<Visit> {
        self.model().meta.visit.clone()
    }

    /// Resolve a link through the page's link factory.
    pub fn url(&self, link: &Link) -> Option<String> {
        self.factories.links.create(link)
    }

    /// The page's own site URL.
    pub fn site_url(&self) -> Option<String> {
        let link = self.model().links.site.clone()?;
        self.url(&link)
    }

    pub fn meta(&self, models: &MetaModels) -> Result<Arc<MetaCollection>, ModelError> {
        self.factories.meta.create_collection(models).map(Arc::new)
    }

    /// Meta-data bracket of an edit button.
    pub fn button(&self, button_type: &str, params: &Value) -> Result<Arc<MetaCollection>, ModelError> {
        let models = self.factories.buttons.create(button_type, params)?;
        self.meta(&models)
    }

    pub fn to_json(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(&*self.model())?)
    }

    /// Merge `fragment` into the model and announce it on the event bus.
    ///
    /// The fragment's root is the node that changed. Cached content for every
    /// merged node is dropped. Returns `None` once the page is destroyed.
    pub fn apply_update(&self, fragment: &PageModel) -> Option<Arc<PageModel>> {
        if self.is_destroyed() {
            log::debug!("Update for {} arrived after destroy, ignoring", fragment.root);
            return None;
        }

        let merged = {
            let mut current = write(&self.model);
            let mut next = PageModel::clone(&current);
            let ids = next.merge(fragment);
            self.invalidate(&ids, fragment);
            let next = Arc::new(next);
            *current = next.clone();
            next
        };

        self.events.emit(&PageEvent::Updated {
            model: merged.clone(),
            target: fragment.root.clone(),
        });
        Some(merged)
    }

    fn invalidate(&self, ids: &[String], fragment: &PageModel) {
        let mut stale: HashSet<Reference> = ids.iter().map(|id| Reference::page(id)).collect();
        if let Some(content) = &fragment.content {
            stale.extend(content.keys().map(|alias| Reference::content(alias)));
        }

        write(&self.content).retain(|pointer, _| {
            !stale.iter().any(|reference| {
                pointer == &reference.pointer
                    || pointer
                        .strip_prefix(reference.pointer.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
        });
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PageEvent) + Send + Sync + 'static,
    {
        self.events.on(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Drop every listener of the page and its components. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.events.clear();
        self.root.walk(&mut |component| component.clear_listeners());
        write(&self.content).clear();
        log::info!("Page {} destroyed", read(&self.model).root);
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("root", &self.root)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Subscribe every distinct container item to `events`. Shared items are
/// subscribed once.
fn subscribe_items(
    root: &Arc<Component>,
    events: &Arc<EventBus<PageEvent>>,
    factories: &Arc<Factories>,
) -> usize {
    let mut seen: HashSet<*const Component> = HashSet::new();
    root.walk(&mut |component| {
        if component.kind() != ComponentKind::ContainerItem || !seen.insert(Arc::as_ptr(component)) {
            return;
        }

        let item = Arc::downgrade(component);
        let factories = factories.clone();
        events.on(move |event| {
            let PageEvent::Updated { model, target } = event;
            let Some(item) = item.upgrade() else {
                return;
            };
            if let Err(e) = item.apply_update(model, target, &factories.meta) {
                log::warn!("Container item {} rejected its update: {e}", item.id());
            }
        });
    });
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn sample() -> Value {
        json!({
            "root": { "$ref": "/page/root" },
            "document": { "$ref": "/page/doc" },
            "page": {
                "root": {
                    "id": "root", "type": "component", "name": "root",
                    "meta": { "pageTitle": "Home" },
                    "children": [{ "$ref": "/page/main" }]
                },
                "main": {
                    "id": "main", "type": "container", "name": "main",
                    "children": [{ "$ref": "/page/banner" }, { "$ref": "/page/banner1" }]
                },
                "banner": {
                    "id": "banner", "type": "container-item", "name": "banner",
                    "label": "Banner",
                    "links": { "self": { "href": "http://cms/banner", "type": "external" } }
                },
                "banner1": {
                    "id": "banner1", "type": "container-item", "name": "banner1",
                    "label": "Banner"
                },
                "doc": {
                    "id": "doc", "type": "document",
                    "data": { "name": "home", "displayName": "Home" }
                }
            },
            "meta": { "version": "1.0", "preview": true,
                      "visitor": { "id": "v", "header": "visitor-header", "new": true } },
            "links": { "site": { "href": "/home", "type": "internal" } }
        })
    }

    fn page() -> Page {
        Page::from_value(sample(), Arc::new(Factories::default())).unwrap()
    }

    fn fragment(id: &str, label: &str) -> PageModel {
        serde_json::from_value(json!({
            "root": { "$ref": format!("/page/{id}") },
            "page": {
                id: { "id": id, "type": "container-item", "name": id, "label": label,
                      "meta": { "begin": [{ "type": "comment", "data": label }] } }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_page_accessors() {
        let page = page();
        assert_eq!(page.title().as_deref(), Some("Home"));
        assert!(page.is_preview());
        assert_eq!(page.version().as_deref(), Some("1.0"));
        assert_eq!(page.visitor().unwrap().header, "visitor-header");
        assert!(page.visit().is_none());
        assert_eq!(page.site_url().as_deref(), Some("/home"));
        assert_eq!(page.document().unwrap().display_name(), "Home");
        assert_eq!(page.component(&["main", "banner1"]).unwrap().id(), "banner1");
        assert_eq!(page.to_json().unwrap()["meta"]["version"], "1.0");
    }

    #[test]
    fn test_content_is_cached() {
        let page = page();
        let first = page.content(&Reference::page("doc")).unwrap();
        let second = page.content(&Reference::page("doc")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(page.content(&Reference::page("missing")).is_none());
    }

    #[test]
    fn test_update_reaches_only_matching_item() {
        let page = page();
        let banner = page.component_by_id("banner").unwrap();
        let banner1 = page.component_by_id("banner1").unwrap();
        let banner1_meta = banner1.meta();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        banner.on_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let merged = page.apply_update(&fragment("banner", "updated")).unwrap();

        assert_eq!(merged.page["banner"]["label"], "updated");
        assert_eq!(banner.label().as_deref(), Some("updated"));
        assert_eq!(banner.meta().begin()[0].data(), "updated");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(banner1.label().as_deref(), Some("Banner"));
        assert!(Arc::ptr_eq(&banner1_meta, &banner1.meta()));
    }

    #[test]
    fn test_update_invalidates_cached_content() {
        let page = page();
        let before = page.content(&Reference::page("doc")).unwrap();

        let fragment: PageModel = serde_json::from_value(json!({
            "root": { "$ref": "/page/doc" },
            "page": { "doc": { "id": "doc", "type": "document",
                               "data": { "name": "home", "displayName": "Welcome" } } }
        }))
        .unwrap();
        page.apply_update(&fragment).unwrap();

        let after = page.content(&Reference::page("doc")).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.as_document().unwrap().display_name(), "Welcome");
    }

    #[test]
    fn test_page_event_carries_merged_model() {
        let page = page();
        let seen = Arc::new(RwLock::new(None));
        let sink = seen.clone();
        page.subscribe(move |event| {
            let PageEvent::Updated { model, target } = event;
            *sink.write().unwrap() = Some((model.page["banner1"]["label"].clone(), target.clone()));
        });

        page.apply_update(&fragment("banner1", "fresh"));

        let (label, target) = seen.read().unwrap().clone().unwrap();
        assert_eq!(label, "fresh");
        assert_eq!(target, Reference::page("banner1"));
    }

    #[test]
    fn test_destroy_is_idempotent_and_silences_updates() {
        let page = page();
        let banner = page.component_by_id("banner").unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        banner.on_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        page.destroy();
        page.destroy();

        assert!(page.is_destroyed());
        assert!(page.events().is_empty());
        assert!(page.apply_update(&fragment("banner", "late")).is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(banner.label().as_deref(), Some("Banner"));
    }

    #[test]
    fn test_button_bracket() {
        let page = page();
        let meta = page.button("manage-content", &json!({ "id": "doc" })).unwrap();
        assert_eq!(meta.begin().len(), 1);
        assert_eq!(meta.end().len(), 1);
        assert!(page.button("nope", &Value::Null).is_err());
    }
}

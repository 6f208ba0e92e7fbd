//! Content entities and the content factory.
//!
//! Content kinds are open-ended. A node whose `type` has no registered
//! builder, or whose shape the builder rejects, is handed back unchanged as
//! `Content::Unstructured`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::factory::Registry;
use crate::link::{Link, LinkFactory};
use crate::model::{node_type, MetaModels};

pub const TYPE_DOCUMENT: &str = "document";
pub const TYPE_MENU: &str = "menu";
pub const TYPE_IMAGE_SET: &str = "imageset";
pub const TYPE_IMAGE_SET_ALIAS: &str = "image-set";
pub const TYPE_PAGINATION: &str = "pagination";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Link>,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<Link>,
}

// ---------------------------------------------------------------
// Document
// ---------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub id: String,
    #[serde(default)]
    pub data: DocumentData,
    #[serde(default)]
    pub links: ContentLinks,
    #[serde(default)]
    pub meta: MetaModels,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "localeString", default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Document-type specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    model: DocumentModel,
}

impl Document {
    pub fn new(model: DocumentModel) -> Self {
        Self { model }
    }

    pub fn id(&self) -> &str {
        &self.model.id
    }

    pub fn name(&self) -> &str {
        &self.model.data.name
    }

    pub fn display_name(&self) -> &str {
        &self.model.data.display_name
    }

    pub fn locale(&self) -> Option<&str> {
        self.model.data.locale.as_deref()
    }

    pub fn data(&self) -> &DocumentData {
        &self.model.data
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.model.data.fields.get(name)
    }

    pub fn url(&self, links: &LinkFactory) -> Option<String> {
        links.create(self.model.links.site.as_ref()?)
    }

    pub fn meta_models(&self) -> &MetaModels {
        &self.model.meta
    }
}

// ---------------------------------------------------------------
// Menu
// ---------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub data: MenuData,
    #[serde(default)]
    pub meta: MetaModels,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub site_menu_items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub links: ContentLinks,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub child_menu_items: Vec<MenuItem>,
}

impl MenuItem {
    pub fn url(&self, links: &LinkFactory) -> Option<String> {
        links.create(self.links.site.as_ref()?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    model: MenuModel,
}

impl Menu {
    pub fn new(model: MenuModel) -> Self {
        Self { model }
    }

    pub fn id(&self) -> &str {
        &self.model.id
    }

    pub fn name(&self) -> &str {
        &self.model.data.name
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.model.data.site_menu_items
    }

    /// The deepest selected item.
    pub fn selected(&self) -> Option<&MenuItem> {
        fn find(items: &[MenuItem]) -> Option<&MenuItem> {
            let item = items.iter().find(|item| item.selected)?;
            find(&item.child_menu_items).or(Some(item))
        }
        find(self.items())
    }

    pub fn meta_models(&self) -> &MetaModels {
        &self.model.meta
    }
}

// ---------------------------------------------------------------
// Image set
// ---------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub links: ContentLinks,
}

impl Image {
    pub fn url(&self, links: &LinkFactory) -> Option<String> {
        links.create(self.links.site.as_ref()?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSetData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original: Option<Image>,
    #[serde(default)]
    pub thumbnail: Option<Image>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSetModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub data: ImageSetData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSet {
    model: ImageSetModel,
}

impl ImageSet {
    pub fn new(model: ImageSetModel) -> Self {
        Self { model }
    }

    pub fn id(&self) -> &str {
        &self.model.id
    }

    pub fn name(&self) -> &str {
        &self.model.data.name
    }

    pub fn description(&self) -> Option<&str> {
        self.model.data.description.as_deref()
    }

    pub fn original(&self) -> Option<&Image> {
        self.model.data.original.as_ref()
    }

    pub fn thumbnail(&self) -> Option<&Image> {
        self.model.data.thumbnail.as_ref()
    }
}

// ---------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationItem {
    pub number: u64,
    #[serde(default)]
    pub links: ContentLinks,
}

impl PaginationItem {
    pub fn url(&self, links: &LinkFactory) -> Option<String> {
        links.create(self.links.site.as_ref().or(self.links.self_link.as_ref())?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationModel {
    #[serde(default)]
    pub current: PaginationItem,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub first: Option<PaginationItem>,
    #[serde(default)]
    pub last: Option<PaginationItem>,
    #[serde(default)]
    pub next: Option<PaginationItem>,
    #[serde(default)]
    pub previous: Option<PaginationItem>,
    #[serde(default)]
    pub items: Vec<PaginationItem>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    model: PaginationModel,
}

impl Pagination {
    pub fn new(model: PaginationModel) -> Self {
        Self { model }
    }

    pub fn current(&self) -> &PaginationItem {
        &self.model.current
    }

    pub fn is_enabled(&self) -> bool {
        self.model.enabled
    }

    pub fn items(&self) -> &[PaginationItem] {
        &self.model.items
    }

    pub fn first(&self) -> Option<&PaginationItem> {
        self.model.first.as_ref()
    }

    pub fn last(&self) -> Option<&PaginationItem> {
        self.model.last.as_ref()
    }

    pub fn next(&self) -> Option<&PaginationItem> {
        self.model.next.as_ref()
    }

    pub fn previous(&self) -> Option<&PaginationItem> {
        self.model.previous.as_ref()
    }

    pub fn offset(&self) -> u64 {
        self.model.offset
    }

    pub fn size(&self) -> u64 {
        self.model.size
    }

    pub fn total(&self) -> u64 {
        self.model.total
    }
}

// ---------------------------------------------------------------
// Factory
// ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Document(Document),
    Menu(Menu),
    ImageSet(ImageSet),
    Pagination(Pagination),
    /// A node of a type without a registered builder, as delivered.
    Unstructured(Value),
}

impl Content {
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Content::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn as_menu(&self) -> Option<&Menu> {
        match self {
            Content::Menu(menu) => Some(menu),
            _ => None,
        }
    }

    pub fn as_image_set(&self) -> Option<&ImageSet> {
        match self {
            Content::ImageSet(image_set) => Some(image_set),
            _ => None,
        }
    }

    pub fn as_pagination(&self) -> Option<&Pagination> {
        match self {
            Content::Pagination(pagination) => Some(pagination),
            _ => None,
        }
    }

    /// Meta-data records of content kinds that carry them.
    pub fn meta_models(&self) -> Option<&MetaModels> {
        match self {
            Content::Document(document) => Some(document.meta_models()),
            Content::Menu(menu) => Some(menu.meta_models()),
            _ => None,
        }
    }
}

pub type ContentBuilder = Arc<dyn Fn(&Value) -> Result<Content, serde_json::Error> + Send + Sync>;

pub struct ContentFactory {
    registry: Registry<String, ContentBuilder>,
}

impl ContentFactory {
    /// An empty factory: every node comes back unstructured.
    pub fn empty() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn register<F>(&mut self, content_type: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Content, serde_json::Error> + Send + Sync + 'static,
    {
        self.registry.register(content_type.into(), Arc::new(builder));
        self
    }

    pub fn create(&self, node: &Value) -> Content {
        let Some(build) = node_type(node).and_then(|t| self.registry.get(t)) else {
            return Content::Unstructured(node.clone());
        };
        match build(node) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("Content does not match its declared type, keeping it raw: {e}");
                Content::Unstructured(node.clone())
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(node: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(node)
}

impl Default for ContentFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory
            .register(TYPE_DOCUMENT, |node| decode(node).map(|m| Content::Document(Document::new(m))))
            .register(TYPE_MENU, |node| decode(node).map(|m| Content::Menu(Menu::new(m))))
            .register(TYPE_IMAGE_SET, |node| decode(node).map(|m| Content::ImageSet(ImageSet::new(m))))
            .register(TYPE_IMAGE_SET_ALIAS, |node| {
                decode(node).map(|m| Content::ImageSet(ImageSet::new(m)))
            })
            .register(TYPE_PAGINATION, |node| {
                decode(node).map(|m| Content::Pagination(Pagination::new(m)))
            });
        factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkType;
    use serde_json::json;

    #[test]
    fn test_document() {
        let content = ContentFactory::default().create(&json!({
            "id": "doc",
            "type": "document",
            "data": {
                "name": "about",
                "displayName": "About us",
                "localeString": "en",
                "title": "Hello"
            },
            "links": { "site": { "href": "/about", "type": "internal" } },
            "meta": { "begin": [{ "type": "comment", "data": "d" }] }
        }));

        let document = content.as_document().unwrap();
        assert_eq!(document.id(), "doc");
        assert_eq!(document.name(), "about");
        assert_eq!(document.display_name(), "About us");
        assert_eq!(document.locale(), Some("en"));
        assert_eq!(document.field("title").unwrap(), "Hello");
        assert_eq!(document.url(&LinkFactory::new()).as_deref(), Some("/about"));
        assert_eq!(content.meta_models().unwrap().begin.len(), 1);
    }

    #[test]
    fn test_menu_selected_is_deepest() {
        let content = ContentFactory::default().create(&json!({
            "id": "menu",
            "type": "menu",
            "data": {
                "name": "main",
                "siteMenuItems": [
                    { "name": "home" },
                    {
                        "name": "news",
                        "selected": true,
                        "childMenuItems": [
                            { "name": "2024" },
                            { "name": "2025", "selected": true,
                              "links": { "site": { "href": "/news/2025", "type": "internal" } } }
                        ]
                    }
                ]
            }
        }));

        let menu = content.as_menu().unwrap();
        assert_eq!(menu.name(), "main");
        assert_eq!(menu.items().len(), 2);
        let selected = menu.selected().unwrap();
        assert_eq!(selected.name, "2025");
        assert_eq!(selected.url(&LinkFactory::new()).as_deref(), Some("/news/2025"));
    }

    #[test]
    fn test_image_set_aliases() {
        let factory = ContentFactory::default();
        for content_type in ["imageset", "image-set"] {
            let content = factory.create(&json!({
                "id": "img",
                "type": content_type,
                "data": {
                    "name": "logo.png",
                    "original": { "name": "original", "width": 640,
                                  "links": { "site": { "href": "/binaries/logo.png", "type": "resource" } } }
                }
            }));
            let image_set = content.as_image_set().unwrap();
            let original = image_set.original().unwrap();
            assert_eq!(original.width, Some(640));
            assert!(image_set.thumbnail().is_none());

            let mut links = LinkFactory::new();
            links.register(LinkType::Resource, |href| format!("https://cdn.example{href}"));
            assert_eq!(
                original.url(&links).as_deref(),
                Some("https://cdn.example/binaries/logo.png")
            );
        }
    }

    #[test]
    fn test_pagination() {
        let content = ContentFactory::default().create(&json!({
            "type": "pagination",
            "current": { "number": 2 },
            "enabled": true,
            "items": [{ "number": 1 }, { "number": 2 }, { "number": 3 }],
            "next": { "number": 3, "links": { "self": { "href": "/list?page=3" } } },
            "offset": 10,
            "size": 10,
            "total": 30
        }));

        let pagination = content.as_pagination().unwrap();
        assert!(pagination.is_enabled());
        assert_eq!(pagination.current().number, 2);
        assert_eq!(pagination.items().len(), 3);
        assert_eq!(
            pagination.next().unwrap().url(&LinkFactory::new()).as_deref(),
            Some("/list?page=3")
        );
        assert!(pagination.previous().is_none());
        assert_eq!(pagination.total(), 30);
    }

    #[test]
    fn test_unknown_type_returns_raw_model() {
        let node = json!({ "id": "x", "type": "banner", "data": { "title": "t" } });
        assert_eq!(ContentFactory::default().create(&node), Content::Unstructured(node));
    }

    #[test]
    fn test_malformed_known_type_returns_raw_model() {
        let node = json!({ "id": "x", "type": "document", "data": { "name": 5 } });
        assert_eq!(ContentFactory::default().create(&node), Content::Unstructured(node));
    }
}

//! Serde models of the page model document delivered by the content backend.
//!
//! ```text
//! {
//!   root:     { $ref: "/page/<id>" },
//!   page:     { <id>: ModelNode, ... },
//!   content?: { <alias>: ModelNode, ... },
//!   meta:     { version?, preview?, visitor?, visit? },
//!   links:    { self, site }
//! }
//! ```
//!
//! Graph nodes stay as raw JSON values. Each factory decodes the node shape it
//! understands, so unknown node kinds travel through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::link::Link;
use crate::reference::Reference;

/// The page model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageModel {
    pub root: Reference,
    #[serde(default)]
    pub page: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Map<String, Value>>,
    #[serde(default)]
    pub meta: PageMeta,
    #[serde(default)]
    pub links: PageLinks,
    /// Main content document of a detail page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Reference>,
}

impl PageModel {
    /// Shallow merge of `fragment` into this model.
    ///
    /// Every node of the fragment's `page` section overwrites the node with
    /// the same id. Returns the ids that were written.
    pub fn merge(&mut self, fragment: &PageModel) -> Vec<String> {
        let mut ids = Vec::with_capacity(fragment.page.len());
        for (id, node) in &fragment.page {
            self.page.insert(id.clone(), node.clone());
            ids.push(id.clone());
        }
        if let Some(content) = &fragment.content {
            let target = self.content.get_or_insert_with(Map::new);
            for (alias, node) in content {
                target.insert(alias.clone(), node.clone());
            }
        }
        ids
    }
}

/// Page-level meta data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Set when the page is rendered inside the editor.
    #[serde(default)]
    pub preview: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor: Option<Visitor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit: Option<Visit>,
}

/// Visitor token issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    pub id: String,
    /// Header name the token is sent back in.
    pub header: String,
    #[serde(default)]
    pub new: bool,
}

/// Visit token issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: String,
    #[serde(default)]
    pub new: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Link>,
}

/// One `{ type, data }` meta-data record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaModel {
    #[serde(rename = "type")]
    pub meta_type: String,
    pub data: String,
}

impl MetaModel {
    pub fn comment(data: impl Into<String>) -> Self {
        Self {
            meta_type: "comment".to_string(),
            data: data.into(),
        }
    }
}

/// Ordered begin/end meta-data records of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaModels {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub begin: Vec<MetaModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub end: Vec<MetaModel>,
}

/// Model of a `component`, `container` or `container-item` node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentModel {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xtype: Option<String>,
    #[serde(default)]
    pub meta: ComponentMeta,
    #[serde(default)]
    pub links: ComponentLinks,
    #[serde(default)]
    pub models: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMeta {
    #[serde(flatten)]
    pub markers: MetaModels,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub params_info: Map<String, Value>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentLinks {
    /// Endpoint re-rendering just this component.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<Link>,
}

/// The `type` discriminator of a raw node.
pub fn node_type(node: &Value) -> Option<&str> {
    node.get("type")?.as_str()
}

/// The `id` of a raw node.
pub fn node_id(node: &Value) -> Option<&str> {
    node.get("id")?.as_str()
}

/// References held in a node's `children` array. Non-reference entries are skipped.
pub fn child_references(node: &Value) -> Vec<Reference> {
    node.get("children")
        .and_then(Value::as_array)
        .map(|children| children.iter().filter_map(Reference::from_value).collect())
        .unwrap_or_default()
}

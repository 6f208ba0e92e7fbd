//! Reference resolution against the flat page model.
//!
//! Nodes never embed each other; they point at one another with
//! `{ "$ref": "/page/<id>" }` values. A reference is a JSON pointer into the
//! page model document, so `/content/<alias>` and deeper pointers such as
//! `/page/<id>/models/document` resolve the same way.
//!
//! Resolution is total: a pointer to a missing id, a malformed pointer or an
//! out-of-range array index all produce `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::PageModel;

const PAGE_SECTION: &str = "page";
const CONTENT_SECTION: &str = "content";

/// A pointer to another node of the page model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub pointer: String,
}

impl Reference {
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }

    /// Reference to a node of the `page` section.
    pub fn page(id: &str) -> Self {
        Self::new(format!("/{PAGE_SECTION}/{}", escape(id)))
    }

    /// Reference to an entry of the legacy `content` section.
    pub fn content(alias: &str) -> Self {
        Self::new(format!("/{CONTENT_SECTION}/{}", escape(alias)))
    }

    /// Unescaped pointer segments, or `None` for a pointer not starting with `/`.
    pub fn segments(&self) -> Option<Vec<String>> {
        let rest = self.pointer.strip_prefix('/')?;
        Some(rest.split('/').map(unescape).collect())
    }

    /// Id of the node this reference addresses (the second segment).
    pub fn id(&self) -> Option<String> {
        self.segments()?.into_iter().nth(1)
    }

    /// Parse a reference out of an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()?
            .get("$ref")?
            .as_str()
            .map(Reference::new)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pointer)
    }
}

/// Whether `value` has the `{ "$ref": string }` shape.
pub fn is_reference(value: &Value) -> bool {
    Reference::from_value(value).is_some()
}

/// Resolve `reference` against `model`.
pub fn resolve<'a>(model: &'a PageModel, reference: &Reference) -> Option<&'a Value> {
    let segments = reference.segments()?;
    let mut segments = segments.iter();

    let section = match segments.next()?.as_str() {
        PAGE_SECTION => &model.page,
        CONTENT_SECTION => model.content.as_ref()?,
        _ => return None,
    };
    let node = section.get(segments.next()?)?;

    segments.try_fold(node, |value, segment| step(value, segment))
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => {
            // RFC 6901: no leading zeros, no signs
            if segment.is_empty()
                || (segment.len() > 1 && segment.starts_with('0'))
                || !segment.bytes().all(|b| b.is_ascii_digit())
            {
                return None;
            }
            items.get(segment.parse::<usize>().ok()?)
        }
        _ => None,
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> PageModel {
        serde_json::from_value(json!({
            "root": { "$ref": "/page/root" },
            "page": {
                "root": { "id": "root", "type": "component", "children": [{ "$ref": "/page/a" }] },
                "a": { "id": "a", "type": "component", "models": { "list": [1, 2, 3] } },
                "a/b": { "id": "a/b", "type": "component" }
            },
            "content": {
                "doc": { "id": "doc", "type": "document" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_page_node() {
        let model = model();
        let node = resolve(&model, &Reference::page("a")).unwrap();
        assert_eq!(node["id"], "a");
    }

    #[test]
    fn test_resolve_content_alias() {
        let model = model();
        let node = resolve(&model, &Reference::content("doc")).unwrap();
        assert_eq!(node["type"], "document");
    }

    #[test]
    fn test_resolve_escaped_id() {
        let model = model();
        let reference = Reference::page("a/b");
        assert_eq!(reference.pointer, "/page/a~1b");
        assert_eq!(reference.id().as_deref(), Some("a/b"));
        assert_eq!(resolve(&model, &reference).unwrap()["id"], "a/b");
    }

    #[test]
    fn test_resolve_nested_pointer() {
        let model = model();
        let value = resolve(&model, &Reference::new("/page/a/models/list/2")).unwrap();
        assert_eq!(value, &json!(3));
    }

    #[test]
    fn test_resolve_is_total() {
        let model = model();
        let pointers = [
            "",
            "/",
            "page/a",
            "/page",
            "/page/missing",
            "/unknown/a",
            "/page/a/models/list/7",
            "/page/a/models/list/01",
            "/page/a/models/list/-1",
            "/page/a/id/deeper",
            "/content/missing",
        ];
        for pointer in pointers {
            assert!(resolve(&model, &Reference::new(pointer)).is_none(), "{pointer}");
        }
    }

    #[test]
    fn test_resolve_without_content_section() {
        let mut model = model();
        model.content = None;
        assert!(resolve(&model, &Reference::content("doc")).is_none());
    }

    #[test]
    fn test_is_reference() {
        assert!(is_reference(&json!({ "$ref": "/page/a" })));
        assert!(!is_reference(&json!({ "$ref": 1 })));
        assert!(!is_reference(&json!("/page/a")));
    }
}

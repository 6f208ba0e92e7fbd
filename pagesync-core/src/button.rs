//! Edit buttons.
//!
//! An edit button is a meta-data bracket the editor turns into an overlay
//! control next to the rendered output. Buttons are keyed by type; asking for
//! an unregistered type is an error.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ModelError;
use crate::factory::Registry;
use crate::model::{MetaModel, MetaModels};

pub const BUTTON_MANAGE_CONTENT: &str = "manage-content";
pub const BUTTON_EDIT_MENU: &str = "edit-menu";

pub type ButtonBuilder = Arc<dyn Fn(&Value) -> Result<MetaModels, ModelError> + Send + Sync>;

pub struct ButtonFactory {
    registry: Registry<String, ButtonBuilder>,
}

impl ButtonFactory {
    pub fn empty() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn register<F>(&mut self, button_type: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<MetaModels, ModelError> + Send + Sync + 'static,
    {
        self.registry.register(button_type.into(), Arc::new(builder));
        self
    }

    /// Meta-data records of a `button_type` button configured by `params`.
    pub fn create(&self, button_type: &str, params: &Value) -> Result<MetaModels, ModelError> {
        let build = self
            .registry
            .get(button_type)
            .ok_or_else(|| ModelError::UnknownButtonType(button_type.to_string()))?;
        build(params)
    }
}

/// A manage-content button for the document `params.id` (or a new document
/// described by the remaining parameters).
fn manage_content(params: &Value) -> Result<MetaModels, ModelError> {
    let mut data = Map::new();
    data.insert("HST-Type".to_string(), json!("MANAGE_CONTENT_LINK"));
    if let Some(params) = params.as_object() {
        for (key, value) in params {
            let key = if key == "id" { "uuid" } else { key.as_str() };
            data.insert(key.to_string(), value.clone());
        }
    }

    Ok(MetaModels {
        begin: vec![MetaModel::comment(serde_json::to_string(&data)?)],
        end: vec![MetaModel::comment(json!({ "HST-End": "true" }).to_string())],
    })
}

/// An edit-menu button reuses the meta-data the backend attached to the menu.
fn edit_menu(params: &Value) -> Result<MetaModels, ModelError> {
    match params.get("meta") {
        Some(meta) => Ok(MetaModels::deserialize(meta)?),
        None => Ok(MetaModels::default()),
    }
}

impl Default for ButtonFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory
            .register(BUTTON_MANAGE_CONTENT, manage_content)
            .register(BUTTON_EDIT_MENU, edit_menu);
        factory
    }
}

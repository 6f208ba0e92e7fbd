//! Links and the link factory.
//!
//! A link turns into a URL string through a builder registered for its
//! `type`. Link kinds are open-ended: a link without a registered builder
//! falls back to its raw `href`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::factory::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    External,
    Internal,
    Resource,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
}

impl Link {
    pub fn new(href: impl Into<String>, link_type: LinkType) -> Self {
        Self {
            href: Some(href.into()),
            link_type: Some(link_type),
        }
    }
}

pub type LinkBuilder = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub struct LinkFactory {
    registry: Registry<LinkType, LinkBuilder>,
}

impl LinkFactory {
    /// An empty factory: every link resolves to its raw `href`.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn register<F>(&mut self, link_type: LinkType, builder: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.registry.register(link_type, Arc::new(builder));
        self
    }

    /// URL for `link`, or `None` when the link carries no `href`.
    pub fn create(&self, link: &Link) -> Option<String> {
        let href = link.href.as_deref()?;
        let builder = link.link_type.and_then(|t| self.registry.get(&t));
        Some(match builder {
            Some(build) => build(href),
            None => href.to_string(),
        })
    }
}

impl Default for LinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

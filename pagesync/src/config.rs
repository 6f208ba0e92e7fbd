//! Page synchronizer configuration.
//!
//! Two deployment shapes are recognized, and a configuration document must
//! be exactly one of them:
//!
//! - proxy: `{ request: { path, headers?, connection?, visitor? }, options: { live, preview } }`
//! - token: `{ cmsBaseUrl, spaBaseUrl?, apiBaseUrl?, origin?, authorizationToken?, serverId?, path? }`
//!
//! The HTTP client travels next to the configuration rather than inside it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::ConfigError;

const PROXY_KEYS: &[&str] = &["request", "options"];
const TOKEN_KEYS: &[&str] = &[
    "cmsBaseUrl",
    "spaBaseUrl",
    "apiBaseUrl",
    "origin",
    "authorizationToken",
    "serverId",
    "path",
];

pub const DEFAULT_API_PATH: &str = "/resourceapi";

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_SERVER_ID: &str = "Server-Id";
pub const HEADER_FORWARDED_FOR: &str = "X-Forwarded-For";
pub const HEADER_COOKIE: &str = "Cookie";

fn default_api_path() -> String {
    DEFAULT_API_PATH.to_string()
}

fn default_path() -> String {
    "/".to_string()
}

/// Where a site's SPA and CMS live relative to each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMapping {
    pub cms_base_url: String,
    /// Prefix of SPA paths served by this mapping.
    #[serde(default)]
    pub spa_base_path: String,
    #[serde(default = "default_api_path")]
    pub api_path: String,
}

impl Default for UrlMapping {
    fn default() -> Self {
        Self {
            cms_base_url: String::new(),
            spa_base_path: String::new(),
            api_path: default_api_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
}

/// A visitor token to pass back to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorToken {
    pub id: String,
    pub header: String,
}

/// The incoming request the SPA is rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor: Option<VisitorToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyOptions {
    pub live: UrlMapping,
    pub preview: UrlMapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfiguration {
    pub request: ProxyRequest,
    pub options: ProxyOptions,
}

impl ProxyConfiguration {
    /// Whether the request path falls under the preview mapping.
    pub fn is_preview(&self) -> bool {
        let preview = &self.options.preview.spa_base_path;
        !preview.is_empty()
            && preview != &self.options.live.spa_base_path
            && has_path_prefix(&self.request.path, preview)
    }

    /// The mapping serving the current request.
    pub fn mapping(&self) -> &UrlMapping {
        if self.is_preview() {
            &self.options.preview
        } else {
            &self.options.live
        }
    }

    pub fn page_model_url(&self) -> String {
        let mapping = self.mapping();
        let path = self
            .request
            .path
            .strip_prefix(mapping.spa_base_path.as_str())
            .unwrap_or(&self.request.path);
        join(&mapping.cms_base_url, &mapping.api_path, path)
    }

    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if let Some(cookie) = self
            .request
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(HEADER_COOKIE))
            .map(|(_, value)| value.clone())
        {
            headers.insert(HEADER_COOKIE.to_string(), cookie);
        }
        if let Some(address) = self
            .request
            .connection
            .as_ref()
            .and_then(|c| c.remote_address.clone())
        {
            headers.insert(HEADER_FORWARDED_FOR.to_string(), address);
        }
        if let Some(visitor) = &self.request.visitor {
            headers.insert(visitor.header.clone(), visitor.id.clone());
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfiguration {
    pub cms_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spa_base_url: Option<String>,
    /// Defaults to `cmsBaseUrl` followed by the resource API path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Origin of the editor frame. Defaults to the origin of `cmsBaseUrl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Page path to request.
    #[serde(default = "default_path")]
    pub path: String,
}

impl TokenConfiguration {
    pub fn new(cms_base_url: impl Into<String>) -> Self {
        Self {
            cms_base_url: cms_base_url.into(),
            spa_base_url: None,
            api_base_url: None,
            origin: None,
            authorization_token: None,
            server_id: None,
            path: default_path(),
        }
    }

    pub fn page_model_url(&self) -> String {
        match &self.api_base_url {
            Some(api) => join(api, "", &self.path),
            None => join(&self.cms_base_url, DEFAULT_API_PATH, &self.path),
        }
    }

    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if let Some(token) = &self.authorization_token {
            headers.insert(HEADER_AUTHORIZATION.to_string(), format!("Bearer {token}"));
        }
        if let Some(server_id) = &self.server_id {
            headers.insert(HEADER_SERVER_ID.to_string(), server_id.clone());
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Configuration {
    Proxy(ProxyConfiguration),
    Token(TokenConfiguration),
}

impl Configuration {
    /// Decode a configuration document. It must carry the keys of exactly one
    /// shape.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let object = value.as_object().ok_or(ConfigError::NotAnObject)?;
        let proxy = present_keys(object, PROXY_KEYS);
        let token = present_keys(object, TOKEN_KEYS);

        match (proxy.is_empty(), token.is_empty()) {
            (false, false) => Err(ConfigError::Ambiguous {
                proxy: proxy.join(", "),
                token: token.join(", "),
            }),
            (true, true) => Err(ConfigError::Unrecognized),
            (false, true) => Ok(Self::Proxy(ProxyConfiguration::deserialize(value)?)),
            (true, false) => Ok(Self::Token(TokenConfiguration::deserialize(value)?)),
        }
    }

    pub fn page_model_url(&self) -> String {
        match self {
            Self::Proxy(proxy) => proxy.page_model_url(),
            Self::Token(token) => token.page_model_url(),
        }
    }

    /// Headers sent with every backend request.
    pub fn headers(&self) -> BTreeMap<String, String> {
        match self {
            Self::Proxy(proxy) => proxy.headers(),
            Self::Token(token) => token.headers(),
        }
    }

    /// Origin of the editor frame, used to address and filter RPC messages.
    pub fn origin(&self) -> Result<String, ConfigError> {
        match self {
            Self::Proxy(proxy) => origin_of(&proxy.mapping().cms_base_url),
            Self::Token(TokenConfiguration {
                origin: Some(origin),
                ..
            }) => Ok(origin.clone()),
            Self::Token(token) => origin_of(&token.cms_base_url),
        }
    }
}

/// `scheme://host[:port]` of `url`.
pub fn origin_of(url: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(ConfigError::OpaqueOrigin(url.to_string()));
    }
    Ok(origin.ascii_serialization())
}

fn present_keys(object: &Map<String, Value>, keys: &[&'static str]) -> Vec<&'static str> {
    keys.iter().copied().filter(|key| object.contains_key(*key)).collect()
}

fn has_path_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
}

fn join(base: &str, api_path: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let api_path = api_path.trim_end_matches('/');
    if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
        format!("{base}{api_path}{path}")
    } else {
        format!("{base}{api_path}/{path}")
    }
}

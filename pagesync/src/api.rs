//! Page model API client.

use std::collections::BTreeMap;
use std::sync::Arc;

use pagesync_core::{ModelError, PageModel};
use serde_json::Value;

use crate::config::Configuration;
use crate::error::SpaError;
use crate::http::{HttpClient, HttpRequest};

pub struct Api {
    client: Arc<dyn HttpClient>,
    page_url: String,
    headers: BTreeMap<String, String>,
}

impl Api {
    pub fn new(config: &Configuration, client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            page_url: config.page_model_url(),
            headers: config.headers(),
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Fetch the whole page model.
    pub async fn page(&self) -> Result<PageModel, SpaError> {
        let request = HttpRequest::get(self.page_url.clone()).with_headers(self.headers.clone());
        self.fetch_model(request).await
    }

    /// Re-render one component at its self link with `properties` and return
    /// the resulting fragment.
    pub async fn component(&self, url: &str, properties: &Value) -> Result<PageModel, SpaError> {
        let request = HttpRequest::post(url, properties.clone()).with_headers(self.headers.clone());
        self.fetch_model(request).await
    }

    async fn fetch_model(&self, request: HttpRequest) -> Result<PageModel, SpaError> {
        log::debug!("{:?} {}", request.method, request.url);
        let response = self.client.fetch(request).await?;
        let model = serde_json::from_value(response.data).map_err(ModelError::from)?;
        Ok(model)
    }
}

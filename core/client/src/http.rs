//! HTTP persistence client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::debug;
use url::Url;

use sitecanvas_common::{Error, Result, SiteId};

use crate::client::{LoadResponse, PersistenceClient, SaveRequest, SaveResponse};

/// HTTP client for the site persistence service.
///
/// Saves POST to `sites/{id}/content`; bootstraps GET from
/// `sites/{id}/bootstrap`. No request timeout is set beyond the
/// transport's own; the caller's retry loop bounds total elapsed time.
pub struct HttpPersistenceClient {
    http: Client,
    base_url: Url,
}

impl HttpPersistenceClient {
    /// Create a new client for the given endpoint base URL.
    pub fn new(base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("SiteCanvas/0.1")
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    fn save_url(&self, site_id: &SiteId) -> Result<Url> {
        self.base_url
            .join(&format!("sites/{}/content", site_id))
            .map_err(|e| Error::InvalidInput(format!("Invalid save URL: {}", e)))
    }

    fn load_url(&self, site_id: &SiteId) -> Result<Url> {
        self.base_url
            .join(&format!("sites/{}/bootstrap", site_id))
            .map_err(|e| Error::InvalidInput(format!("Invalid load URL: {}", e)))
    }
}

#[async_trait]
impl PersistenceClient for HttpPersistenceClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn save_site(&self, request: &SaveRequest) -> Result<SaveResponse> {
        let url = self.save_url(&request.site.site_id)?;
        debug!("Saving site {} to {}", request.site.site_id, url);

        let response = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Failed to reach save endpoint: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "Save endpoint answered {}",
                status
            )));
        }

        response
            .json::<SaveResponse>()
            .await
            .map_err(|e| Error::Serialization(format!("Malformed save response: {}", e)))
    }

    async fn load_site(&self, site_id: &SiteId) -> Result<LoadResponse> {
        let url = self.load_url(site_id)?;
        debug!("Loading bootstrap for site {} from {}", site_id, url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Failed to reach load endpoint: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // No stored bootstrap for this site.
            return Ok(LoadResponse {
                success: false,
                data: None,
            });
        }
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "Load endpoint answered {}",
                status
            )));
        }

        response
            .json::<LoadResponse>()
            .await
            .map_err(|e| Error::Serialization(format!("Malformed load response: {}", e)))
    }
}

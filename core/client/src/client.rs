//! Persistence endpoint contract and wire types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitecanvas_common::{Result, SiteId};
use sitecanvas_document::{BootstrapDocument, ContentDocument};

/// Site metadata carried alongside the content on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProfile {
    pub site_id: SiteId,
    pub site_name: String,
    pub template: String,
}

/// The unit of work the sync engine schedules: a save request minus its
/// send-time timestamp. Two payloads with equal canonical serialization
/// describe the same write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    #[serde(flatten)]
    pub site: SiteProfile,
    pub content: ContentDocument,
}

impl SavePayload {
    pub fn new(site: SiteProfile, content: ContentDocument) -> Self {
        Self { site, content }
    }
}

/// Wire request for a site save.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(flatten)]
    pub site: SiteProfile,
    pub content: ContentDocument,
    /// Stamped when the request is handed to the transport.
    pub updated_at: DateTime<Utc>,
}

impl SaveRequest {
    /// Stamp a payload into a wire request.
    pub fn from_payload(payload: &SavePayload) -> Self {
        Self {
            site: payload.site.clone(),
            content: payload.content.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Response to a save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveResponse {
    /// Successful acknowledgement.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Rejection with a reason.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Response to a load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BootstrapDocument>,
}

/// Remote persistence endpoint contract.
///
/// Writes are last-write-wins; the sync engine guarantees at most one save
/// in flight per session, so implementations need no request ordering of
/// their own.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Client name (e.g. "http", "memory").
    fn name(&self) -> &str;

    /// Write the site content.
    ///
    /// # Errors
    /// - `Transport` when the endpoint is unreachable or answers outside
    ///   the wire contract. A reachable endpoint that refuses the save
    ///   returns `Ok` with `success: false` instead.
    async fn save_site(&self, request: &SaveRequest) -> Result<SaveResponse>;

    /// Fetch the bootstrap document for a site.
    ///
    /// A response without `data` means the site has no stored bootstrap;
    /// the caller decides how to proceed.
    async fn load_site(&self, site_id: &SiteId) -> Result<LoadResponse>;
}

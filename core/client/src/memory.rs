//! In-memory persistence client for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use sitecanvas_common::{Error, Result, SiteId};
use sitecanvas_document::BootstrapDocument;

use crate::client::{LoadResponse, PersistenceClient, SaveRequest, SaveResponse};

/// In-memory persistence client.
///
/// Stores the last saved request per site and serves configured bootstrap
/// documents. All data is lost on drop. Failure injection covers the two
/// retryable save paths (transport failure, explicit rejection) plus
/// artificial latency for in-flight interleaving tests.
pub struct MemoryClient {
    saved: RwLock<HashMap<String, SaveRequest>>,
    bootstraps: RwLock<HashMap<String, BootstrapDocument>>,
    save_attempts: AtomicU32,
    fail_remaining: AtomicU32,
    reject_remaining: AtomicU32,
    latency: Duration,
}

impl MemoryClient {
    /// Create a new empty memory client.
    pub fn new() -> Self {
        Self {
            saved: RwLock::new(HashMap::new()),
            bootstraps: RwLock::new(HashMap::new()),
            save_attempts: AtomicU32::new(0),
            fail_remaining: AtomicU32::new(0),
            reject_remaining: AtomicU32::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Add artificial latency to every save attempt.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Configure a bootstrap document for a site.
    pub fn insert_bootstrap(&self, site_id: &SiteId, bootstrap: BootstrapDocument) {
        self.bootstraps
            .write()
            .unwrap()
            .insert(site_id.as_str().to_string(), bootstrap);
    }

    /// Make the next `count` save attempts fail at the transport level.
    pub fn fail_next(&self, count: u32) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` save attempts come back rejected.
    pub fn reject_next(&self, count: u32) {
        self.reject_remaining.store(count, Ordering::SeqCst);
    }

    /// Number of save attempts observed, including failed ones.
    pub fn save_attempts(&self) -> u32 {
        self.save_attempts.load(Ordering::SeqCst)
    }

    /// Last successfully saved request for a site.
    pub fn last_saved(&self, site_id: &SiteId) -> Option<SaveRequest> {
        self.saved.read().unwrap().get(site_id.as_str()).cloned()
    }

    fn take_injected(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceClient for MemoryClient {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save_site(&self, request: &SaveRequest) -> Result<SaveResponse> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if Self::take_injected(&self.fail_remaining) {
            return Err(Error::Transport("injected transport failure".to_string()));
        }
        if Self::take_injected(&self.reject_remaining) {
            return Ok(SaveResponse::rejected("injected rejection"));
        }

        self.saved
            .write()
            .unwrap()
            .insert(request.site.site_id.as_str().to_string(), request.clone());

        Ok(SaveResponse::ok())
    }

    async fn load_site(&self, site_id: &SiteId) -> Result<LoadResponse> {
        let bootstrap = self.bootstraps.read().unwrap().get(site_id.as_str()).cloned();
        Ok(LoadResponse {
            success: true,
            data: bootstrap,
        })
    }
}

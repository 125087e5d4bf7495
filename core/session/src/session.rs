//! Editor session management.
//!
//! A session wires the document store, the sync engine, and the
//! persistence client together: the UI invokes mutation operations and
//! manual saves here, subscribes to save status, and reports lifecycle
//! signals; everything else happens in background tasks.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sitecanvas_client::{PersistenceClient, SavePayload, SiteProfile};
use sitecanvas_common::{Error, Result};
use sitecanvas_document::{ContentDocument, DocumentChange, DocumentStore, SectionKind};
use sitecanvas_sync::{
    SaveErrorFn, SaveOutcome, SaveSuccessFn, SyncConfig, SyncEngine, SyncHandle, SyncStatus,
};

/// Browser lifecycle signals the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// Page visibility changed to hidden.
    Hidden,
    /// Page is about to be torn down.
    Unload,
}

/// Options for starting a session.
#[derive(Default)]
pub struct SessionOptions {
    pub sync: SyncConfig,
    pub on_save_success: Option<SaveSuccessFn>,
    pub on_save_error: Option<SaveErrorFn>,
}

/// An active editing session for one site.
pub struct EditorSession<C: PersistenceClient + ?Sized> {
    site: SiteProfile,
    client: Arc<C>,
    store: Arc<DocumentStore>,
    sync: SyncHandle,
    engine_task: JoinHandle<()>,
    forwarder_task: JoinHandle<()>,
}

impl<C: PersistenceClient + ?Sized + 'static> EditorSession<C> {
    /// Start a session.
    ///
    /// Builds the store, spawns the sync engine and the change forwarder.
    /// The document is empty until [`EditorSession::bootstrap`] runs.
    pub fn start(site: SiteProfile, client: Arc<C>, options: SessionOptions) -> Self {
        let store = Arc::new(DocumentStore::new());

        let (sync, mut engine) = SyncEngine::new(client.clone(), options.sync);
        if let Some(callback) = options.on_save_success {
            engine = engine.on_save_success(callback);
        }
        if let Some(callback) = options.on_save_error {
            engine = engine.on_save_error(callback);
        }
        let engine_task = tokio::spawn(engine.run());

        // Subscribe before anything can mutate, then forward every change
        // into the engine for debouncing.
        let changes = store.subscribe();
        let forwarder_task = tokio::spawn(Self::forward_changes(
            changes,
            sync.clone(),
            site.clone(),
        ));

        Self {
            site,
            client,
            store,
            sync,
            engine_task,
            forwarder_task,
        }
    }

    async fn forward_changes(
        mut changes: broadcast::Receiver<DocumentChange>,
        sync: SyncHandle,
        site: SiteProfile,
    ) {
        use tokio::sync::broadcast::error::RecvError;

        loop {
            match changes.recv().await {
                Ok(change) => {
                    let payload = SavePayload::new(site.clone(), change.document);
                    if sync.document_changed(payload).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Each notification carries a full snapshot, so skipped
                    // ones are already superseded.
                    debug!("Change forwarder lagged by {} notifications", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Fetch the bootstrap document and replace the session document.
    ///
    /// # Errors
    /// - `Transport` when the endpoint is unreachable
    /// - `LoadFailure` when the service reports failure, has no data for
    ///   the site, or the payload is malformed. Session start must not
    ///   proceed past this.
    pub async fn bootstrap(&self) -> Result<()> {
        let response = self.client.load_site(&self.site.site_id).await?;
        if !response.success {
            return Err(Error::LoadFailure(format!(
                "bootstrap fetch for {} was unsuccessful",
                self.site.site_id
            )));
        }
        let Some(bootstrap) = response.data else {
            return Err(Error::LoadFailure(format!(
                "no bootstrap data stored for {}",
                self.site.site_id
            )));
        };
        self.store.load(&bootstrap).await
    }

    /// Mutate a field through the path grammar.
    ///
    /// Path errors are resolved here: logged, document unchanged, never
    /// propagated to the caller.
    pub async fn set_path(&self, path: &str, value: Value) {
        if let Err(e) = self.store.set_path(path, value).await {
            warn!("Ignoring unaddressable mutation: {}", e);
        }
    }

    /// Add a section, returning its id.
    pub async fn add_section(
        &self,
        kind: SectionKind,
        variant: &str,
        after_id: Option<&str>,
    ) -> String {
        self.store.add_section(kind, variant, after_id).await
    }

    /// Remove a section. Returns whether anything was removed.
    pub async fn remove_section(&self, id: &str) -> bool {
        self.store.remove_section(id).await
    }

    /// Duplicate a section, returning the copy's id when the source exists.
    pub async fn duplicate_section(&self, id: &str) -> Option<String> {
        self.store.duplicate_section(id).await
    }

    /// Reorder sections to match the given id sequence.
    pub async fn reorder_sections(&self, ids: &[String]) {
        self.store.reorder_sections(ids).await
    }

    /// Flip a section's visibility.
    pub async fn toggle_visibility(&self, id: &str) -> bool {
        self.store.toggle_visibility(id).await
    }

    /// Snapshot of the current document.
    pub async fn document(&self) -> ContentDocument {
        self.store.snapshot().await
    }

    /// Save the current document immediately.
    ///
    /// Resolves with the attempt's outcome; a failed attempt resolves with
    /// its error while retries continue in the background.
    pub async fn save_now(&self) -> Result<SaveOutcome> {
        let payload = self.payload().await;
        self.sync.save_now(payload).await
    }

    /// Whether a save is currently in flight.
    pub fn is_saving(&self) -> bool {
        self.sync.is_saving()
    }

    /// Sync status handle for UI display.
    pub fn sync_status(&self) -> &SyncStatus {
        self.sync.status()
    }

    /// React to a page lifecycle signal with a best-effort flush.
    ///
    /// Both signals behave identically: the pending debounce is cancelled
    /// and, when the document is dirty and no write is in flight, one
    /// unacknowledged write goes out. The browser may terminate the page
    /// before it completes; delivery is not guaranteed.
    pub async fn notify_lifecycle(&self, signal: LifecycleSignal) {
        debug!("Lifecycle signal: {:?}", signal);
        let payload = self.payload().await;
        if self.sync.flush(payload).await.is_err() {
            warn!("Sync engine gone, lifecycle flush dropped");
        }
    }

    /// Stop the engine and the forwarder.
    pub async fn shutdown(&self) {
        let _ = self.sync.shutdown().await;
        self.forwarder_task.abort();
    }

    /// Site metadata for this session.
    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    async fn payload(&self) -> SavePayload {
        SavePayload::new(self.site.clone(), self.store.snapshot().await)
    }
}

impl<C: PersistenceClient + ?Sized> Drop for EditorSession<C> {
    fn drop(&mut self) {
        // Stop background tasks if shutdown was never called.
        self.forwarder_task.abort();
        self.engine_task.abort();
    }
}

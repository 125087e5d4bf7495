//! Explicit, subscribable document store.
//!
//! The store owns the session's document behind a lock and broadcasts a
//! change notification carrying the new snapshot after every successful
//! mutation. Rejected mutations notify nobody. Consumers receive the store
//! by reference; there is no ambient singleton.

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use sitecanvas_common::Result;

use crate::document::{BootstrapDocument, ContentDocument};
use crate::kind::SectionKind;

/// Notification carrying the post-mutation snapshot.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub document: ContentDocument,
}

/// Shared document state plus its change broadcaster.
pub struct DocumentStore {
    document: RwLock<ContentDocument>,
    changes: broadcast::Sender<DocumentChange>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    const CHANNEL_CAPACITY: usize = 64;

    /// Create a store holding an empty document.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(Self::CHANNEL_CAPACITY);
        Self {
            document: RwLock::new(ContentDocument::new()),
            changes,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }

    /// Snapshot of the current document.
    pub async fn snapshot(&self) -> ContentDocument {
        self.document.read().await.clone()
    }

    /// Replace the whole document from a bootstrap payload.
    pub async fn load(&self, bootstrap: &BootstrapDocument) -> Result<()> {
        let loaded = ContentDocument::from_bootstrap(bootstrap)?;
        info!(
            "document loaded from bootstrap: {} sections",
            loaded.sections.len()
        );
        let snapshot = {
            let mut document = self.document.write().await;
            *document = loaded;
            document.clone()
        };
        self.notify(snapshot);
        Ok(())
    }

    /// Mutate a field through the path grammar.
    pub async fn set_path(&self, path: &str, value: Value) -> Result<()> {
        let snapshot = {
            let mut document = self.document.write().await;
            document.set_path(path, value)?;
            document.clone()
        };
        self.notify(snapshot);
        Ok(())
    }

    /// Add a section, returning its id.
    pub async fn add_section(
        &self,
        kind: SectionKind,
        variant: impl Into<String>,
        after_id: Option<&str>,
    ) -> String {
        let (id, snapshot) = {
            let mut document = self.document.write().await;
            let id = document.add_section(kind, variant, after_id);
            (id, document.clone())
        };
        self.notify(snapshot);
        id
    }

    /// Remove a section. Returns whether anything was removed.
    pub async fn remove_section(&self, id: &str) -> bool {
        let (removed, snapshot) = {
            let mut document = self.document.write().await;
            let removed = document.remove_section(id);
            (removed, document.clone())
        };
        if removed {
            self.notify(snapshot);
        }
        removed
    }

    /// Duplicate a section, returning the copy's id when the source exists.
    pub async fn duplicate_section(&self, id: &str) -> Option<String> {
        let (copy_id, snapshot) = {
            let mut document = self.document.write().await;
            let copy_id = document.duplicate_section(id);
            (copy_id, document.clone())
        };
        if copy_id.is_some() {
            self.notify(snapshot);
        }
        copy_id
    }

    /// Reorder sections to match the given id sequence.
    pub async fn reorder_sections(&self, ids: &[String]) {
        let snapshot = {
            let mut document = self.document.write().await;
            document.reorder_sections(ids);
            document.clone()
        };
        self.notify(snapshot);
    }

    /// Flip a section's visibility. Returns whether the section exists.
    pub async fn toggle_visibility(&self, id: &str) -> bool {
        let (toggled, snapshot) = {
            let mut document = self.document.write().await;
            let toggled = document.toggle_visibility(id);
            (toggled, document.clone())
        };
        if toggled {
            self.notify(snapshot);
        }
        toggled
    }

    fn notify(&self, document: ContentDocument) {
        // Send errors only mean there are no active subscribers.
        let _ = self.changes.send(DocumentChange { document });
    }
}

//! Save pipeline phases and shared status.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use sitecanvas_common::Error;

/// Phase of the save pipeline's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    /// Nothing scheduled or running.
    Idle,
    /// A trailing debounce timer is pending.
    Debouncing,
    /// A write is in flight.
    Saving,
    /// An attempt failed; the next one is scheduled.
    RetryScheduled,
    /// Retries exhausted; waiting for a new change or a manual save.
    Failed,
}

/// Shared, cheaply clonable view of the engine's status.
///
/// This backs the UI's `isSaving` indicator; the engine updates it, any
/// number of observers may read it.
#[derive(Clone)]
pub struct SyncStatus {
    inner: Arc<StatusInner>,
}

struct StatusInner {
    saving: AtomicBool,
    phase: Mutex<SavePhase>,
    saves_completed: AtomicU64,
    saves_failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SyncStatus {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(StatusInner {
                saving: AtomicBool::new(false),
                phase: Mutex::new(SavePhase::Idle),
                saves_completed: AtomicU64::new(0),
                saves_failed: AtomicU64::new(0),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Whether a write is currently in flight.
    pub fn is_saving(&self) -> bool {
        self.inner.saving.load(Ordering::SeqCst)
    }

    /// Current pipeline phase.
    pub fn phase(&self) -> SavePhase {
        *self.inner.phase.lock().unwrap()
    }

    /// Number of successful save cycles (no-op saves included).
    pub fn saves_completed(&self) -> u64 {
        self.inner.saves_completed.load(Ordering::SeqCst)
    }

    /// Number of terminally failed save cycles.
    pub fn saves_failed(&self) -> u64 {
        self.inner.saves_failed.load(Ordering::SeqCst)
    }

    /// Message of the last terminal failure, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().unwrap().clone()
    }

    pub(crate) fn set_phase(&self, phase: SavePhase) {
        self.inner
            .saving
            .store(phase == SavePhase::Saving, Ordering::SeqCst);
        *self.inner.phase.lock().unwrap() = phase;
    }

    pub(crate) fn record_success(&self) {
        self.inner.saves_completed.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_error.lock().unwrap() = None;
    }

    pub(crate) fn record_failure(&self, error: &Error) {
        self.inner.saves_failed.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_error.lock().unwrap() = Some(error.to_string());
    }
}

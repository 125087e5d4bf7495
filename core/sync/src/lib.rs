//! SiteCanvas Sync Engine
//!
//! This crate implements the save pipeline between the document store and
//! the persistence endpoint:
//! - trailing debounce over document changes
//! - single-flight writes with a depth-1 superseding-payload queue
//! - canonical-signature suppression of no-op writes
//! - bounded linear retry with terminal failure reporting
//! - best-effort flush on page teardown

pub mod engine;
pub mod retry;
pub mod signature;
pub mod state;

// Re-export main types
pub use engine::{SaveErrorFn, SaveOutcome, SaveSuccessFn, SyncConfig, SyncEngine, SyncHandle};
pub use retry::RetryPolicy;
pub use signature::payload_signature;
pub use state::{SavePhase, SyncStatus};

//! SiteCanvas editor session.
//!
//! The session is the surface the UI layer talks to: it owns the document
//! store, the sync engine, and the persistence client for one site, and
//! translates editor actions and page-lifecycle signals into document
//! mutations and save scheduling.

pub mod session;

pub use session::{EditorSession, LifecycleSignal, SessionOptions};

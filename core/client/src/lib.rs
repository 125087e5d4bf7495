//! SiteCanvas persistence clients.
//!
//! The remote store is only specified by its wire contract: a save endpoint
//! taking the full content document plus site metadata, and a load endpoint
//! returning the bootstrap document. This crate defines that contract
//! ([`PersistenceClient`]) together with an HTTP implementation and an
//! in-memory implementation for tests and development.

pub mod client;
pub mod http;
pub mod memory;

// Re-export main types
pub use client::{
    LoadResponse, PersistenceClient, SavePayload, SaveRequest, SaveResponse, SiteProfile,
};
pub use http::HttpPersistenceClient;
pub use memory::MemoryClient;

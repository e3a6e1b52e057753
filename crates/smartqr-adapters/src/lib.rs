//! Infrastructure adapters for Smart QR.
//!
//! This crate implements the ports defined in
//! `smartqr_core::application::ports`. It contains the storage-facing code;
//! everything here is swappable behind the port traits.

pub mod builtin_templates;
pub mod template_repo;
pub mod usage_store;

// Re-export commonly used adapters
pub use template_repo::InMemoryTemplateRepository;
pub use usage_store::InMemoryUsageStore;

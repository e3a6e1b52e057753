//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `smartqr-adapters` implement
//! these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `TemplateRepository`: Template storage, ranked URL resolution
//!   - `UsageStore`: Per-user daily quota ledger
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by the use case)

pub mod output;

pub use output::{RepositoryError, TemplateRepository, UsageStore};

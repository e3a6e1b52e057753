//! Usage store adapters.

pub mod memory;

pub use memory::InMemoryUsageStore;

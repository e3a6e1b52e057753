//! Template repository adapters.

pub mod memory;

pub use memory::InMemoryTemplateRepository;

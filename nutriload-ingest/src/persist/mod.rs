//! Catalog stores that ship with the pipeline.
//!
//! Durable stores live in `nutriload-integrations`.
mod memory_storage;

pub use memory_storage::MemoryCatalog;

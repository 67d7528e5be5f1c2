//! The ETL core of nutriload.
//!
//! Four line-delimited json sources are read, normalized into typed records, joined by food id
//! into an in-memory index and bulk loaded into a [`nutriload_core::CatalogStore`]. The
//! [`Pipeline`] drives a run from connecting to the store until the last batch has landed.
pub mod batch;
pub mod loaders;
pub mod merge;
pub mod normalize;
pub mod persist;
pub mod reader;

mod pipeline;
pub use pipeline::Pipeline;

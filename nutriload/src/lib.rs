//! # Nutriload
//!
//! Nutriload builds a queryable food catalog from four independently published datasets:
//! branded foods, descriptions, attributes and nutrients. Each dataset is a stream of json
//! objects, one per line, optionally wrapped in a json array.
//!
//! A run reads the datasets in a fixed order, normalizes every line into a typed record, joins
//! all records on their food id in memory and then replaces the catalog in the store with the
//! merged foods, batch by batch. Malformed lines and rejected documents are counted and skipped;
//! only store and source failures end a run.
//!
//! ## Example
//!
//! ```no_run
//! # use nutriload::{ingest::{Pipeline, persist::MemoryCatalog}, traits::CatalogQuery as _};
//! # use nutriload::ingest::Pagination;
//! # async fn run() -> anyhow::Result<()> {
//! let catalog = MemoryCatalog::default();
//!
//! let report = Pipeline::new(catalog.clone())
//!     .with_sources_from_dir("./data")
//!     .run()
//!     .await?;
//!
//! println!("{report}");
//!
//! let page = catalog.search("oats", Pagination::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
#![doc = document_features::document_features!()]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub use config::Config;

/// Common traits for common behaviour
pub mod traits {
    #[doc(inline)]
    pub use nutriload_core::catalog_traits::*;
    #[doc(inline)]
    pub use nutriload_core::ingest_traits::*;
}

/// Integrations with external stores and sources.
pub mod integrations {
    #[doc(inline)]
    pub use nutriload_integrations::*;
}

/// Reading, merging and loading the food datasets
pub mod ingest {
    #[doc(inline)]
    pub use nutriload_core::*;
    #[doc(inline)]
    pub use nutriload_ingest::*;
}

#[doc(hidden)]
#[cfg(feature = "test-utils")]
pub mod test_utils {
    pub use nutriload_core::test_utils::*;
}

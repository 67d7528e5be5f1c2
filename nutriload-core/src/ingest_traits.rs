//! Traits at the seams of the ingestion pipeline
//!
//! Bring your own source or store by implementing [`Loader`] or [`CatalogStore`]; the pipeline
//! only talks to these traits.
use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;

use crate::food::Food;
use crate::source_stream::LineStream;
use crate::stats::BatchReport;

/// All traits are easily mockable under tests
#[cfg(feature = "test-utils")]
#[doc(hidden)]
use mockall::automock;

/// Starting point of a source pass
///
/// Every call opens the source again and yields its raw lines from the start. Errors in the
/// stream mean the source could not be read and are fatal for the run.
#[cfg_attr(feature = "test-utils", automock)]
pub trait Loader: Send + Sync {
    fn lines(&self) -> LineStream;
}

/// Use a closure as a loader
impl<F> Loader for F
where
    F: Fn() -> LineStream + Send + Sync,
{
    fn lines(&self) -> LineStream {
        self()
    }
}

/// Persists the merged catalog
///
/// `insert_batch` is best effort: documents the store refuses are reported in the
/// [`BatchReport`], an `Err` means the store itself failed and the run must stop.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait CatalogStore: Debug + Send + Sync {
    /// Acquires the connection and prepares the schema
    async fn connect(&self) -> Result<()>;

    /// Deletes every document, returning how many were removed
    async fn clear(&self) -> Result<u64>;

    async fn insert_batch(&self, foods: Vec<Food>) -> Result<BatchReport>;

    async fn disconnect(&self) -> Result<()>;

    /// Preferred batch size of the store, if any
    fn batch_size(&self) -> Option<usize> {
        None
    }
}

#[async_trait]
impl CatalogStore for Box<dyn CatalogStore> {
    async fn connect(&self) -> Result<()> {
        self.as_ref().connect().await
    }

    async fn clear(&self) -> Result<u64> {
        self.as_ref().clear().await
    }

    async fn insert_batch(&self, foods: Vec<Food>) -> Result<BatchReport> {
        self.as_ref().insert_batch(foods).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.as_ref().disconnect().await
    }

    fn batch_size(&self) -> Option<usize> {
        self.as_ref().batch_size()
    }
}

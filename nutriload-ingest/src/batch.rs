//! Batch loader
//!
//! Splits the merged catalog into fixed-size batches and hands them to
//! [`CatalogStore::insert_batch`]. Rejected documents are logged and counted; only a failure of
//! the store call itself stops loading.
use futures_util::{StreamExt as _, stream};
use nutriload_core::{CatalogStore, Food, LoadStats, PipelineError, RunPhase};
use tokio_util::sync::CancellationToken;

/// Default number of documents per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub struct BatchLoader<'a> {
    store: &'a dyn CatalogStore,
    batch_size: usize,
    concurrency: usize,
    cancellation_token: CancellationToken,
}

impl<'a> BatchLoader<'a> {
    /// A batch size of zero is treated as one.
    pub fn new(store: &'a dyn CatalogStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            concurrency: 1,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Number of batch inserts kept in flight. Results are still processed in batch order.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Checked before every batch is issued
    #[must_use]
    pub fn with_cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    /// Number of insert calls needed for `total` documents
    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }

    /// Inserts all foods, batch by batch.
    ///
    /// Batches that landed before a failure stay in the store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] with the 1-based batch index if an insert call fails, or
    /// [`PipelineError::Cancelled`] if the token was cancelled before a batch was issued.
    pub async fn load(&self, foods: Vec<Food>) -> Result<LoadStats, PipelineError> {
        let total_batches = self.batch_count(foods.len());
        let store = self.store;
        let cancellation_token = &self.cancellation_token;

        tracing::info!(
            documents = foods.len(),
            batch_size = self.batch_size,
            total_batches,
            "Loading catalog"
        );

        let mut results = stream::iter(foods)
            .chunks(self.batch_size)
            .enumerate()
            .map(|(index, batch)| async move {
                let batch_number = index + 1;
                if cancellation_token.is_cancelled() {
                    return Err(PipelineError::Cancelled {
                        phase: RunPhase::Loading {
                            batch: batch_number,
                        },
                    });
                }

                tracing::debug!(
                    batch = batch_number,
                    documents = batch.len(),
                    "Inserting batch"
                );
                store
                    .insert_batch(batch)
                    .await
                    .map(|report| (batch_number, report))
                    .map_err(|error| PipelineError::Load {
                        batch: batch_number,
                        error,
                    })
            })
            .buffered(self.concurrency);

        let mut stats = LoadStats::default();
        while let Some(result) = results.next().await {
            let (batch, report) = result?;

            for rejected in &report.rejected {
                tracing::warn!(batch, id = rejected.id, reason = %rejected.reason, "Document rejected");
            }

            #[cfg(feature = "metrics")]
            nutriload_core::metrics::emit_batch(&report);

            stats.record(&report);
            tracing::info!(
                batch,
                total_batches,
                inserted = stats.inserted,
                rejected = stats.rejected,
                "Inserted batch {batch}/{total_batches}"
            );
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use nutriload_core::{BatchReport, MockCatalogStore};
    use test_case::test_case;

    use super::*;
    use crate::persist::MemoryCatalog;

    fn foods(count: usize) -> Vec<Food> {
        (1..=count)
            .map(|id| Food::new(id as i64, format!("Food {id}"), "Acme", ""))
            .collect()
    }

    /// Mock store recording the size of every batch it receives
    fn recording_store(sizes: Arc<Mutex<Vec<usize>>>) -> MockCatalogStore {
        let mut store = MockCatalogStore::new();
        store.expect_insert_batch().returning(move |batch| {
            sizes.lock().unwrap().push(batch.len());
            Ok(BatchReport::all_inserted(batch.len()))
        });
        store
    }

    #[test_case(10, 3, vec![3, 3, 3, 1]; "remainder in last batch")]
    #[test_case(9, 3, vec![3, 3, 3]; "evenly divisible")]
    #[test_case(2, 5, vec![2]; "single short batch")]
    #[test_case(0, 5, vec![]; "nothing to load")]
    #[tokio::test]
    async fn test_issues_ceil_n_over_b_batches(total: usize, batch_size: usize, expected: Vec<usize>) {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let store = recording_store(sizes.clone());
        let loader = BatchLoader::new(&store, batch_size);

        let stats = loader.load(foods(total)).await.unwrap();

        assert_eq!(loader.batch_count(total), expected.len());
        assert_eq!(*sizes.lock().unwrap(), expected);
        assert_eq!(stats.batches, expected.len());
        assert_eq!(stats.inserted, total);
    }

    #[tokio::test]
    async fn test_rejected_document_does_not_stop_the_batch() {
        let store = MemoryCatalog::default();
        store
            .insert_batch(vec![Food::new(2, "existing", "", "")])
            .await
            .unwrap();

        let stats = BatchLoader::new(&store, 3).load(foods(5)).await.unwrap();

        assert_eq!(stats.batches, 2);
        assert_eq!(stats.attempted, 5);
        assert_eq!(stats.inserted, 4);
        assert_eq!(stats.rejected, 1);
        assert_eq!(store.len().await, 5);
    }

    #[test_log::test(tokio::test)]
    async fn test_fatal_insert_names_the_batch() {
        let mut store = MockCatalogStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_insert_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|batch| Ok(BatchReport::all_inserted(batch.len())));
        store
            .expect_insert_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("connection lost")));

        let err = BatchLoader::new(&store, 2).load(foods(6)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Load { batch: 2, .. }));
        assert_eq!(err.to_string(), "Failed to insert batch 2: connection lost");
    }

    #[tokio::test]
    async fn test_cancelled_before_first_batch() {
        let mut store = MockCatalogStore::new();
        store.expect_insert_batch().never();
        let token = CancellationToken::new();
        token.cancel();

        let err = BatchLoader::new(&store, 2)
            .with_cancellation_token(token)
            .load(foods(4))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Cancelled {
                phase: RunPhase::Loading { batch: 1 }
            }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_totals() {
        let store = MemoryCatalog::default();

        let stats = BatchLoader::new(&store, 7)
            .with_concurrency(4)
            .load(foods(50))
            .await
            .unwrap();

        assert_eq!(stats.batches, 8);
        assert_eq!(stats.inserted, 50);
        let ids: Vec<_> = store.get_all().await.iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), 50);
    }
}

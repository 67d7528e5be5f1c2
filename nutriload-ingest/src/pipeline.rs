use std::{collections::BTreeMap, path::Path, sync::Arc, time::Instant};

use nutriload_core::{CatalogStore, Loader, PipelineError, RunPhase, RunReport, SourceKind};
use tokio_util::sync::CancellationToken;

use crate::{
    batch::{BatchLoader, DEFAULT_BATCH_SIZE},
    loaders::FileLoader,
    merge::FoodIndex,
    reader::json_records,
};

/// Imports the four food sources into a catalog store.
///
/// A run connects to the store, deletes the existing catalog, merges the sources in
/// [`SourceKind::ORDER`] into an in-memory [`FoodIndex`] and then loads the aggregates in
/// batches. Any fatal error ends the run; batches that already landed stay in the store.
///
/// # Example
///
/// ```no_run
/// # use nutriload_ingest::{Pipeline, persist::MemoryCatalog};
/// # async fn run() -> Result<(), nutriload_core::PipelineError> {
/// let report = Pipeline::new(MemoryCatalog::default())
///     .with_sources_from_dir("./data")
///     .with_batch_size(5000)
///     .run()
///     .await?;
///
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    store: Arc<dyn CatalogStore>,
    sources: BTreeMap<SourceKind, Box<dyn Loader>>,
    batch_size: Option<usize>,
    concurrency: usize,
    cancellation_token: CancellationToken,
}

impl Pipeline {
    pub fn new(store: impl CatalogStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            sources: BTreeMap::new(),
            batch_size: None,
            concurrency: 1,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Sets the loader for a source, replacing any earlier one
    #[must_use]
    pub fn with_source(mut self, kind: SourceKind, loader: impl Loader + 'static) -> Self {
        self.sources.insert(kind, Box::new(loader));
        self
    }

    /// Reads every source from its conventional file name inside `dir`
    #[must_use]
    pub fn with_sources_from_dir(mut self, dir: impl AsRef<Path>) -> Self {
        for kind in SourceKind::ORDER {
            self = self.with_source(kind, FileLoader::for_source(dir.as_ref(), kind));
        }
        self
    }

    /// Overrides the batch size of the store. Defaults to the store's preference, or
    /// [`DEFAULT_BATCH_SIZE`].
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Number of batch inserts kept in flight, one by default
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Cancelling the token stops the run before the next source or batch
    #[must_use]
    pub fn with_cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    fn batch_size(&self) -> usize {
        self.batch_size
            .or_else(|| self.store.batch_size())
            .unwrap_or(DEFAULT_BATCH_SIZE)
    }

    fn check_cancelled(&self, phase: RunPhase) -> Result<(), PipelineError> {
        if self.cancellation_token.is_cancelled() {
            return Err(PipelineError::Cancelled { phase });
        }
        Ok(())
    }

    /// Runs the import.
    ///
    /// Per-line and per-document problems are counted in the returned [`RunReport`] and never
    /// fail the run.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] naming the phase if a source is missing, the store cannot be
    /// connected or cleared, a source cannot be read, a batch insert fails or the run is
    /// cancelled. The store is disconnected on a best-effort basis after a failure.
    #[tracing::instrument(skip_all, fields(catalog_size), name = "nutriload.run")]
    pub async fn run(self) -> Result<RunReport, PipelineError> {
        let now = Instant::now();

        if let Some(kind) = SourceKind::ORDER
            .into_iter()
            .find(|kind| !self.sources.contains_key(kind))
        {
            return Err(PipelineError::MissingSource(kind));
        }

        tracing::info!(phase = %RunPhase::Disconnected, "Starting import");
        self.check_cancelled(RunPhase::Disconnected).map_err(failed)?;

        if let Err(error) = self.store.connect().await {
            return Err(failed(PipelineError::Connect(error)));
        }
        tracing::info!(phase = %RunPhase::Connected, "Connected to catalog store");

        let mut report = match self.run_connected().await {
            Ok(report) => report,
            Err(err) => {
                let err = failed(err);
                if let Err(error) = self.store.disconnect().await {
                    tracing::warn!(error = %error, "Failed to disconnect after failed import");
                }
                return Err(err);
            }
        };

        self.store
            .disconnect()
            .await
            .map_err(|error| failed(PipelineError::Disconnect(error)))?;

        report.elapsed = now.elapsed();
        tracing::Span::current().record("catalog_size", report.catalog_size);
        tracing::info!(phase = %RunPhase::Done, "Import finished\n{report}");

        Ok(report)
    }

    async fn run_connected(&self) -> Result<RunReport, PipelineError> {
        self.check_cancelled(RunPhase::Connected)?;

        let removed = self.store.clear().await.map_err(PipelineError::Clear)?;
        tracing::info!(phase = %RunPhase::Cleared, removed, "Cleared existing catalog");

        let mut index = FoodIndex::new();
        let mut sources = Vec::with_capacity(SourceKind::ORDER.len());

        for kind in SourceKind::ORDER {
            let phase = RunPhase::Merging(kind);
            self.check_cancelled(phase)?;
            let loader = self
                .sources
                .get(&kind)
                .ok_or(PipelineError::MissingSource(kind))?;

            tracing::info!(phase = %phase, "Reading source");
            let stats = index
                .merge_source(kind, json_records(loader.lines()))
                .await
                .map_err(|error| PipelineError::Source { kind, error })?;

            #[cfg(feature = "metrics")]
            nutriload_core::metrics::emit_source_stats(&stats);

            sources.push(stats);
        }

        if index.is_empty() {
            tracing::warn!("No base foods were read, the catalog stays empty");
        }

        let catalog_size = index.len();
        let load = BatchLoader::new(self.store.as_ref(), self.batch_size())
            .with_concurrency(self.concurrency)
            .with_cancellation_token(self.cancellation_token.clone())
            .load(index.into_foods())
            .await?;

        Ok(RunReport {
            sources,
            load,
            catalog_size,
            ..Default::default()
        })
    }
}

/// Logs the transition into the failed state
fn failed(err: PipelineError) -> PipelineError {
    tracing::error!(
        phase = %RunPhase::Failed,
        failed_in = %err.phase(),
        error = %err,
        "Import failed"
    );
    err
}

#[cfg(test)]
mod tests {
    use nutriload_core::test_utils::{acme_food, acme_source, assert_foods_eq, branded_foods_lines};
    use nutriload_core::{BatchReport, CatalogQuery as _, Food, MockCatalogStore, MockLoader};

    use super::*;
    use crate::loaders::InlineLoader;
    use crate::persist::MemoryCatalog;

    fn with_acme_sources(mut pipeline: Pipeline) -> Pipeline {
        for kind in SourceKind::ORDER {
            pipeline = pipeline.with_source(kind, InlineLoader::new(acme_source(kind)));
        }
        pipeline
    }

    fn unread_loader() -> MockLoader {
        let mut loader = MockLoader::new();
        loader.expect_lines().never();
        loader
    }

    #[test_log::test(tokio::test)]
    async fn test_end_to_end_acme() {
        let store = MemoryCatalog::default();
        let pipeline = with_acme_sources(Pipeline::new(store.clone()));

        let report = pipeline.run().await.unwrap();

        assert_foods_eq(&store.get_all().await, &[acme_food()]);
        assert_eq!(report.catalog_size, 1);
        assert_eq!(report.load.inserted, 1);
        assert_eq!(report.source(SourceKind::FoodAttributes).unwrap().unmatched, 1);
        assert!(store.get_by_id(99).await.unwrap().is_none());
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_replaces_existing_catalog() {
        let store = MemoryCatalog::default();
        store
            .insert_batch(vec![Food::new(500, "stale", "", "")])
            .await
            .unwrap();

        with_acme_sources(Pipeline::new(store.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert!(store.get_by_id(500).await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_empty_sources_clear_the_catalog() {
        let store = MemoryCatalog::default();
        store
            .insert_batch(vec![Food::new(500, "stale", "", "")])
            .await
            .unwrap();
        let mut pipeline = Pipeline::new(store.clone());
        for kind in SourceKind::ORDER {
            pipeline = pipeline.with_source(kind, InlineLoader::new("[\n]\n"));
        }

        let report = pipeline.run().await.unwrap();

        assert_eq!(report.catalog_size, 0);
        assert_eq!(report.load.batches, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_source_fails_before_connecting() {
        let store = MockCatalogStore::new();
        let pipeline = Pipeline::new(store)
            .with_source(SourceKind::BrandedFoods, InlineLoader::new(""))
            .with_source(SourceKind::FoodDescriptions, InlineLoader::new(""))
            .with_source(SourceKind::FoodNutrients, InlineLoader::new(""));

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::MissingSource(SourceKind::FoodAttributes)
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_connect_failure_aborts_before_clear() {
        let mut store = MockCatalogStore::new();
        store
            .expect_connect()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("connection refused")));
        store.expect_clear().never();
        store.expect_disconnect().never();

        let mut pipeline = Pipeline::new(store);
        for kind in SourceKind::ORDER {
            pipeline = pipeline.with_source(kind, unread_loader());
        }

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, PipelineError::Connect(_)));
        assert_eq!(err.phase(), RunPhase::Disconnected);
    }

    #[test_log::test(tokio::test)]
    async fn test_clear_failure_aborts_before_reading() {
        let mut store = MockCatalogStore::new();
        store.expect_connect().times(1).returning(|| Ok(()));
        store
            .expect_clear()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("permission denied")));
        store.expect_insert_batch().never();
        store.expect_disconnect().times(1).returning(|| Ok(()));

        let mut pipeline = Pipeline::new(store);
        for kind in SourceKind::ORDER {
            pipeline = pipeline.with_source(kind, unread_loader());
        }

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, PipelineError::Clear(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_unreadable_source_fails_the_run() {
        let store = MemoryCatalog::default();
        let mut attributes = MockLoader::new();
        attributes
            .expect_lines()
            .times(1)
            .returning(|| vec![Err(anyhow::anyhow!("no such file"))].into());

        let pipeline = with_acme_sources(Pipeline::new(store.clone()))
            .with_source(SourceKind::FoodAttributes, attributes);

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Source {
                kind: SourceKind::FoodAttributes,
                ..
            }
        ));
        assert!(store.is_empty().await);
        assert!(!store.is_connected());
    }

    #[test_log::test(tokio::test)]
    async fn test_fatal_batch_keeps_earlier_batches() {
        let mut store = MockCatalogStore::new();
        let mut seq = mockall::Sequence::new();
        store.expect_connect().returning(|| Ok(()));
        store.expect_clear().returning(|| Ok(0));
        store.expect_batch_size().returning(|| Some(2));
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
        store.expect_disconnect().times(1).returning(|| Ok(()));

        let branded = branded_foods_lines(5).join("\n");
        let pipeline = Pipeline::new(store)
            .with_source(SourceKind::BrandedFoods, InlineLoader::new(branded))
            .with_source(SourceKind::FoodDescriptions, InlineLoader::default())
            .with_source(SourceKind::FoodAttributes, InlineLoader::default())
            .with_source(SourceKind::FoodNutrients, InlineLoader::default());

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, PipelineError::Load { batch: 2, .. }));
        assert_eq!(err.phase(), RunPhase::Loading { batch: 2 });
    }

    #[tokio::test]
    async fn test_batch_size_from_store_unless_overridden() {
        let branded = branded_foods_lines(5).join("\n");
        let build = |store: MemoryCatalog| {
            Pipeline::new(store)
                .with_source(SourceKind::BrandedFoods, InlineLoader::new(branded.as_str()))
                .with_source(SourceKind::FoodDescriptions, InlineLoader::default())
                .with_source(SourceKind::FoodAttributes, InlineLoader::default())
                .with_source(SourceKind::FoodNutrients, InlineLoader::default())
        };
        let store = || MemoryCatalog::builder().batch_size(Some(1)).build().unwrap();

        let report = build(store()).run().await.unwrap();
        assert_eq!(report.load.batches, 5);

        let report = build(store()).with_batch_size(2).run().await.unwrap();
        assert_eq!(report.load.batches, 3);
    }

    #[tokio::test]
    async fn test_cancelled_run_never_clears() {
        let mut store = MockCatalogStore::new();
        store.expect_connect().never();
        store.expect_clear().never();
        let token = CancellationToken::new();
        token.cancel();

        let mut pipeline = Pipeline::new(store).with_cancellation_token(token);
        for kind in SourceKind::ORDER {
            pipeline = pipeline.with_source(kind, unread_loader());
        }

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Cancelled {
                phase: RunPhase::Disconnected
            }
        ));
    }

    #[tokio::test]
    async fn test_from_dir_reads_files() {
        let tempdir = temp_dir::TempDir::new().unwrap();
        for kind in SourceKind::ORDER {
            std::fs::write(tempdir.path().join(kind.file_name()), acme_source(kind)).unwrap();
        }
        let store = MemoryCatalog::default();

        Pipeline::new(store.clone())
            .with_sources_from_dir(tempdir.path())
            .run()
            .await
            .unwrap();

        assert_foods_eq(&store.get_all().await, &[acme_food()]);
    }
}

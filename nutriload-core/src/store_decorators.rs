use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::food::Food;
use crate::ingest_traits::CatalogStore;
use crate::stats::BatchReport;

/// Backoff configuration for catalog store calls.
/// Each time a store call fails backoff will wait an increasing period of time for each
/// subsequent retry attempt. see <https://docs.rs/backoff/latest/backoff/> for more details.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfiguration {
    /// Initial interval in milliseconds between retries
    pub initial_interval_ms: u64,
    /// The factor by which the interval is multiplied on each retry attempt
    pub multiplier: f64,
    /// Introduces randomness to avoid retry storms
    pub randomization_factor: f64,
    /// Total time all attempts are allowed in seconds. Once a retry must wait longer than this,
    /// the call is considered to have failed.
    pub max_elapsed_time_sec: u64,
}

impl Default for BackoffConfiguration {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 2.0,
            randomization_factor: 0.5,
            max_elapsed_time_sec: 30,
        }
    }
}

/// Retries connecting, clearing and batch inserts of the wrapped store.
///
/// Only whole-call failures are retried. Documents rejected inside a batch are part of a
/// successful [`BatchReport`] and are never retried.
#[derive(Debug, Clone)]
pub struct StoreWithBackOff<S> {
    pub(crate) inner: S,
    config: BackoffConfiguration,
}

impl<S> StoreWithBackOff<S> {
    pub fn new(store: S, config: BackoffConfiguration) -> Self {
        Self {
            inner: store,
            config,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub(crate) fn strategy(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoffBuilder::default()
            .with_initial_interval(Duration::from_millis(self.config.initial_interval_ms))
            .with_multiplier(self.config.multiplier)
            .with_max_elapsed_time(Some(Duration::from_secs(self.config.max_elapsed_time_sec)))
            .with_randomization_factor(self.config.randomization_factor)
            .build()
    }
}

#[async_trait]
impl<S: CatalogStore> CatalogStore for StoreWithBackOff<S> {
    async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let op = || async move {
            inner.connect().await.map_err(|e| {
                tracing::warn!(error = %e, "Connecting to catalog store failed, retrying");
                backoff::Error::transient(e)
            })
        };

        backoff::future::retry(self.strategy(), op).await
    }

    async fn clear(&self) -> Result<u64> {
        let inner = &self.inner;
        let op = || async move { inner.clear().await.map_err(backoff::Error::transient) };

        backoff::future::retry(self.strategy(), op).await
    }

    async fn insert_batch(&self, foods: Vec<Food>) -> Result<BatchReport> {
        let inner = &self.inner;
        let op = || {
            let foods = foods.clone();
            async move {
                inner.insert_batch(foods).await.map_err(|e| {
                    tracing::warn!(error = %e, "Batch insert failed, retrying");
                    backoff::Error::transient(e)
                })
            }
        };

        backoff::future::retry(self.strategy(), op).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.disconnect().await
    }

    fn batch_size(&self) -> Option<usize> {
        self.inner.batch_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct FlakyStore {
        call_count: Arc<AtomicUsize>,
        should_fail_count: usize,
    }

    #[async_trait]
    impl CatalogStore for FlakyStore {
        async fn connect(&self) -> Result<()> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);
            if count < self.should_fail_count {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }

        async fn clear(&self) -> Result<u64> {
            Ok(0)
        }

        async fn insert_batch(&self, foods: Vec<Food>) -> Result<BatchReport> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);
            if count < self.should_fail_count {
                anyhow::bail!("connection reset");
            }
            Ok(BatchReport::all_inserted(foods.len()))
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    fn config(max_elapsed_time_sec: u64) -> BackoffConfiguration {
        BackoffConfiguration {
            initial_interval_ms: 10,
            multiplier: 1.5,
            randomization_factor: 0.0,
            max_elapsed_time_sec,
        }
    }

    #[tokio::test]
    async fn test_connect_retries_until_success() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let store = StoreWithBackOff::new(
            FlakyStore {
                call_count: call_count.clone(),
                should_fail_count: 2,
            },
            config(5),
        );

        store.connect().await.unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_insert_batch_retries_with_same_documents() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let store = StoreWithBackOff::new(
            FlakyStore {
                call_count: call_count.clone(),
                should_fail_count: 1,
            },
            config(5),
        );

        let report = store
            .insert_batch(vec![Food::new(1, "a", "", ""), Food::new(2, "b", "", "")])
            .await
            .unwrap();

        assert_eq!(report, BatchReport::all_inserted(2));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_elapsed_time() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let store = StoreWithBackOff::new(
            FlakyStore {
                call_count: call_count.clone(),
                should_fail_count: usize::MAX,
            },
            config(0),
        );

        let result = store.connect().await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}

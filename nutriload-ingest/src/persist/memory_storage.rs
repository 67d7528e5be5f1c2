use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use derive_builder::Builder;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use nutriload_core::{
    BatchReport, CatalogQuery, CatalogStore, Food, FoodId, Pagination, RejectedDocument,
    SearchPage,
};

#[derive(Debug, Default, Builder, Clone)]
#[builder(pattern = "owned")]
/// A simple in-memory catalog.
///
/// Great for experimentation and testing. Ids are unique: a document whose id is already stored
/// is rejected, the rest of its batch still lands. Clones share the same data.
pub struct MemoryCatalog {
    #[builder(default)]
    data: Arc<RwLock<IndexMap<FoodId, Food>>>,
    #[builder(default)]
    batch_size: Option<usize>,
    #[builder(default)]
    connected: Arc<AtomicBool>,
}

impl MemoryCatalog {
    pub fn builder() -> MemoryCatalogBuilder {
        MemoryCatalogBuilder::default()
    }

    /// Retrieve all foods in insertion order
    pub async fn get_all(&self) -> Vec<Food> {
        self.data.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let mut lock = self.data.write().await;
        let removed = lock.len();
        lock.clear();

        Ok(removed as u64)
    }

    /// Stores every food whose id is not taken yet
    async fn insert_batch(&self, foods: Vec<Food>) -> Result<BatchReport> {
        let mut lock = self.data.write().await;
        let mut report = BatchReport {
            attempted: foods.len(),
            ..Default::default()
        };

        for food in foods {
            if lock.contains_key(&food.id) {
                report.rejected.push(RejectedDocument {
                    id: food.id,
                    reason: format!("duplicate id {}", food.id),
                });
                continue;
            }
            lock.insert(food.id, food);
            report.inserted += 1;
        }

        Ok(report)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }
}

#[async_trait]
impl CatalogQuery for MemoryCatalog {
    async fn search(&self, query: &str, pagination: Pagination) -> Result<SearchPage> {
        let needle = query.to_lowercase();
        let lock = self.data.read().await;

        let mut matches: Vec<&Food> = lock
            .values()
            .filter(|food| {
                food.description.to_lowercase().contains(&needle)
                    || food.brand_owner.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by_key(|food| food.id);

        Ok(SearchPage {
            total_count: matches.len(),
            items: matches
                .into_iter()
                .skip(pagination.offset())
                .take(pagination.limit)
                .cloned()
                .collect(),
        })
    }

    async fn get_by_id(&self, id: FoodId) -> Result<Option<Food>> {
        Ok(self.data.read().await.get(&id).cloned())
    }
}

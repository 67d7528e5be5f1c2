//! The read contract a finished catalog satisfies.
//!
//! The search and detail API consumes the catalog through this trait only; a successful run
//! leaves every store it wrote to answering it.
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::food::{Food, FoodId};

/// Default page size, matching what the search endpoint returns per request
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// 1-based page with a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }
    }

    /// Number of matches to skip. Page 0 is treated as page 1.
    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<Food>,
    /// All matches, independent of the requested page
    pub total_count: usize,
}

/// Queries a populated catalog
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    /// Case-insensitive substring match over description and brand owner, ordered by id
    async fn search(&self, query: &str, pagination: Pagination) -> Result<SearchPage>;

    async fn get_by_id(&self, id: FoodId) -> Result<Option<Food>>;
}

#[async_trait]
impl CatalogQuery for Box<dyn CatalogQuery> {
    async fn search(&self, query: &str, pagination: Pagination) -> Result<SearchPage> {
        self.as_ref().search(query, pagination).await
    }

    async fn get_by_id(&self, id: FoodId) -> Result<Option<Food>> {
        self.as_ref().get_by_id(id).await
    }
}

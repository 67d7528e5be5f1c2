use anyhow::{Context as _, Result};
use async_trait::async_trait;
use duckdb::params;
use nutriload_core::{CatalogQuery, Food, FoodId, Pagination, SearchPage};

use super::Duckdb;

const MATCH_CLAUSE: &str = "contains(lower(description), ?) OR contains(lower(brand_owner), ?)";

#[async_trait]
impl CatalogQuery for Duckdb {
    async fn search(&self, query: &str, pagination: Pagination) -> Result<SearchPage> {
        let needle = query.to_lowercase();
        let table_name = &self.table_name;

        let count_sql = format!("SELECT count(*) FROM {table_name} WHERE {MATCH_CLAUSE}");
        let page_sql = format!(
            "SELECT document FROM {table_name} WHERE {MATCH_CLAUSE} ORDER BY id LIMIT {} OFFSET {}",
            pagination.limit,
            pagination.offset()
        );

        tracing::trace!("[duckdb] Executing query: {}", page_sql);

        let conn = self.connection().lock().await;

        let total_count: i64 = conn
            .query_row(&count_sql, params![needle, needle], |row| row.get(0))
            .context("Failed to count matching foods")?;

        let mut stmt = conn
            .prepare(&page_sql)
            .context("Failed to prepare duckdb statement for search")?;

        let items = stmt
            .query_map(params![needle, needle], |row| row.get::<_, String>(0))
            .context("Failed to query for foods")?
            .map(|document| -> Result<Food> {
                serde_json::from_str(&document?).context("Failed to parse stored food")
            })
            .collect::<Result<Vec<Food>>>()?;

        Ok(SearchPage {
            items,
            total_count: usize::try_from(total_count)?,
        })
    }

    async fn get_by_id(&self, id: FoodId) -> Result<Option<Food>> {
        let sql = format!("SELECT document FROM {} WHERE id = ?", self.table_name);
        let conn = self.connection().lock().await;

        match conn.query_row(&sql, params![id], |row| row.get::<_, String>(0)) {
            Ok(document) => Ok(Some(
                serde_json::from_str(&document).context("Failed to parse stored food")?,
            )),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to fetch food {id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use nutriload_core::CatalogStore as _;
    use nutriload_core::test_utils::{acme_food, assert_foods_eq};

    use super::*;
    use crate::duckdb::tests::in_memory;

    async fn seeded() -> Duckdb {
        let store = in_memory();
        store.connect().await.unwrap();
        store
            .insert_batch(vec![
                acme_food(),
                Food::new(2, "Rolled Oats", "Quaker", "oats"),
                Food::new(3, "Sparkling water", "ACME Beverages", "water, co2"),
                Food::new(4, "Rye bread", "Bakery", "rye"),
            ])
            .await
            .unwrap();
        store
    }

    #[test_log::test(tokio::test)]
    async fn test_search_is_case_insensitive_over_description_and_brand() {
        let store = seeded().await;

        let page = store.search("acme", Pagination::default()).await.unwrap();

        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.iter().map(|f| f.id).collect::<Vec<_>>(), vec![1, 3]);

        let page = store.search("OATS", Pagination::default()).await.unwrap();
        assert_eq!(page.total_count, 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_search_paginates_but_counts_everything() {
        let store = seeded().await;

        let page = store.search("", Pagination::new(2, 3)).await.unwrap();

        assert_eq!(page.total_count, 4);
        assert_eq!(page.items.iter().map(|f| f.id).collect::<Vec<_>>(), vec![4]);
    }

    #[tokio::test]
    async fn test_get_by_id_returns_full_document() {
        let store = seeded().await;

        let food = store.get_by_id(1).await.unwrap().unwrap();

        assert_foods_eq(&[food], &[acme_food()]);
        assert!(store.get_by_id(42).await.unwrap().is_none());
    }
}

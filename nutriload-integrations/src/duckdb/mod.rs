//! DuckDB as a durable catalog store.
//!
//! Each food is stored as one row: the searchable base fields as columns and the full
//! aggregate as a json document.
use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result};
use derive_builder::Builder;
use tera::Context;
use tokio::sync::Mutex;

pub mod persist;
pub mod retrieve;

const DEFAULT_CATALOG_SCHEMA: &str = include_str!("schema.sql");

/// Provides `CatalogStore` and `CatalogQuery` for duckdb
///
/// # Example
///
/// ```no_run
/// # use nutriload_integrations::duckdb::Duckdb;
/// # fn build() -> anyhow::Result<Duckdb> {
/// let store = Duckdb::open("nutriload.duckdb")?
///     .table_name("foods")
///     .batch_size(5000_usize)
///     .build()?;
/// # Ok(store)
/// # }
/// ```
#[derive(Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct Duckdb {
    /// The connection to the database
    #[builder(setter(custom))]
    connection: Arc<Mutex<duckdb::Connection>>, // duckdb connections are not Sync

    /// The name of the catalog table. Defaults to "foods".
    #[builder(default = "\"foods\".into()")]
    table_name: String,

    /// Batch size for inserting foods
    #[builder(default = "1000")]
    batch_size: usize,
}

impl std::fmt::Debug for Duckdb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Duckdb")
            .field("connection", &"Arc<Mutex<duckdb::Connection>>")
            .field("table_name", &self.table_name)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Duckdb {
    pub fn builder() -> DuckdbBuilder {
        DuckdbBuilder::default()
    }

    /// Opens (or creates) a database file and returns a builder using it
    ///
    /// # Errors
    ///
    /// Errors if the database cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<DuckdbBuilder> {
        let path = path.as_ref();
        let connection = duckdb::Connection::open(path)
            .with_context(|| format!("Failed to open duckdb database {}", path.display()))?;

        let mut builder = Self::builder();
        builder.connection(connection);
        Ok(builder)
    }

    /// Name of the catalog table
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the connection to the database
    pub fn connection(&self) -> &Mutex<duckdb::Connection> {
        &self.connection
    }

    /// Renders the table schema
    ///
    /// # Errors
    ///
    /// Errors if the schema template fails to render
    pub fn schema(&self) -> Result<String> {
        let mut context = Context::default();
        context.insert("table_name", &self.table_name);

        tera::Tera::one_off(DEFAULT_CATALOG_SCHEMA, &context, false)
            .context("Could not render catalog schema")
    }
}

impl DuckdbBuilder {
    pub fn connection(&mut self, connection: impl Into<duckdb::Connection>) -> &mut Self {
        self.connection = Some(Arc::new(Mutex::new(connection.into())));
        self
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(table_name) = &self.table_name {
            let mut chars = table_name.chars();
            let valid = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(format!("Invalid table name `{table_name}`"));
            }
        }

        if self.batch_size == Some(0) {
            return Err("Batch size must be greater than zero".to_string());
        }

        Ok(())
    }
}

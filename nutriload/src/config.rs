//! Environment configuration for the import command.
//!
//! Values are read from the environment, a `.env` file in the working directory is honoured.
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use dotenvy::dotenv;
use nutriload_core::{CatalogStore, SourceKind, store_decorators::BackoffConfiguration};
use nutriload_ingest::{Pipeline, batch::DEFAULT_BATCH_SIZE, loaders::FileLoader};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value `{value}`: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is set, but nutriload was built without the `http` feature")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `NUTRILOAD_DATABASE`
    pub database: PathBuf,
    /// `NUTRILOAD_TABLE`
    pub table: String,
    /// `NUTRILOAD_DATA_DIR`
    pub data_dir: PathBuf,
    /// `NUTRILOAD_BASE_URL`, fetch sources from here instead of the data dir
    pub base_url: Option<String>,
    /// `NUTRILOAD_BATCH_SIZE`
    pub batch_size: usize,
    /// `NUTRILOAD_INSERT_CONCURRENCY`
    pub insert_concurrency: usize,
    /// `NUTRILOAD_HTTP_TIMEOUT_SECS`, longest wait for the server on a single read
    pub http_timeout: Duration,
    /// `NUTRILOAD_RETRY_MAX_ELAPSED_SECS`, zero disables retries
    pub retry_max_elapsed: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("nutriload.duckdb"),
            table: "foods".to_string(),
            data_dir: PathBuf::from("."),
            base_url: None,
            batch_size: DEFAULT_BATCH_SIZE,
            insert_concurrency: 1,
            http_timeout: Duration::from_secs(60),
            retry_max_elapsed: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Loads the config from the environment
    ///
    /// # Errors
    ///
    /// Errors if a variable is set to a value that cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        tracing::info!("Loading config from environment");
        dotenv().ok();

        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Loads the config from any key value source, unset keys take their default
    ///
    /// # Errors
    ///
    /// Errors if a variable is set to a value that cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let lookup = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let batch_size = parse(&lookup, "NUTRILOAD_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "NUTRILOAD_BATCH_SIZE",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            database: lookup("NUTRILOAD_DATABASE").map_or(defaults.database, PathBuf::from),
            table: lookup("NUTRILOAD_TABLE").unwrap_or(defaults.table),
            data_dir: lookup("NUTRILOAD_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            base_url: lookup("NUTRILOAD_BASE_URL"),
            batch_size,
            insert_concurrency: parse(
                &lookup,
                "NUTRILOAD_INSERT_CONCURRENCY",
                defaults.insert_concurrency,
            )?
            .max(1),
            http_timeout: Duration::from_secs(parse(
                &lookup,
                "NUTRILOAD_HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            retry_max_elapsed: Duration::from_secs(parse(
                &lookup,
                "NUTRILOAD_RETRY_MAX_ELAPSED_SECS",
                defaults.retry_max_elapsed.as_secs(),
            )?),
        })
    }

    /// Retry settings for the catalog store
    pub fn backoff(&self) -> BackoffConfiguration {
        BackoffConfiguration {
            max_elapsed_time_sec: self.retry_max_elapsed.as_secs(),
            ..Default::default()
        }
    }

    /// A pipeline into `store` with all four sources and the batching configured
    ///
    /// # Errors
    ///
    /// Errors if a base url is configured without http support
    pub fn pipeline(&self, store: impl CatalogStore + 'static) -> Result<Pipeline, ConfigError> {
        let mut pipeline = Pipeline::new(store)
            .with_batch_size(self.batch_size)
            .with_concurrency(self.insert_concurrency);

        for kind in SourceKind::ORDER {
            pipeline = match &self.base_url {
                Some(base_url) => self.with_http_source(pipeline, base_url, kind)?,
                None => pipeline.with_source(kind, FileLoader::for_source(&self.data_dir, kind)),
            };
        }

        Ok(pipeline)
    }

    #[cfg(feature = "http")]
    #[allow(clippy::unnecessary_wraps)]
    fn with_http_source(
        &self,
        pipeline: Pipeline,
        base_url: &str,
        kind: SourceKind,
    ) -> Result<Pipeline, ConfigError> {
        use nutriload_integrations::http::HttpLoader;

        Ok(pipeline.with_source(
            kind,
            HttpLoader::for_source(base_url, kind).with_timeout(self.http_timeout),
        ))
    }

    #[cfg(not(feature = "http"))]
    fn with_http_source(
        &self,
        _pipeline: Pipeline,
        _base_url: &str,
        _kind: SourceKind,
    ) -> Result<Pipeline, ConfigError> {
        Err(ConfigError::Unsupported("NUTRILOAD_BASE_URL"))
    }
}

fn parse<T>(
    lookup: impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = lookup(var) else {
        return Ok(default);
    };

    value
        .trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::Invalid {
            var,
            value,
            reason: err.to_string(),
        })
}

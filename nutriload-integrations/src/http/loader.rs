use std::time::Duration;

use anyhow::Context as _;
use derive_builder::Builder;
use futures_util::{Stream, StreamExt as _, TryStreamExt as _};
use nutriload_core::{LineStream, Loader, SourceKind};
use tokio::io::AsyncBufReadExt as _;
use tokio_util::io::StreamReader;

/// Default time to wait for the response or the next chunk of its body
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Streams the lines of a remote source.
///
/// The response body is read incrementally, so large sources are never held in memory. A
/// non-success status and an expired timeout are errors, which make the source unreadable.
///
/// The timeout bounds each wait on the server, not the whole transfer. Time the consumer spends
/// between lines does not count.
///
/// # Example
///
/// ```no_run
/// # use nutriload_core::SourceKind;
/// # use nutriload_integrations::http::HttpLoader;
/// let loader = HttpLoader::for_source("https://example.com/data", SourceKind::BrandedFoods);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct HttpLoader {
    url: String,

    #[builder(default)]
    client: reqwest::Client,

    /// Applies to the response headers and to every read of the body
    #[builder(default = "DEFAULT_TIMEOUT")]
    timeout: Duration,
}

impl HttpLoader {
    pub fn builder() -> HttpLoaderBuilder {
        HttpLoaderBuilder::default()
    }

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Loader for the conventional file name of `kind` below `base_url`
    pub fn for_source(base_url: impl AsRef<str>, kind: SourceKind) -> Self {
        Self::new(format!(
            "{}/{}",
            base_url.as_ref().trim_end_matches('/'),
            kind.file_name()
        ))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Loader for HttpLoader {
    fn lines(&self) -> LineStream {
        fetch_lines(self.client.clone(), self.url.clone(), self.timeout)
            .boxed()
            .into()
    }
}

fn fetch_lines(
    client: reqwest::Client,
    url: String,
    timeout: Duration,
) -> impl Stream<Item = anyhow::Result<String>> + Send {
    async_stream::try_stream! {
        tracing::debug!(%url, "Fetching source");
        let response = tokio::time::timeout(timeout, client.get(&url).send())
            .await
            .with_context(|| format!("Timed out fetching {url}"))?
            .with_context(|| format!("Failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("Failed to fetch {url}"))?;

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut lines = StreamReader::new(Box::pin(body)).lines();

        loop {
            let line = tokio::time::timeout(timeout, lines.next_line())
                .await
                .with_context(|| format!("Timed out reading body of {url}"))?
                .with_context(|| format!("Failed to read body of {url}"))?;
            let Some(line) = line else { break };
            yield line;
        }
    }
}

//! Load a source from a local file
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use futures_util::{Stream, StreamExt as _};
use nutriload_core::{LineStream, Loader, SourceKind};
use tokio::io::{AsyncBufReadExt as _, BufReader};

/// Streams the lines of a file on disk.
///
/// The file is opened when the stream is first polled and read through a buffered reader, so
/// memory use does not depend on the size of the file.
///
/// # Example
///
/// ```no_run
/// # use nutriload_core::SourceKind;
/// # use nutriload_ingest::{Pipeline, loaders::FileLoader, persist::MemoryCatalog};
/// let pipeline = Pipeline::new(MemoryCatalog::default()).with_source(
///     SourceKind::BrandedFoods,
///     FileLoader::for_source("./data", SourceKind::BrandedFoods),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct FileLoader {
    pub(crate) path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader for the conventional file name of `kind` inside `dir`
    pub fn for_source(dir: impl AsRef<Path>, kind: SourceKind) -> Self {
        Self::new(dir.as_ref().join(kind.file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for FileLoader {
    fn lines(&self) -> LineStream {
        read_lines(self.path.clone()).boxed().into()
    }
}

fn read_lines(path: PathBuf) -> impl Stream<Item = anyhow::Result<String>> + Send {
    async_stream::try_stream! {
        tracing::debug!(path = %path.display(), "Reading source file");
        let file = fs_err::tokio::File::open(&path).await?;
        let mut lines = BufReader::new(file).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("Failed to read line from {}", path.display()))?
        {
            yield line;
        }
    }
}

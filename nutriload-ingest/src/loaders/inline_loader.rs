use std::sync::Arc;

use nutriload_core::{LineStream, Loader};

/// Serves a source from text held in memory.
///
/// Handy for fixtures and small reference datasets.
#[derive(Clone, Debug, Default)]
pub struct InlineLoader {
    text: Arc<str>,
}

impl InlineLoader {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }
}

impl Loader for InlineLoader {
    fn lines(&self) -> LineStream {
        let lines = self.text.lines().map(str::to_string).collect::<Vec<_>>();
        LineStream::from_items(lines)
    }
}

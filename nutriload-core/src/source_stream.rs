#![allow(clippy::from_over_into)]

//! This module defines the `SourceStream` type, which is used by loaders and the line-record
//! reader for handling asynchronous streams of items read from a source.

use anyhow::Result;
use futures_util::stream::{self, Stream};
use std::pin::Pin;

pub use futures_util::StreamExt;

use crate::errors::SkipReason;
use crate::records::JsonLine;

/// A stream of raw text lines, as produced by a [`crate::Loader`].
pub type LineStream = SourceStream<String>;

/// A stream of decoded lines, as produced by the line-record reader.
pub type RecordStream = SourceStream<LineOutcome>;

/// Outcome of decoding a single non-noise line.
#[derive(Debug, Clone, PartialEq, strum_macros::EnumIs)]
pub enum LineOutcome {
    Record(JsonLine),
    Skipped(SkipReason),
}

// We need to inform the compiler that `inner` is pinned as well
/// An asynchronous stream of `Result<T>` items read from a source.
///
/// Errors in the stream are fatal to whoever consumes it; recoverable problems are expressed in
/// `T` itself (see [`LineOutcome`]).
///
/// Streams, iterators and vectors of `Result<T>` can be converted into a `SourceStream`.
#[pin_project::pin_project]
pub struct SourceStream<T> {
    #[pin]
    pub(crate) inner: Pin<Box<dyn Stream<Item = Result<T>> + Send>>,
}

impl<T> Stream for SourceStream<T> {
    type Item = Result<T>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let this = self.project();
        this.inner.poll_next(cx)
    }
}

impl<T: Send + 'static> Into<SourceStream<T>> for Vec<Result<T>> {
    fn into(self) -> SourceStream<T> {
        SourceStream::iter(self)
    }
}

impl<T> Into<SourceStream<T>> for Pin<Box<dyn Stream<Item = Result<T>> + Send>> {
    fn into(self) -> SourceStream<T> {
        SourceStream { inner: self }
    }
}

impl<T: Send + 'static> From<anyhow::Error> for SourceStream<T> {
    fn from(err: anyhow::Error) -> Self {
        SourceStream::iter(vec![Err(err)])
    }
}

impl<T: Send + 'static> SourceStream<T> {
    /// Creates a `SourceStream` from an iterator of `Result<T>`.
    pub fn iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<T>> + Send + 'static,
        <I as IntoIterator>::IntoIter: Send,
    {
        SourceStream {
            inner: stream::iter(iter).boxed(),
        }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        SourceStream::iter(items.into_iter().map(Ok))
    }
}

impl SourceStream<String> {
    /// Convenience for building a line stream from anything string-like
    pub fn from_lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        SourceStream::from_items(lines.into_iter().map(Into::into).collect())
    }
}

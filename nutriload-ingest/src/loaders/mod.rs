//! Loaders yield the raw text lines of a source.
//!
//! Every loader can be read any number of times; each call to [`nutriload_core::Loader::lines`]
//! starts from the beginning of the source.

pub mod file_loader;
pub mod inline_loader;

pub use file_loader::FileLoader;
pub use inline_loader::InlineLoader;

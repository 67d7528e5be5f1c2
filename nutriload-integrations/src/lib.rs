// show feature flags in the generated documentation
// https://doc.rust-lang.org/rustdoc/unstable-features.html#extensions-to-the-doc-attribute
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Integrations with external stores and sources.

#[cfg(feature = "duckdb")]
pub mod duckdb;
#[cfg(feature = "http")]
pub mod http;

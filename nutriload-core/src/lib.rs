#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog_traits;
pub mod errors;
mod food;
pub mod ingest_traits;
mod records;
mod source_stream;
pub mod stats;
pub mod store_decorators;

/// All traits are available from the root
pub use crate::catalog_traits::*;
pub use crate::ingest_traits::*;

pub use crate::errors::{PipelineError, SkipReason};
pub use crate::food::*;
pub use crate::records::*;
pub use crate::source_stream::*;
pub use crate::stats::*;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "test-utils")]
pub mod test_utils;


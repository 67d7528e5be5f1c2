//! Read sources from a remote host.
mod loader;

pub use loader::{HttpLoader, HttpLoaderBuilder};

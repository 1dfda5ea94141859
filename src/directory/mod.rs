//! Remote feed-directory search.
//!
//! The directory is an HTTP JSON API searched by kind and query string.
//! Results are relevance-ranked by the server; this module preserves their
//! order and does no deduplication of its own — that is the reconciler's job.

mod client;

pub use client::{DirectoryClient, DirectoryError, DirectoryResult};

//! Feed document fetching and metadata extraction.
//!
//! Selection resolution needs real metadata for a feed before it can be
//! persisted; this module fetches the feed document over HTTP and pulls the
//! title, description, and artwork out of the RSS/Atom payload.

mod fetch;

pub use fetch::{FeedFetcher, FeedMetadata, FetchError};

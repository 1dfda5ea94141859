//! Selection resolution: turning a picked search result into exactly one
//! persisted feed.
//!
//! Picking an entry from the "following" group is trivial — the feed is
//! already persisted. Picking a directory entry is an upsert-by-identity:
//! if a feed with that identity exists locally it is returned untouched,
//! otherwise the feed document is fetched, its metadata persisted, and the
//! new row returned. Concurrent picks of the same identity are serialized
//! in-process so only one fetch-and-persist runs.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::directory::DirectoryResult;
use crate::feed::{FeedFetcher, FetchError};
use crate::search::ReconciledEntry;
use crate::storage::{Database, DatabaseError, FeedKind, NewFeed, SubscribedFeed};
use crate::util::normalize_identity;

/// Errors that can occur while resolving a selection.
///
/// Resolution is not acknowledged until persistence succeeds; any variant
/// here means no selection happened as far as the caller is concerned.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("feed lookup failed: {0}")]
    Database(#[from] DatabaseError),
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Resolves selected search results into persisted feeds.
pub struct Resolver {
    db: Database,
    fetcher: FeedFetcher,
    /// Per-identity gates serializing concurrent fetch-and-persist runs.
    /// Entries are dropped once a resolution finishes; the UNIQUE constraint
    /// on the feed URL column backstops any window where two callers race
    /// past each other onto fresh gates.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Resolver {
    pub fn new(db: Database, fetcher: FeedFetcher) -> Self {
        Self {
            db,
            fetcher,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve any reconciled entry into its canonical persisted feed.
    pub async fn resolve(&self, entry: &ReconciledEntry) -> Result<SubscribedFeed, ResolveError> {
        match entry {
            ReconciledEntry::Subscribed(feed) => Ok(feed.clone()),
            ReconciledEntry::Directory(result) => self.resolve_directory(result).await,
        }
    }

    /// Resolve a directory search result.
    ///
    /// Idempotent: repeated or concurrent calls for the same identity yield
    /// the same single persisted row. The directory entry's description and
    /// image are kept as fallbacks for metadata the feed document omits.
    pub async fn resolve_directory(
        &self,
        result: &DirectoryResult,
    ) -> Result<SubscribedFeed, ResolveError> {
        self.resolve_url(
            &result.feed_url,
            result.kind,
            result.description.clone(),
            result.image_url.clone(),
        )
        .await
    }

    /// Subscribe to a feed by URL, outside of any directory search.
    pub async fn subscribe(
        &self,
        url: &str,
        kind: FeedKind,
    ) -> Result<SubscribedFeed, ResolveError> {
        self.resolve_url(url, kind, None, None).await
    }

    async fn resolve_url(
        &self,
        url: &str,
        kind: FeedKind,
        fallback_description: Option<String>,
        fallback_image: Option<String>,
    ) -> Result<SubscribedFeed, ResolveError> {
        let identity = normalize_identity(url);

        let gate = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(identity.clone()).or_default())
        };
        let held = gate.lock().await;

        let result = self
            .fetch_and_persist(url, kind, fallback_description, fallback_image)
            .await;

        drop(held);
        self.inflight.lock().await.remove(&identity);

        result
    }

    async fn fetch_and_persist(
        &self,
        url: &str,
        kind: FeedKind,
        fallback_description: Option<String>,
        fallback_image: Option<String>,
    ) -> Result<SubscribedFeed, ResolveError> {
        // Fast path: the feed already exists locally. No new record, no fetch.
        if let Some(existing) = self.db.get_feed_by_url(url).await? {
            tracing::debug!(url = %existing.url, "selection resolved to existing feed");
            return Ok(existing);
        }

        let metadata = self.fetcher.fetch_metadata(url).await?;

        let feed = self
            .db
            .upsert_feed(&NewFeed {
                url: url.to_owned(),
                title: metadata.title,
                kind,
                description: metadata.description.or(fallback_description),
                image_url: metadata.image_url.or(fallback_image),
            })
            .await?;

        tracing::info!(url = %feed.url, title = %feed.title, "persisted new feed");
        Ok(feed)
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::directory::{DirectoryClient, DirectoryError};
use crate::storage::{Database, DatabaseError, FeedKind};
use crate::util::MAX_SEARCH_QUERY_LENGTH;

use super::reconciler::{reconcile, ReconciledResults};

/// Errors that abort a search outright.
///
/// A remote directory failure is deliberately not represented here: it
/// degrades the outcome instead of failing it (see [`SearchOutcome`]).
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query exceeds the maximum supported length
    #[error("search query exceeds maximum length of {MAX_SEARCH_QUERY_LENGTH} characters")]
    QueryTooLong,
    /// The local subscription query failed; no partial results are produced
    #[error("local feed query failed: {0}")]
    Local(#[from] DatabaseError),
}

/// The result of one completed, non-superseded search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// The query string this outcome answers.
    pub query: String,
    /// The reconciled, deduplicated result groups.
    pub results: ReconciledResults,
    /// Set when the remote search failed and the outcome degraded to
    /// local-only results. Callers may surface it or ignore it; the
    /// degradation itself is already logged.
    pub directory_error: Option<DirectoryError>,
}

/// Orchestrates one user's search stream with last-query-wins semantics.
///
/// Every call to [`search`](Self::search) stamps itself as the active query.
/// There is no cancellation of in-flight remote requests; instead, a search
/// that finds itself superseded when its remote leg completes discards its
/// own result. A slow response for an old query can therefore never
/// overwrite the outcome of a newer one.
pub struct SearchSession {
    db: Database,
    directory: DirectoryClient,
    generation: AtomicU64,
}

impl SearchSession {
    pub fn new(db: Database, directory: DirectoryClient) -> Self {
        Self {
            db,
            directory,
            generation: AtomicU64::new(0),
        }
    }

    /// Run a search: local subscriptions first, remote directory joined after.
    ///
    /// Returns `Ok(None)` when this search was superseded by a newer one
    /// before its results could be assembled — the caller should drop it and
    /// await the newer search's outcome instead.
    ///
    /// The remote leg only runs when `kind` is given (directory searches are
    /// kind-scoped); without a kind the outcome is local-only by
    /// construction. A remote failure degrades the outcome to local-only and
    /// records the error on it.
    ///
    /// # Errors
    ///
    /// [`SearchError::Local`] if the subscription store query fails; the
    /// search aborts with no partial output.
    pub async fn search(
        &self,
        query: &str,
        kind: Option<FeedKind>,
    ) -> Result<Option<SearchOutcome>, SearchError> {
        // Stamp this query as the active one; everything older is now stale.
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim();
        if query.is_empty() {
            return Ok(Some(SearchOutcome {
                query: String::new(),
                results: ReconciledResults::default(),
                directory_error: None,
            }));
        }
        if query.len() > MAX_SEARCH_QUERY_LENGTH {
            return Err(SearchError::QueryTooLong);
        }

        let subscribed = self.db.query_feeds(query, kind).await?;

        let (directory_results, directory_error) = match kind {
            Some(kind) => match self.directory.search(kind, query).await {
                Ok(results) => (results, None),
                Err(e) => {
                    tracing::warn!(
                        query = %query,
                        error = %e,
                        "directory search failed, showing local results only"
                    );
                    (Vec::new(), Some(e))
                }
            },
            None => (Vec::new(), None),
        };

        // Completion-time staleness check: a newer query has been stamped
        // while this one was in flight.
        if self.generation.load(Ordering::SeqCst) != token {
            tracing::debug!(query = %query, "discarding superseded search result");
            return Ok(None);
        }

        Ok(Some(SearchOutcome {
            query: query.to_owned(),
            results: reconcile(subscribed, directory_results),
            directory_error,
        }))
    }
}

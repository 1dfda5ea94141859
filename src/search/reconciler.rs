use std::collections::HashSet;

use crate::directory::DirectoryResult;
use crate::storage::SubscribedFeed;
use crate::util::normalize_identity;

/// One row of a reconciled result list.
///
/// A tagged union over the two result sources, used only for display
/// grouping; it carries no identity beyond its wrapped value.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconciledEntry {
    /// A feed the user already follows (from the local store).
    Subscribed(SubscribedFeed),
    /// A feed found in the remote directory, not yet subscribed.
    Directory(DirectoryResult),
}

impl ReconciledEntry {
    /// The deduplication identity of this entry (normalized feed URL).
    pub fn identity(&self) -> String {
        match self {
            ReconciledEntry::Subscribed(feed) => normalize_identity(&feed.url),
            ReconciledEntry::Directory(result) => normalize_identity(&result.feed_url),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ReconciledEntry::Subscribed(feed) => &feed.title,
            ReconciledEntry::Directory(result) => &result.title,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ReconciledEntry::Subscribed(feed) => feed.description.as_deref(),
            ReconciledEntry::Directory(result) => result.description.as_deref(),
        }
    }
}

/// The two disjoint presentation groups produced by [`reconcile`].
#[derive(Debug, Clone, Default)]
pub struct ReconciledResults {
    /// Feeds the user already follows, in local-query order (title ascending).
    pub following: Vec<ReconciledEntry>,
    /// Directory results that survived deduplication, in server order.
    pub directory: Vec<ReconciledEntry>,
}

impl ReconciledResults {
    pub fn is_empty(&self) -> bool {
        self.following.is_empty() && self.directory.is_empty()
    }
}

/// Merge locally-subscribed feeds with remote directory results into two
/// deduplicated groups.
///
/// A directory entry whose identity matches a subscribed feed is suppressed:
/// the local record is the one the user has a relationship with, and showing
/// both would present the same feed twice. Order within each group is
/// preserved exactly as given — the local query sorts by title, the server
/// ranks by relevance, and neither ordering is this function's business.
///
/// Guarantees, for all inputs:
/// - the two groups share no identity
/// - every subscribed feed appears in `following` (none are dropped)
/// - deterministic given identical inputs
pub fn reconcile(
    subscribed: Vec<SubscribedFeed>,
    directory: Vec<DirectoryResult>,
) -> ReconciledResults {
    let known: HashSet<String> = subscribed
        .iter()
        .map(|feed| normalize_identity(&feed.url))
        .collect();

    let directory = directory
        .into_iter()
        .filter(|result| !known.contains(&normalize_identity(&result.feed_url)))
        .map(ReconciledEntry::Directory)
        .collect();

    let following = subscribed
        .into_iter()
        .map(ReconciledEntry::Subscribed)
        .collect();

    ReconciledResults {
        following,
        directory,
    }
}

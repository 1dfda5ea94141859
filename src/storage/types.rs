use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of braid appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A stored feed row contains a kind the application does not know
    #[error("Unknown feed kind in database: {0}")]
    UnknownKind(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Feed Kind
// ============================================================================

/// The directory category a feed belongs to.
///
/// Local queries may filter by kind; remote directory searches are always
/// scoped to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    #[default]
    Podcast,
    Video,
    Newsletter,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Podcast => "podcast",
            FeedKind::Video => "video",
            FeedKind::Newsletter => "newsletter",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "podcast" => Ok(FeedKind::Podcast),
            "video" => Ok(FeedKind::Video),
            "newsletter" => Ok(FeedKind::Newsletter),
            other => Err(format!("unknown feed kind: {other}")),
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A feed the user follows, as stored in the local database.
///
/// The `url` column is the feed's identity: it is normalized before insert
/// (see [`crate::util::normalize_identity`]) and carries a UNIQUE constraint,
/// which makes every write an upsert-by-identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribedFeed {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub kind: FeedKind,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Unix timestamp of the original subscription; preserved across refreshes.
    pub subscribed_at: i64,
    /// Unix timestamp of the last successful metadata refresh.
    pub last_refreshed: Option<i64>,
}

/// Input shape for subscribing or refreshing a feed.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub url: String,
    pub title: String,
    pub kind: FeedKind,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Internal row type for feed queries (used by sqlx FromRow).
/// The `kind` column is TEXT; conversion to [`FeedKind`] happens in
/// `into_feed()` so a corrupted row surfaces as a typed error instead of
/// a silent default.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedDbRow {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub kind: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub subscribed_at: i64,
    pub last_refreshed: Option<i64>,
}

impl FeedDbRow {
    pub(crate) fn into_feed(self) -> Result<SubscribedFeed, DatabaseError> {
        let kind = self
            .kind
            .parse::<FeedKind>()
            .map_err(|_| DatabaseError::UnknownKind(self.kind.clone()))?;

        Ok(SubscribedFeed {
            id: self.id,
            url: self.url,
            title: self.title,
            kind,
            description: self.description,
            image_url: self.image_url,
            subscribed_at: self.subscribed_at,
            last_refreshed: self.last_refreshed,
        })
    }
}

use crate::util::normalize_identity;

use super::schema::Database;
use super::types::{DatabaseError, FeedDbRow, FeedKind, NewFeed, SubscribedFeed};

const FEED_COLUMNS: &str =
    "id, url, title, kind, description, image_url, subscribed_at, last_refreshed";

/// Escape `%`, `_`, and `\` in user input destined for a LIKE pattern.
/// Paired with `ESCAPE '\'` in the query so a search for "100%" matches
/// literally instead of as a wildcard.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a feed, or update it in place if its identity already exists.
    ///
    /// The feed URL is normalized before insert so equivalent spellings hit
    /// the same row. On conflict the title, kind, and refresh timestamp are
    /// replaced; description and image only when the new value is non-NULL
    /// (a refresh without metadata must not erase what a search result
    /// provided). `subscribed_at` is never touched after the first insert.
    pub async fn upsert_feed(&self, feed: &NewFeed) -> Result<SubscribedFeed, DatabaseError> {
        let identity = normalize_identity(&feed.url);
        let now = chrono::Utc::now().timestamp();

        let row: FeedDbRow = sqlx::query_as(
            r#"
            INSERT INTO feeds (url, title, kind, description, image_url, subscribed_at, last_refreshed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                kind = excluded.kind,
                description = COALESCE(excluded.description, description),
                image_url = COALESCE(excluded.image_url, image_url),
                last_refreshed = excluded.last_refreshed
            RETURNING id, url, title, kind, description, image_url, subscribed_at, last_refreshed
        "#,
        )
        .bind(&identity)
        .bind(&feed.title)
        .bind(feed.kind.as_str())
        .bind(&feed.description)
        .bind(&feed.image_url)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.into_feed()
    }

    /// Look up a feed by its identity. Returns `None` when not subscribed.
    pub async fn get_feed_by_url(
        &self,
        url: &str,
    ) -> Result<Option<SubscribedFeed>, DatabaseError> {
        let identity = normalize_identity(url);

        let row: Option<FeedDbRow> =
            sqlx::query_as(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"))
                .bind(&identity)
                .fetch_optional(&self.pool)
                .await?;

        row.map(FeedDbRow::into_feed).transpose()
    }

    /// Query subscribed feeds whose title contains the search string.
    ///
    /// Matching is case-insensitive (SQLite LIKE semantics); results are
    /// sorted by title ascending, case-insensitively, which is the order the
    /// "following" group preserves through reconciliation.
    pub async fn query_feeds(
        &self,
        matching: &str,
        kind: Option<FeedKind>,
    ) -> Result<Vec<SubscribedFeed>, DatabaseError> {
        let pattern = format!("%{}%", escape_like(matching));

        let rows: Vec<FeedDbRow> = match kind {
            Some(kind) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {FEED_COLUMNS} FROM feeds
                    WHERE title LIKE ? ESCAPE '\' AND kind = ?
                    ORDER BY title COLLATE NOCASE ASC
                "#
                ))
                .bind(&pattern)
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {FEED_COLUMNS} FROM feeds
                    WHERE title LIKE ? ESCAPE '\'
                    ORDER BY title COLLATE NOCASE ASC
                "#
                ))
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(FeedDbRow::into_feed).collect()
    }

    /// All subscribed feeds, optionally filtered by kind, title ascending.
    pub async fn all_feeds(
        &self,
        kind: Option<FeedKind>,
    ) -> Result<Vec<SubscribedFeed>, DatabaseError> {
        self.query_feeds("", kind).await
    }

    /// Remove a feed by identity. Returns whether a row was deleted.
    pub async fn remove_feed(&self, url: &str) -> Result<bool, DatabaseError> {
        let identity = normalize_identity(url);

        let result = sqlx::query("DELETE FROM feeds WHERE url = ?")
            .bind(&identity)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn test_feed(title: &str, url: &str) -> NewFeed {
        NewFeed {
            url: url.to_string(),
            title: title.to_string(),
            kind: FeedKind::Podcast,
            description: Some("A test feed".to_string()),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_new_feed() {
        let db = test_db().await;
        let feed = db
            .upsert_feed(&test_feed("Rustacean Station", "https://rustacean.fm/feed"))
            .await
            .unwrap();

        assert!(feed.id > 0);
        assert_eq!(feed.title, "Rustacean Station");
        assert_eq!(feed.url, "https://rustacean.fm/feed");
        assert!(feed.last_refreshed.is_some());
    }

    #[tokio::test]
    async fn test_upsert_same_identity_is_one_row() {
        let db = test_db().await;
        let first = db
            .upsert_feed(&test_feed("Old Title", "https://a.com/feed"))
            .await
            .unwrap();
        // Trailing slash normalizes to the same identity
        let second = db
            .upsert_feed(&test_feed("New Title", "https://a.com/feed/"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "New Title");
        assert_eq!(
            first.subscribed_at, second.subscribed_at,
            "subscription timestamp must survive upsert"
        );

        let all = db.all_feeds(None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_conflict_keeps_description_when_new_is_none() {
        let db = test_db().await;
        db.upsert_feed(&test_feed("Feed", "https://a.com/feed"))
            .await
            .unwrap();

        let refresh = NewFeed {
            description: None,
            ..test_feed("Feed", "https://a.com/feed")
        };
        let updated = db.upsert_feed(&refresh).await.unwrap();
        assert_eq!(updated.description.as_deref(), Some("A test feed"));
    }

    #[tokio::test]
    async fn test_query_matches_substring_case_insensitive() {
        let db = test_db().await;
        db.upsert_feed(&test_feed("The Rust Podcast", "https://a.com/feed"))
            .await
            .unwrap();
        db.upsert_feed(&test_feed("Go Time", "https://b.com/feed"))
            .await
            .unwrap();

        let results = db.query_feeds("rust", None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "The Rust Podcast");
    }

    #[tokio::test]
    async fn test_query_sorts_title_ascending_case_insensitive() {
        let db = test_db().await;
        db.upsert_feed(&test_feed("banana weekly", "https://b.com/feed"))
            .await
            .unwrap();
        db.upsert_feed(&test_feed("Apple Talk", "https://a.com/feed"))
            .await
            .unwrap();
        db.upsert_feed(&test_feed("Cherry Cast", "https://c.com/feed"))
            .await
            .unwrap();

        let results = db.query_feeds("", None).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Apple Talk", "banana weekly", "Cherry Cast"]);
    }

    #[tokio::test]
    async fn test_query_filters_by_kind() {
        let db = test_db().await;
        db.upsert_feed(&test_feed("News Show", "https://a.com/feed"))
            .await
            .unwrap();
        db.upsert_feed(&NewFeed {
            kind: FeedKind::Video,
            ..test_feed("News Channel", "https://b.com/feed")
        })
        .await
        .unwrap();

        let podcasts = db
            .query_feeds("News", Some(FeedKind::Podcast))
            .await
            .unwrap();
        assert_eq!(podcasts.len(), 1);
        assert_eq!(podcasts[0].title, "News Show");

        let videos = db.query_feeds("News", Some(FeedKind::Video)).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "News Channel");
    }

    #[tokio::test]
    async fn test_query_escapes_like_wildcards() {
        let db = test_db().await;
        db.upsert_feed(&test_feed("100% Feed", "https://a.com/feed"))
            .await
            .unwrap();
        db.upsert_feed(&test_feed("1000 Feed", "https://b.com/feed"))
            .await
            .unwrap();

        // An unescaped "%" would match both titles
        let results = db.query_feeds("100%", None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "100% Feed");
    }

    #[tokio::test]
    async fn test_get_feed_by_url_normalizes() {
        let db = test_db().await;
        db.upsert_feed(&test_feed("Feed", "https://a.com/feed"))
            .await
            .unwrap();

        let found = db.get_feed_by_url("https://A.com/feed/").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().title, "Feed");

        let missing = db.get_feed_by_url("https://other.com/feed").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_remove_feed() {
        let db = test_db().await;
        db.upsert_feed(&test_feed("Feed", "https://a.com/feed"))
            .await
            .unwrap();

        assert!(db.remove_feed("https://a.com/feed").await.unwrap());
        assert!(!db.remove_feed("https://a.com/feed").await.unwrap());
        assert!(db.all_feeds(None).await.unwrap().is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}

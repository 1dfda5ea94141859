use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_feed_url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Metadata extracted from a fetched feed document.
#[derive(Debug, Clone)]
pub struct FeedMetadata {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Errors that can occur while fetching and parsing a feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The feed URL failed validation before any request was made
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),
    /// Network-level error (DNS, connection, TLS)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the 15-second timeout
    #[error("request timed out")]
    Timeout,
    /// Non-2xx HTTP response
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("feed document too large")]
    TooLarge,
    /// The document could not be parsed as RSS or Atom
    #[error("not a parseable feed: {0}")]
    Parse(String),
}

/// Fetches feed documents and extracts their metadata.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch the feed document at `url` and extract its metadata.
    ///
    /// The URL is validated first (http/https with a host), the body read is
    /// size-limited, and the payload is parsed with `feed-rs`. A feed with no
    /// title yields `"Untitled Feed"` rather than an error — feeds in the
    /// wild omit titles more often than they omit everything else.
    pub async fn fetch_metadata(&self, url: &str) -> Result<FeedMetadata, FetchError> {
        let validated = validate_feed_url(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let response = tokio::time::timeout(FETCH_TIMEOUT, self.client.get(validated).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response).await?;
        parse_metadata(&bytes)
    }
}

/// Reads the response body with a size limit using stream-based reading.
async fn read_limited_bytes(response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_FEED_SIZE {
            return Err(FetchError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > MAX_FEED_SIZE {
            return Err(FetchError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

fn parse_metadata(bytes: &[u8]) -> Result<FeedMetadata, FetchError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    let title = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Untitled Feed".to_owned());

    let description = feed.description.map(|d| d.content);

    let image_url = feed
        .logo
        .map(|img| img.uri)
        .or_else(|| feed.icon.map(|img| img.uri));

    Ok(FeedMetadata {
        title,
        description,
        image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FULL_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Rustacean Station</title>
    <description>A community podcast about Rust</description>
    <image>
      <url>https://rustacean-station.org/cover.png</url>
      <title>Rustacean Station</title>
      <link>https://rustacean-station.org</link>
    </image>
    <item><guid>1</guid><title>Episode 1</title></item>
  </channel>
</rss>"#;

    const BARE_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item><guid>1</guid><title>Episode</title></item>
</channel></rss>"#;

    async fn mock_feed(body: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_string(body)
                    .insert_header("Content-Type", "application/rss+xml"),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_extracts_metadata() {
        let server = mock_feed(FULL_RSS, 200).await;
        let fetcher = FeedFetcher::new(reqwest::Client::new());

        let meta = fetcher
            .fetch_metadata(&format!("{}/feed", server.uri()))
            .await
            .unwrap();

        assert_eq!(meta.title, "Rustacean Station");
        assert_eq!(
            meta.description.as_deref(),
            Some("A community podcast about Rust")
        );
        assert_eq!(
            meta.image_url.as_deref(),
            Some("https://rustacean-station.org/cover.png")
        );
    }

    #[tokio::test]
    async fn test_fetch_untitled_feed_gets_default_title() {
        let server = mock_feed(BARE_RSS, 200).await;
        let fetcher = FeedFetcher::new(reqwest::Client::new());

        let meta = fetcher
            .fetch_metadata(&format!("{}/feed", server.uri()))
            .await
            .unwrap();

        assert_eq!(meta.title, "Untitled Feed");
        assert!(meta.description.is_none());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = mock_feed("", 404).await;
        let fetcher = FeedFetcher::new(reqwest::Client::new());

        let result = fetcher
            .fetch_metadata(&format!("{}/feed", server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_fetch_not_a_feed() {
        let server = mock_feed("<html><body>nope</body></html>", 200).await;
        let fetcher = FeedFetcher::new(reqwest::Client::new());

        let result = fetcher
            .fetch_metadata(&format!("{}/feed", server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let fetcher = FeedFetcher::new(reqwest::Client::new());

        let result = fetcher.fetch_metadata("ftp://example.com/feed").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; MAX_FEED_SIZE + 1]))
            .mount(&server)
            .await;
        let fetcher = FeedFetcher::new(reqwest::Client::new());

        let result = fetcher
            .fetch_metadata(&format!("{}/feed", server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::TooLarge)));
    }
}

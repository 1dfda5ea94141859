use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::storage::FeedKind;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// A single entry from a directory search response.
///
/// Exists only for the duration of one query; never persisted as-is. The
/// `feed_url` field is the entry's identity for deduplication against
/// subscribed feeds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryResult {
    pub title: String,
    pub feed_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Kind of the feed. The wire field is optional; the client stamps every
    /// result with the kind the search was scoped to, so downstream code can
    /// rely on it being meaningful.
    #[serde(rename = "feedType", default)]
    pub kind: FeedKind,
}

/// Errors that can occur during a directory search.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The configured base URL is not a valid http(s) URL
    #[error("invalid directory base URL: {0}")]
    InvalidBaseUrl(String),
    /// HTTP request failed (DNS, connection, TLS)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the 10-second timeout
    #[error("directory search timed out")]
    Timeout,
    /// Non-2xx HTTP response
    #[error("directory returned HTTP {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 2MB size limit
    #[error("directory response too large")]
    TooLarge,
    /// Response body was not the expected JSON shape
    #[error("malformed directory response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the remote feed directory.
///
/// Holds an explicit `reqwest::Client` and base URL rather than reaching for
/// shared global state; callers construct one and pass it where needed.
#[derive(Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: Url,
}

impl DirectoryClient {
    /// Create a client for the directory at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidBaseUrl`] if the base URL does not
    /// parse or uses a scheme other than http/https.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, DirectoryError> {
        let url = Url::parse(base_url)
            .map_err(|e| DirectoryError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DirectoryError::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        Ok(Self {
            client,
            base_url: url,
        })
    }

    /// Search the directory for feeds of `kind` matching `query`.
    ///
    /// Returns results in server order (relevance-ranked). An empty or
    /// whitespace-only query short-circuits to an empty result set without
    /// touching the network.
    pub async fn search(
        &self,
        kind: FeedKind,
        query: &str,
    ) -> Result<Vec<DirectoryResult>, DirectoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut endpoint = self
            .base_url
            .join("search")
            .map_err(|e| DirectoryError::InvalidBaseUrl(e.to_string()))?;
        endpoint
            .query_pairs_mut()
            .append_pair("type", kind.as_str())
            .append_pair("q", query);

        tracing::debug!(kind = %kind, query = %query, "directory search");

        let response = tokio::time::timeout(SEARCH_TIMEOUT, self.client.get(endpoint).send())
            .await
            .map_err(|_| DirectoryError::Timeout)?
            .map_err(DirectoryError::Network)?;

        if !response.status().is_success() {
            return Err(DirectoryError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response).await?;
        let mut results: Vec<DirectoryResult> = serde_json::from_slice(&bytes)?;

        // The search is kind-scoped; stamp results so the wire field being
        // absent never leaks a default kind into persistence.
        for result in &mut results {
            result.kind = kind;
        }

        Ok(results)
    }
}

/// Reads the response body with a size limit using stream-based reading.
async fn read_limited_bytes(response: reqwest::Response) -> Result<Vec<u8>, DirectoryError> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_RESPONSE_SIZE {
            return Err(DirectoryError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DirectoryError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > MAX_RESPONSE_SIZE {
            return Err(DirectoryError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

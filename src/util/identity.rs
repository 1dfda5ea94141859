use thiserror::Error;
use url::Url;

/// Errors that can occur during feed URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a feed source.
///
/// Feed URLs arrive from two untrusted places — the remote directory and the
/// user's command line — so anything that is not a well-formed http(s) URL
/// with a host is rejected before a request is ever built from it.
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Normalizes a feed URL path into its deduplication identity.
///
/// The identity is the key compared across the local store and remote
/// directory results, so equivalent spellings must collapse to one value:
/// scheme and host are lowercased (the `url` parser already does this),
/// fragments are dropped, and a single trailing slash is stripped.
/// Strings that do not parse as URLs are compared byte-wise after trimming.
pub fn normalize_identity(raw: &str) -> String {
    let trimmed = raw.trim();

    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            let mut s = url.to_string();
            // Url::to_string renders a bare authority as "https://host/";
            // strip that canonical slash so "https://a.com" == "https://a.com/".
            if s.ends_with('/') && !s.ends_with("//") {
                s.pop();
            }
            s
        }
        Err(_) => trimmed.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_https() {
        let url = validate_feed_url("https://example.com/feed.xml").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_validate_rejects_file_scheme() {
        let result = validate_feed_url("file:///etc/passwd");
        assert!(matches!(
            result,
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(matches!(
            validate_feed_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_normalize_strips_trailing_slash() {
        assert_eq!(
            normalize_identity("https://a.com/feed/"),
            normalize_identity("https://a.com/feed")
        );
    }

    #[test]
    fn test_normalize_lowercases_host() {
        assert_eq!(
            normalize_identity("https://A.Com/Feed"),
            "https://a.com/Feed"
        );
    }

    #[test]
    fn test_normalize_preserves_path_case() {
        // URL paths are case-sensitive; only scheme/host fold.
        assert_ne!(
            normalize_identity("https://a.com/Feed"),
            normalize_identity("https://a.com/feed")
        );
    }

    #[test]
    fn test_normalize_drops_fragment() {
        assert_eq!(
            normalize_identity("https://a.com/feed#latest"),
            "https://a.com/feed"
        );
    }

    #[test]
    fn test_normalize_bare_host_equals_slashed() {
        assert_eq!(
            normalize_identity("https://a.com"),
            normalize_identity("https://a.com/")
        );
    }

    #[test]
    fn test_normalize_non_url_is_trimmed_verbatim() {
        assert_eq!(normalize_identity("  feed-id-42  "), "feed-id-42");
    }
}

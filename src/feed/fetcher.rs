use std::time::Duration;

use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::feed::parser::MalformedFeedError;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Characters `encodeURIComponent` leaves untouched; everything else is escaped.
const COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Errors that can occur while getting the feed text.
///
/// A body that arrives intact but is not an RSS document is also reported
/// here, since from the page's point of view the feed could not be loaded.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
    /// The proxied request URL could not be built
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
    /// The body was received but is not an RSS document
    #[error("Malformed feed: {0}")]
    MalformedFeed(#[from] MalformedFeedError),
}

/// Where the feed lives and how to reach it.
#[derive(Debug, Clone)]
pub struct FeedSource {
    /// The newsletter's RSS URL, e.g. `https://author.substack.com/feed`.
    pub feed_url: String,
    /// Proxy base the encoded feed URL is appended to, e.g. `https://corsproxy.io/?`.
    pub proxy_url: String,
    /// `None` waits for the proxy indefinitely.
    pub timeout: Option<Duration>,
}

/// Builds the request URL: the proxy base followed by the feed URL encoded
/// the way `encodeURIComponent` does it.
///
/// ```
/// use substack_blog::feed::proxied_url;
///
/// assert_eq!(
///     proxied_url("https://corsproxy.io/?", "https://author.substack.com/feed"),
///     "https://corsproxy.io/?https%3A%2F%2Fauthor.substack.com%2Ffeed"
/// );
/// ```
pub fn proxied_url(proxy_url: &str, feed_url: &str) -> String {
    format!("{}{}", proxy_url, utf8_percent_encode(feed_url, COMPONENT_SET))
}

/// Fetches the raw feed text through the proxy.
///
/// Issues exactly one GET request; there is no retry. A non-2xx status,
/// a network failure, or an elapsed timeout is returned as a
/// [`TransportError`].
pub async fn fetch_feed(
    client: &reqwest::Client,
    source: &FeedSource,
) -> Result<String, TransportError> {
    let request_url = proxied_url(&source.proxy_url, &source.feed_url);
    let url = reqwest::Url::parse(&request_url)
        .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", request_url, e)))?;

    tracing::debug!(feed = %source.feed_url, request = %url, "Fetching feed through proxy");

    let send = client.get(url).send();
    let response = match source.timeout {
        Some(limit) => tokio::time::timeout(limit, send)
            .await
            .map_err(|_| TransportError::Timeout)?,
        None => send.await,
    }
    .map_err(TransportError::Network)?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(feed = %source.feed_url, status = %status, "Proxy returned error status");
        return Err(TransportError::HttpStatus(status.as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    tracing::debug!(feed = %source.feed_url, bytes = bytes.len(), "Feed received");

    String::from_utf8(bytes).map_err(|_| TransportError::InvalidUtf8)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(TransportError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(TransportError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

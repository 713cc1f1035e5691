use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
///
/// These errors cover both parsing failures and security policy violations
/// for the feed URL and the proxy endpoint it is relayed through.
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
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
    /// The proxy endpoint is plain HTTP on a non-local host.
    #[error("Insecure proxy URL: HTTPS required (except localhost for testing)")]
    InsecureProxy,
}

/// Validates the URL of the feed that will be requested through the proxy.
///
/// Rejects:
/// - Non-HTTP(S) schemes (e.g., `file://`, `ftp://`)
/// - URLs without a host
/// - Localhost addresses (`localhost`, `127.0.0.1`, `::1`)
/// - Private IP ranges (RFC 1918, link-local, unique local IPv6)
///
/// # Examples
///
/// ```
/// use substack_blog::util::validate_feed_url;
///
/// let url = validate_feed_url("https://author.substack.com/feed").unwrap();
/// assert_eq!(url.host_str(), Some("author.substack.com"));
///
/// assert!(validate_feed_url("http://localhost/feed").is_err());
/// assert!(validate_feed_url("http://192.168.1.1/feed").is_err());
/// assert!(validate_feed_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = parse_http_url(url_str)?;
    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;

    if host == "localhost" {
        return Err(UrlValidationError::Localhost);
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(url)
}

/// Validates the base of the CORS proxy endpoint.
///
/// The proxy must be HTTPS. Plain HTTP is accepted only for `localhost` and
/// `127.0.0.1` so a local mock proxy can stand in during tests.
///
/// The base is returned untouched (not re-serialized by [`Url`]) because the
/// encoded feed URL is appended to it verbatim, e.g. `https://corsproxy.io/?`.
pub fn validate_proxy_url(url_str: &str) -> Result<&str, UrlValidationError> {
    let url = parse_http_url(url_str)?;
    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;

    if url.scheme() == "http" {
        if host != "localhost" && host != "127.0.0.1" {
            return Err(UrlValidationError::InsecureProxy);
        }
        tracing::warn!(proxy = %url_str, "Using non-HTTPS proxy URL (localhost only)");
    }

    Ok(url_str)
}

fn parse_http_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_feed_urls() {
        assert!(validate_feed_url("https://author.substack.com/feed").is_ok());
        assert!(validate_feed_url("http://news.example.org/rss").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_feed_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_feed_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_localhost_feed_rejected() {
        assert!(validate_feed_url("http://localhost/feed").is_err());
        assert!(validate_feed_url("http://127.0.0.1/feed").is_err());
        assert!(validate_feed_url("http://[::1]/feed").is_err());
    }

    #[test]
    fn test_private_ips_rejected() {
        assert!(validate_feed_url("http://192.168.1.1/feed").is_err());
        assert!(validate_feed_url("http://10.0.0.1:3000/feed").is_err());
        assert!(validate_feed_url("http://172.16.0.1/feed").is_err());
        assert!(validate_feed_url("http://169.254.1.1/feed").is_err());
        assert!(validate_feed_url("http://[fe80::1]/feed").is_err());
        assert!(validate_feed_url("http://0.0.0.0/feed").is_err());
    }

    #[test]
    fn test_proxy_https_accepted_verbatim() {
        assert_eq!(
            validate_proxy_url("https://corsproxy.io/?").unwrap(),
            "https://corsproxy.io/?"
        );
    }

    #[test]
    fn test_proxy_plain_http_only_on_localhost() {
        assert!(validate_proxy_url("http://127.0.0.1:8080/?").is_ok());
        assert!(validate_proxy_url("http://localhost:8080/?").is_ok());
        assert!(matches!(
            validate_proxy_url("http://corsproxy.io/?"),
            Err(UrlValidationError::InsecureProxy)
        ));
    }

    #[test]
    fn test_proxy_garbage_rejected() {
        assert!(validate_proxy_url("not a url").is_err());
        assert!(validate_proxy_url("ftp://proxy.example.com/").is_err());
    }
}

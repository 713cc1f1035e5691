//! Configuration file parser for ~/.config/substack-blog/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::feed::FeedSource;
use crate::util::{validate_feed_url, validate_proxy_url, UrlValidationError};

/// Environment variable that overrides `feed_url` from the config file.
pub const FEED_URL_ENV: &str = "SUBSTACK_FEED_URL";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: UrlValidationError,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The newsletter's RSS feed.
    pub feed_url: String,

    /// CORS proxy base; the encoded feed URL is appended to it.
    pub proxy_url: String,

    /// Page that shows a single post; listing links point at `{post_page}?id={slug}`.
    pub post_page: String,

    /// Request timeout in seconds. 0 = wait indefinitely.
    pub timeout_secs: u64,

    /// Title of the single-post page; `{Post}` is replaced by the post title.
    pub title_template: String,

    /// Title of the listing page.
    pub listing_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://jamesjboyer.substack.com/feed".to_string(),
            proxy_url: "https://corsproxy.io/?".to_string(),
            post_page: "post.html".to_string(),
            timeout_secs: 30,
            title_template: "{Post} | Blog".to_string(),
            listing_title: "Blog".to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text. Blank text yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "feed_url",
                "proxy_url",
                "post_page",
                "timeout_secs",
                "title_template",
                "listing_title",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(feed = %config.feed_url, "Loaded configuration");
        Ok(config)
    }

    /// Applies `SUBSTACK_FEED_URL` if it is set and non-empty.
    /// Env var takes precedence over config file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(FEED_URL_ENV) {
            self.apply_feed_url_override(url);
        }
        self
    }

    fn apply_feed_url_override(&mut self, url: String) {
        let url = url.trim();
        if !url.is_empty() {
            tracing::debug!(feed = %url, "Feed URL overridden from environment");
            self.feed_url = url.to_string();
        }
    }

    /// Validates the URLs and builds the feed source used by the fetcher.
    pub fn feed_source(&self) -> Result<FeedSource, ConfigError> {
        let feed_url = validate_feed_url(&self.feed_url).map_err(|source| {
            ConfigError::InvalidUrl {
                field: "feed_url",
                source,
            }
        })?;
        let proxy_url = validate_proxy_url(&self.proxy_url).map_err(|source| {
            ConfigError::InvalidUrl {
                field: "proxy_url",
                source,
            }
        })?;

        Ok(FeedSource {
            feed_url: feed_url.to_string(),
            proxy_url: proxy_url.to_string(),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feed_url, "https://jamesjboyer.substack.com/feed");
        assert_eq!(config.proxy_url, "https://corsproxy.io/?");
        assert_eq!(config.post_page, "post.html");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.title_template, "{Post} | Blog");
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/substack_blog_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.post_page, "post.html");
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("substack_blog_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  \n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 30);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::from_toml("feed_url = \"https://other.substack.com/feed\"\n").unwrap();
        assert_eq!(config.feed_url, "https://other.substack.com/feed");
        assert_eq!(config.proxy_url, "https://corsproxy.io/?"); // default
        assert_eq!(config.timeout_secs, 30); // default
    }

    #[test]
    fn test_full_config_from_file() {
        let dir = std::env::temp_dir().join("substack_blog_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
feed_url = "https://writer.substack.com/feed"
proxy_url = "https://proxy.example.com/?url="
post_page = "/blog/post"
timeout_secs = 0
title_template = "{Post} — Writer"
listing_title = "Writing"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_url, "https://writer.substack.com/feed");
        assert_eq!(config.proxy_url, "https://proxy.example.com/?url=");
        assert_eq!(config.post_page, "/blog/post");
        assert_eq!(config.timeout_secs, 0);
        assert_eq!(config.title_template, "{Post} — Writer");
        assert_eq!(config.listing_title, "Writing");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::from_toml("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = r#"
post_page = "p.html"
totally_fake_key = "should not fail"
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.post_page, "p.html");
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::from_toml("timeout_secs = \"soon\"\n").is_err());
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("substack_blog_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_feed_url_override() {
        let mut config = Config::default();
        config.apply_feed_url_override("  https://env.substack.com/feed ".to_string());
        assert_eq!(config.feed_url, "https://env.substack.com/feed");

        config.apply_feed_url_override("   ".to_string());
        assert_eq!(config.feed_url, "https://env.substack.com/feed");
    }

    #[test]
    fn test_feed_source_from_defaults() {
        let source = Config::default().feed_source().unwrap();
        assert_eq!(source.feed_url, "https://jamesjboyer.substack.com/feed");
        assert_eq!(source.proxy_url, "https://corsproxy.io/?");
        assert_eq!(source.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_feed_source_zero_timeout_disables_it() {
        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.feed_source().unwrap().timeout, None);
    }

    #[test]
    fn test_feed_source_rejects_bad_urls() {
        let config = Config {
            feed_url: "http://192.168.0.10/feed".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.feed_source(),
            Err(ConfigError::InvalidUrl { field: "feed_url", .. })
        ));

        let config = Config {
            proxy_url: "http://corsproxy.io/?".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.feed_source(),
            Err(ConfigError::InvalidUrl { field: "proxy_url", .. })
        ));
    }
}

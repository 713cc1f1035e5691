//! Utility functions for common operations.
//!
//! - **URL validation**: policy checks for the feed URL (no localhost or
//!   private addresses) and for the CORS proxy endpoint (HTTPS only)
//!
//! # Examples
//!
//! ```
//! use substack_blog::util::{validate_feed_url, validate_proxy_url};
//!
//! let feed = validate_feed_url("https://author.substack.com/feed").unwrap();
//! let proxy = validate_proxy_url("https://corsproxy.io/?").unwrap();
//! ```

mod url_validator;

pub use url_validator::{validate_feed_url, validate_proxy_url, UrlValidationError};

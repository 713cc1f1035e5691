//! Getting posts out of the newsletter's RSS feed.
//!
//! - [`fetcher`] - one GET through the CORS proxy, returning the raw feed text
//! - [`parser`] - turns that text into [`PostRecord`]s in document order
//!
//! # Example
//!
//! ```ignore
//! use substack_blog::feed::{fetch_feed, parse_feed};
//!
//! let xml = fetch_feed(&client, &source).await?;
//! let posts = parse_feed(&xml)?;
//! ```

mod fetcher;
mod parser;

pub use fetcher::{fetch_feed, proxied_url, FeedSource, TransportError};
pub use parser::{parse_feed, MalformedFeedError, PostRecord};

//! Renders a personal site's blog section from a Substack RSS feed.
//!
//! Two views are supported: a listing of every post (linked title, date,
//! excerpt) and a single post looked up by its slug. The feed is fetched
//! through a CORS proxy, parsed, rendered into [`render::Fragment`]s and
//! attached to a [`page::RenderTarget`].

pub mod config;
pub mod feed;
pub mod page;
pub mod render;
pub mod slug;
pub mod util;

//! Page controllers: the listing view and the single-post view.
//!
//! Each run is one linear pass: fetch, parse, render, attach. Nothing is
//! shared between runs. Failures never escape a controller; they are shown
//! on the page's alert region and returned as [`Outcome::Reported`].

use serde::Serialize;
use thiserror::Error;

use crate::feed::{fetch_feed, parse_feed, FeedSource, PostRecord, TransportError};
use crate::render::{render_item, Fragment, RenderOptions};
use crate::slug::slug_from_guid;

/// Token in the page title replaced by the post's title.
pub const POST_TOKEN: &str = "{Post}";

/// Page template used when none is supplied.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{title}}</title>
</head>
<body>
  <div id="alert"><!-- alert --></div>
  <section id="substack-feed"><!-- feed --></section>
  <section id="substack-feed-single"><!-- post --></section>
</body>
</html>
"#;

const TITLE_MARKER: &str = "{{title}}";
const ALERT_MARKER: &str = "<!-- alert -->";
const FEED_MARKER: &str = "<!-- feed -->";
const POST_MARKER: &str = "<!-- post -->";

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Unable to load posts: {0}")]
    Transport(#[from] TransportError),
    #[error("Post not found{}", slug_suffix(.0))]
    NotFound(Option<String>),
}

fn slug_suffix(slug: &Option<String>) -> String {
    slug.as_deref().map(|s| format!(": {}", s)).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    NotFound,
}

impl BlogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlogError::Transport(_) => ErrorKind::Transport,
            BlogError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// How a controller run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Number of fragments attached to the page.
    Rendered(usize),
    /// The run failed and the error was shown on the alert region.
    Reported(BlogError),
}

impl Outcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Outcome::Rendered(_))
    }
}

/// The parts of a page a controller writes to.
pub trait RenderTarget {
    /// Appends one entry to the listing container.
    fn append_listing(&mut self, fragment: Fragment);

    /// Replaces the contents of the single-post container.
    fn replace_post(&mut self, fragment: Fragment);

    /// Substitutes [`POST_TOKEN`] in the page title.
    fn set_post_title(&mut self, title: &str);

    /// Shows `message` on the alert region, replacing any earlier message.
    fn show_alert(&mut self, message: &str);
}

/// In-memory page: collects what the controllers render and composes the
/// final HTML document from a template.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PageShell {
    title: String,
    listing: Vec<Fragment>,
    post: Option<Fragment>,
    alert: Option<String>,
}

impl PageShell {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn listing(&self) -> &[Fragment] {
        &self.listing
    }

    pub fn post(&self) -> Option<&Fragment> {
        self.post.as_ref()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Fills a page template.
    ///
    /// `{{title}}` receives the (escaped) page title; the comment markers
    /// `<!-- alert -->`, `<!-- feed -->` and `<!-- post -->` receive the alert,
    /// the listing fragments and the single post. Missing markers are skipped.
    pub fn render_document(&self, template: &str) -> String {
        let alert = self
            .alert
            .as_deref()
            .map(|msg| {
                format!(
                    "<div class=\"alert\" role=\"alert\">{}</div>",
                    quick_xml::escape::escape(msg)
                )
            })
            .unwrap_or_default();
        let listing: String = self.listing.iter().map(Fragment::to_html).collect();
        let post = self.post.as_ref().map(Fragment::to_html).unwrap_or_default();

        template
            .replace(TITLE_MARKER, &quick_xml::escape::escape(self.title.as_str()))
            .replace(ALERT_MARKER, &alert)
            .replace(FEED_MARKER, &listing)
            .replace(POST_MARKER, &post)
    }
}

impl RenderTarget for PageShell {
    fn append_listing(&mut self, fragment: Fragment) {
        self.listing.push(fragment);
    }

    fn replace_post(&mut self, fragment: Fragment) {
        self.post = Some(fragment);
    }

    fn set_post_title(&mut self, title: &str) {
        self.title = self.title.replacen(POST_TOKEN, title, 1);
    }

    fn show_alert(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }
}

/// The blog section: where the feed comes from and where post pages live.
#[derive(Debug, Clone)]
pub struct Blog {
    client: reqwest::Client,
    source: FeedSource,
    post_page: String,
}

impl Blog {
    pub fn new(client: reqwest::Client, source: FeedSource, post_page: impl Into<String>) -> Self {
        Self {
            client,
            source,
            post_page: post_page.into(),
        }
    }

    /// Fetches and parses the feed.
    ///
    /// A malformed body is reported as a transport failure.
    pub async fn load_posts(&self) -> Result<Vec<PostRecord>, BlogError> {
        let xml = fetch_feed(&self.client, &self.source).await?;
        let posts = parse_feed(&xml).map_err(TransportError::from)?;
        tracing::debug!(feed = %self.source.feed_url, posts = posts.len(), "Parsed feed");
        Ok(posts)
    }

    /// Listing view: appends a summary fragment for every post, in feed order.
    ///
    /// On failure nothing already on the page is cleared; the alert shows
    /// the error and no fragments are appended.
    pub async fn display_feed<T>(&self, target: &mut T) -> Outcome
    where
        T: RenderTarget + ?Sized,
    {
        let posts = match self.load_posts().await {
            Ok(posts) => posts,
            Err(e) => return report(target, e),
        };

        for record in &posts {
            target.append_listing(render_item(record, RenderOptions::SUMMARY, &self.post_page));
        }

        tracing::info!(feed = %self.source.feed_url, posts = posts.len(), "Rendered feed listing");
        Outcome::Rendered(posts.len())
    }

    /// Single-post view: renders the first post whose slug matches.
    ///
    /// `slug` comes from the page's `id` query parameter; `None` (or a full
    /// post URL reduced to nothing) is reported as not found without fetching.
    pub async fn display_post<T>(&self, slug: Option<&str>, target: &mut T) -> Outcome
    where
        T: RenderTarget + ?Sized,
    {
        let Some(wanted) = slug.map(slug_from_guid).filter(|s| !s.is_empty()) else {
            return report(target, BlogError::NotFound(None));
        };

        let posts = match self.load_posts().await {
            Ok(posts) => posts,
            Err(e) => return report(target, e),
        };

        let Some(record) = posts.iter().find(|r| slug_from_guid(&r.guid) == wanted) else {
            return report(target, BlogError::NotFound(Some(wanted.to_string())));
        };

        let mut fragment = render_item(record, RenderOptions::FULL, &self.post_page);
        fragment.unlink_images();

        target.set_post_title(&record.title);
        target.replace_post(fragment);

        tracing::info!(slug = %wanted, title = %record.title, "Rendered post");
        Outcome::Rendered(1)
    }
}

fn report<T>(target: &mut T, error: BlogError) -> Outcome
where
    T: RenderTarget + ?Sized,
{
    tracing::warn!(error = %error, "Page run failed");
    target.show_alert(&error.to_string());
    Outcome::Reported(error)
}

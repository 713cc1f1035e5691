//! Turning post records into page fragments.
//!
//! Rendering is pure: [`render_item`] builds a [`Fragment`] describing what
//! to show, and [`Fragment::to_html`] serializes it. Attaching fragments to
//! a page is the job of a [`RenderTarget`](crate::page::RenderTarget).

mod date;
pub mod postprocess;

use quick_xml::escape::escape;
use serde::Serialize;

use crate::feed::PostRecord;
use crate::slug::{slug_from_guid, ID_PARAM};

pub use date::format_date;

/// What to include when rendering a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Link the heading to the post's own page.
    pub include_link: bool,
    /// Include the full post body.
    pub include_content: bool,
}

impl RenderOptions {
    /// Listing entry: linked title, date, excerpt.
    pub const SUMMARY: Self = Self {
        include_link: true,
        include_content: false,
    };

    /// Single post: plain title, date, excerpt, full body.
    pub const FULL: Self = Self {
        include_link: false,
        include_content: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub text: String,
    /// Link to the post page, e.g. `post.html?id=my-post`.
    pub href: Option<String>,
}

/// A rendered post, ready to be attached to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub slug: String,
    pub heading: Heading,
    /// Formatted publication date, e.g. `Mar 5, 2024`.
    pub date: String,
    /// Excerpt HTML, inserted as-is.
    pub description: String,
    /// Full body HTML; only present in full mode.
    pub content: Option<String>,
}

/// Renders one post record.
///
/// `post_page` is the page that shows a single post; linked headings point
/// at `{post_page}?id={slug}`. In full mode the trailing empty paragraph
/// Substack appends to post bodies is removed.
pub fn render_item(record: &PostRecord, options: RenderOptions, post_page: &str) -> Fragment {
    let slug = slug_from_guid(&record.guid);

    let href = options.include_link.then(|| {
        let encoded: String = url::form_urlencoded::byte_serialize(slug.as_bytes()).collect();
        format!("{}?{}={}", post_page, ID_PARAM, encoded)
    });

    let content = options
        .include_content
        .then(|| postprocess::strip_trailing_empty_paragraph(&record.content).into_owned());

    Fragment {
        slug: slug.to_string(),
        heading: Heading {
            text: record.title.clone(),
            href,
        },
        date: format_date(&record.pub_date),
        description: record.description.clone(),
        content,
    }
}

impl Fragment {
    /// Swaps Substack's linked image containers in the body for bare images.
    pub fn unlink_images(&mut self) {
        if let Some(content) = self.content.as_mut() {
            let cleaned = postprocess::unlink_images(content).into_owned();
            *content = cleaned;
        }
    }

    /// Serializes the fragment as an `<article>` element.
    ///
    /// The title and link are escaped; description and content are trusted
    /// HTML from the feed and inserted unchanged.
    pub fn to_html(&self) -> String {
        let title = escape(self.heading.text.as_str());
        let heading = match &self.heading.href {
            Some(href) => format!("<a href=\"{}\">{}</a>", escape(href.as_str()), title),
            None => title.into_owned(),
        };

        let mut html = String::with_capacity(
            128 + self.description.len() + self.content.as_ref().map_or(0, String::len),
        );
        html.push_str("<article>\n");
        html.push_str(&format!("  <h2>{}</h2>\n", heading));
        html.push_str(&format!(
            "  <p class=\"substack-post-date\">{}</p>\n",
            escape(self.date.as_str())
        ));
        html.push_str(&format!(
            "  <p class=\"substack-post-description\">{}</p>\n",
            self.description
        ));
        if let Some(content) = &self.content {
            html.push_str(&format!(
                "  <div class=\"substack-post-content\">{}</div>\n",
                content
            ));
        }
        html.push_str("</article>\n");
        html
    }
}

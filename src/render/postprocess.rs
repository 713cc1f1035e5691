//! Cleanups applied to post HTML coming from Substack.
//!
//! Both functions return the input borrowed and byte-identical when there is
//! nothing to change; the HTML is only re-serialized after an edit.

use std::borrow::Cow;
use std::collections::HashSet;

use scraper::{CaseSensitivity, ElementRef, Html, Node};

/// Wrapper Substack puts around every captioned image.
const IMAGE_CONTAINER_CLASS: &str = "captioned-image-container";

/// Removes the last `<p>` if it is empty and nothing but whitespace follows it.
///
/// Substack appends an empty paragraph to most post bodies. A paragraph is
/// empty when its text is blank (whitespace and `&nbsp;` included) and its
/// only child elements, if any, are `<br>`. An empty paragraph followed by a
/// list, a footer or any other content is left alone. At most one paragraph
/// is removed.
pub fn strip_trailing_empty_paragraph(html: &str) -> Cow<'_, str> {
    if !html.contains("<p") {
        return Cow::Borrowed(html);
    }

    let mut fragment = Html::parse_fragment(html);
    let last = fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "p")
        .last();

    let target = match last {
        Some(p) if is_empty_paragraph(p) && is_trailing(p) => p.id(),
        _ => return Cow::Borrowed(html),
    };

    if let Some(mut node) = fragment.tree.get_mut(target) {
        node.detach();
    }
    Cow::Owned(fragment.root_element().inner_html())
}

fn is_empty_paragraph(p: ElementRef<'_>) -> bool {
    let only_breaks = p
        .children()
        .filter_map(ElementRef::wrap)
        .all(|child| child.value().name() == "br");
    only_breaks && p.text().collect::<String>().trim().is_empty()
}

/// True when every node after `p` in document order is blank text or a comment.
fn is_trailing(p: ElementRef<'_>) -> bool {
    std::iter::once(*p)
        .chain(p.ancestors())
        .flat_map(|node| node.next_siblings())
        .all(|node| match node.value() {
            Node::Text(text) => text.trim().is_empty(),
            Node::Comment(_) => true,
            _ => false,
        })
}

/// Replaces each captioned-image container with its bare `<picture>`.
///
/// Substack wraps images as
/// `div.captioned-image-container > figure > a[href=substack] > ... > picture`.
/// The container (link, caption and all) is swapped for the picture so
/// readers are not sent off-site by clicking an image.
pub fn unlink_images(html: &str) -> Cow<'_, str> {
    if !html.contains(IMAGE_CONTAINER_CLASS) {
        return Cow::Borrowed(html);
    }

    let mut fragment = Html::parse_fragment(html);
    let mut seen = HashSet::new();

    // Pairs each container with the first <picture> inside its <figure>
    let swaps: Vec<_> = fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| {
            el.value()
                .has_class(IMAGE_CONTAINER_CLASS, CaseSensitivity::CaseSensitive)
        })
        .filter_map(|container| {
            let picture = container
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|el| el.value().name() == "figure")
                .find_map(|figure| {
                    figure
                        .descendants()
                        .filter_map(ElementRef::wrap)
                        .find(|el| el.value().name() == "picture")
                })?;
            Some((container.id(), picture.id()))
        })
        // Nested containers share a picture; the outermost one wins
        .filter(|(_, picture)| seen.insert(*picture))
        .collect();

    if swaps.is_empty() {
        return Cow::Borrowed(html);
    }

    for (container, picture) in &swaps {
        if let Some(mut node) = fragment.tree.get_mut(*picture) {
            node.detach();
        }
        if let Some(mut node) = fragment.tree.get_mut(*container) {
            node.insert_id_before(*picture);
            node.detach();
        }
    }

    tracing::debug!(images = swaps.len(), "Unwrapped linked images");
    Cow::Owned(fragment.root_element().inner_html())
}

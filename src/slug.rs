//! Slugs: the short post identifiers used in this site's own URLs.
//!
//! A Substack guid is the canonical post URL, e.g.
//! `https://author.substack.com/p/my-post`; its slug is `my-post`.

/// Name of the page query parameter that carries the requested slug.
pub const ID_PARAM: &str = "id";

/// Returns the final path segment of a guid.
///
/// Trailing slashes are ignored. A guid with no `/` is returned unchanged
/// (trimmed), so applying this to an existing slug is a no-op.
///
/// ```
/// use substack_blog::slug::slug_from_guid;
///
/// assert_eq!(slug_from_guid("https://site.substack.com/p/my-post"), "my-post");
/// assert_eq!(slug_from_guid("my-post"), "my-post");
/// ```
pub fn slug_from_guid(guid: &str) -> &str {
    let trimmed = guid.trim().trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, last)) => last,
        None => trimmed,
    }
}

/// Reads the requested slug from a page query string such as `?id=my-post`.
///
/// The value is percent-decoded and reduced to a slug, so a full post URL
/// passed as `id` works too. Returns `None` when `id` is absent or empty.
pub fn requested_slug(query: &str) -> Option<String> {
    let query = query.trim().trim_start_matches('?');

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ID_PARAM)
        .map(|(_, value)| slug_from_guid(&value).to_string())
        .filter(|slug| !slug.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slug_from_substack_guid() {
        assert_eq!(
            slug_from_guid("https://site.substack.com/p/my-post"),
            "my-post"
        );
    }

    #[test]
    fn test_bare_slug_unchanged() {
        assert_eq!(slug_from_guid("my-post"), "my-post");
        assert_eq!(slug_from_guid(""), "");
    }

    #[test]
    fn test_trailing_slash_ignored() {
        assert_eq!(
            slug_from_guid("https://site.substack.com/p/my-post/"),
            "my-post"
        );
    }

    #[test]
    fn test_requested_slug_from_query() {
        assert_eq!(requested_slug("?id=my-post").as_deref(), Some("my-post"));
        assert_eq!(requested_slug("id=my-post&x=1").as_deref(), Some("my-post"));
        assert_eq!(requested_slug("x=1&id=b").as_deref(), Some("b"));
    }

    #[test]
    fn test_requested_slug_decodes_full_url() {
        assert_eq!(
            requested_slug("?id=https%3A%2F%2Fsite.substack.com%2Fp%2Fmy-post").as_deref(),
            Some("my-post")
        );
    }

    #[test]
    fn test_requested_slug_missing_or_empty() {
        assert_eq!(requested_slug(""), None);
        assert_eq!(requested_slug("?"), None);
        assert_eq!(requested_slug("?other=1"), None);
        assert_eq!(requested_slug("?id="), None);
    }

    proptest! {
        #[test]
        fn slug_derivation_is_idempotent(guid in "[a-zA-Z0-9:/._-]{0,60}") {
            let once = slug_from_guid(&guid);
            prop_assert_eq!(slug_from_guid(once), once);
        }

        #[test]
        fn slug_never_contains_separator(guid in "[a-z0-9/-]{0,40}") {
            prop_assert!(!slug_from_guid(&guid).contains('/'));
        }
    }
}

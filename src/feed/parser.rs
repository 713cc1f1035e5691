use std::borrow::Cow;
use std::collections::HashSet;

use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised when the feed text is not an RSS document at all.
///
/// Missing fields inside an `<item>` are never an error; only structural
/// failures end up here.
#[derive(Debug, Error)]
pub enum MalformedFeedError {
    /// The XML reader rejected the document (bad syntax, mismatched tags).
    #[error("XML parse error: {0}")]
    Xml(String),
    /// The document contains no elements.
    #[error("Feed document has no root element")]
    Empty,
    /// An element was still open when the document ended.
    #[error("Feed document ended inside <{0}>")]
    Unclosed(String),
    /// Well-formed XML, but neither `<rss>` nor `<channel>` is present.
    #[error("Not an RSS document: missing <rss> or <channel> element")]
    NotRss,
}

/// One post as published in the feed.
///
/// Records are created fresh for every fetch and dropped with the page run
/// that requested them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    /// Unique id of the post; on Substack this is the canonical post URL.
    pub guid: String,
    pub title: String,
    /// Short HTML summary.
    pub description: String,
    /// Full HTML body from `content:encoded`. Empty when the feed omits it.
    pub content: String,
    /// Publication date exactly as the feed wrote it.
    pub pub_date: String,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Guid,
    Title,
    Description,
    PubDate,
    Content,
}

fn field_for(start: &BytesStart<'_>) -> Option<Field> {
    match start.name().as_ref() {
        b"guid" => Some(Field::Guid),
        b"title" => Some(Field::Title),
        b"description" => Some(Field::Description),
        b"pubDate" => Some(Field::PubDate),
        // content:encoded, matched on local name so any prefix works
        _ if start.local_name().as_ref() == b"encoded" => Some(Field::Content),
        _ => None,
    }
}

/// Accumulates the direct children of one `<item>`.
///
/// `None` means the element has not been seen yet; the first occurrence of
/// each field wins.
#[derive(Default)]
struct ItemBuilder {
    depth: usize,
    current: Option<Field>,
    guid: Option<String>,
    title: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
    content: Option<String>,
}

impl ItemBuilder {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Guid => &mut self.guid,
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
            Field::Content => &mut self.content,
        }
    }

    /// Opens a field element. Returns false when the field was already filled
    /// by an earlier element of the same name.
    fn open(&mut self, field: Field) -> bool {
        let slot = self.slot(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(String::new());
        true
    }

    fn push_text(&mut self, text: &str) {
        if let Some(field) = self.current {
            if let Some(buf) = self.slot(field) {
                buf.push_str(text);
            }
        }
    }

    fn build(self) -> PostRecord {
        fn finish(value: Option<String>) -> String {
            value.map(|v| v.trim().to_string()).unwrap_or_default()
        }

        PostRecord {
            guid: finish(self.guid),
            title: finish(self.title),
            description: finish(self.description),
            content: finish(self.content),
            pub_date: finish(self.pub_date),
        }
    }
}

/// Parses RSS text into post records, preserving document order.
///
/// For every `<item>` the direct children `guid`, `title`, `description`,
/// `pubDate` and `content:encoded` are read. Text and CDATA are both
/// accepted. Missing fields become empty strings.
///
/// # Errors
///
/// Returns [`MalformedFeedError`] when the text is not well-formed XML, has
/// no root element, ends with open elements, or is not an RSS document.
pub fn parse_feed(xml: &str) -> Result<Vec<PostRecord>, MalformedFeedError> {
    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations; only the
    // built-in XML/HTML5 named entities and character references are resolved.
    let mut reader = Reader::from_str(xml);

    let mut records = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut item: Option<ItemBuilder> = None;
    let mut saw_root = false;
    let mut saw_rss = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            MalformedFeedError::Xml(format!("{} (at byte {})", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => {
                saw_root = true;
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                saw_rss |= name == "rss" || name == "channel";

                if let Some(builder) = item.as_mut() {
                    if open.len() == builder.depth {
                        let field = field_for(&e).filter(|f| builder.open(*f));
                        builder.current = field;
                    }
                } else if name == "item" {
                    item = Some(ItemBuilder::new(open.len() + 1));
                }

                open.push(name);
            }
            Event::Empty(e) => {
                saw_root = true;
                let name = e.name();
                saw_rss |= name.as_ref() == b"rss" || name.as_ref() == b"channel";

                if let Some(builder) = item.as_mut() {
                    if open.len() == builder.depth {
                        if let Some(field) = field_for(&e) {
                            builder.open(field);
                        }
                    }
                } else if name.as_ref() == b"item" {
                    records.push(PostRecord::default());
                }
            }
            Event::End(_) => {
                open.pop();
                let depth = open.len();

                let closes_item = item.as_ref().is_some_and(|b| depth + 1 == b.depth);
                if closes_item {
                    if let Some(done) = item.take() {
                        records.push(done.build());
                    }
                } else if let Some(builder) = item.as_mut() {
                    if depth == builder.depth {
                        builder.current = None;
                    }
                }
            }
            Event::Text(e) => {
                if let Some(builder) = item.as_mut() {
                    let raw = String::from_utf8_lossy(&e);
                    builder.push_text(&unescape_text(&raw));
                }
            }
            Event::CData(e) => {
                if let Some(builder) = item.as_mut() {
                    builder.push_text(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.pop() {
        return Err(MalformedFeedError::Unclosed(unclosed));
    }
    if !saw_root {
        return Err(MalformedFeedError::Empty);
    }
    if !saw_rss {
        return Err(MalformedFeedError::NotRss);
    }

    warn_on_bad_guids(&records);
    Ok(records)
}

/// Unescapes element text, resolving XML and HTML5 named entities.
///
/// An entity neither set knows (or a bare `&`) stays in the text verbatim
/// while the entities around it are still resolved.
fn unescape_text(raw: &str) -> Cow<'_, str> {
    if let Ok(text) = unescape_with(raw, resolve_predefined_entity) {
        return text;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        // `&name;` with no other `&` before the semicolon
        let entity = tail[1..]
            .find(|c: char| c == '&' || c == ';')
            .filter(|&i| tail.as_bytes()[i + 1] == b';')
            .map(|i| &tail[..i + 2]);

        let resolved = entity.and_then(|e| {
            let text = unescape_with(e, resolve_predefined_entity).ok()?;
            Some((e.len(), text))
        });
        match resolved {
            Some((len, text)) => {
                out.push_str(&text);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn warn_on_bad_guids(records: &[PostRecord]) {
    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if record.guid.is_empty() {
            tracing::warn!(index, title = %record.title, "Feed item has no guid");
        } else if !seen.insert(record.guid.as_str()) {
            tracing::warn!(index, guid = %record.guid, "Duplicate guid in feed");
        }
    }
}

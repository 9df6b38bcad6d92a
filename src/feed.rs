//! Parser for the channel upload feed (Atom with `yt:` and `media:` extensions).
//!
//! Elements are matched by namespace URI and local name, so any prefix bound
//! to the right namespace is accepted.
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::FeedError;
use crate::model::FeedEntry;

const DEFAULT_TITLE: &str = "Video";

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const YT_NS: &[u8] = b"http://www.youtube.com/xml/schemas/2015";
const MEDIA_NS: &[u8] = b"http://search.yahoo.com/mrss/";

pub fn feed_url(base: &str, channel_id: &str) -> String {
    format!(
        "{}/feeds/videos.xml?channel_id={}",
        base.trim_end_matches('/'),
        channel_id
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Entry,
    Title,
    VideoId,
    Link,
    Group,
    Thumbnail,
    Other,
}

fn tag_of(ns: &ResolveResult<'_>, local: &[u8]) -> Tag {
    let ResolveResult::Bound(Namespace(uri)) = ns else {
        return Tag::Other;
    };
    match (*uri, local) {
        (ATOM_NS, b"entry") => Tag::Entry,
        (ATOM_NS, b"title") => Tag::Title,
        (ATOM_NS, b"link") => Tag::Link,
        (YT_NS, b"videoId") => Tag::VideoId,
        (MEDIA_NS, b"group") => Tag::Group,
        (MEDIA_NS, b"thumbnail") => Tag::Thumbnail,
        _ => Tag::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Title,
    VideoId,
}

#[derive(Debug, Default)]
struct PartialEntry {
    id: String,
    title: Option<String>,
    link: Option<String>,
    thumbnail: Option<String>,
}

impl PartialEntry {
    fn finish(self) -> Option<FeedEntry> {
        let id = self.id.trim().to_string();
        let link = self.link.unwrap_or_default().trim().to_string();
        if id.is_empty() || link.is_empty() {
            return None;
        }
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        Some(FeedEntry {
            id,
            title,
            link,
            thumbnail: self.thumbnail.filter(|t| !t.is_empty()),
        })
    }
}

/// Parse feed markup into entries. Entries without a video id or link are dropped;
/// when an entry lists several thumbnails the last one wins.
pub fn parse_entries(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut root_seen = false;
    let mut current: Option<PartialEntry> = None;
    let mut in_group = false;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let tag = match &event {
            Event::Start(e) | Event::Empty(e) => tag_of(&ns, e.local_name().as_ref()),
            Event::End(e) => tag_of(&ns, e.local_name().as_ref()),
            _ => Tag::Other,
        };
        match event {
            Event::Start(e) => {
                if depth == 0 {
                    if root_seen {
                        return Err(FeedError::Malformed("multiple root elements"));
                    }
                    root_seen = true;
                }
                depth += 1;
                match (depth, tag) {
                    (2, Tag::Entry) => current = Some(PartialEntry::default()),
                    (3, Tag::Title) if current.is_some() => {
                        capture = Some(Capture::Title);
                        text.clear();
                    }
                    (3, Tag::VideoId) if current.is_some() => {
                        capture = Some(Capture::VideoId);
                        text.clear();
                    }
                    (3, Tag::Group) if current.is_some() => in_group = true,
                    _ => on_element(&e, tag, depth, in_group, current.as_mut())?,
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if root_seen {
                        return Err(FeedError::Malformed("multiple root elements"));
                    }
                    root_seen = true;
                    continue;
                }
                on_element(&e, tag, depth + 1, in_group, current.as_mut())?;
            }
            Event::Text(e) => {
                let value = e.unescape().map_err(quick_xml::Error::from)?;
                if depth == 0 {
                    return Err(FeedError::Malformed("text outside the root element"));
                }
                if capture.is_some() {
                    text.push_str(&value);
                }
            }
            Event::CData(e) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                match (depth, tag) {
                    (2, Tag::Entry) => {
                        if let Some(entry) = current.take().and_then(PartialEntry::finish) {
                            out.push(entry);
                        }
                        in_group = false;
                    }
                    (3, Tag::Group) => in_group = false,
                    (3, _) => {
                        if let (Some(kind), Some(entry)) = (capture.take(), current.as_mut()) {
                            match kind {
                                Capture::Title => entry.title = Some(text.clone()),
                                Capture::VideoId => entry.id = text.clone(),
                            }
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(FeedError::Malformed("no root element"));
    }
    if depth != 0 {
        return Err(FeedError::Malformed("unexpected end of document"));
    }
    Ok(out)
}

/// Handle attribute-carrying elements (`link`, `media:thumbnail`) at `depth`.
fn on_element(
    e: &BytesStart<'_>,
    tag: Tag,
    depth: usize,
    in_group: bool,
    entry: Option<&mut PartialEntry>,
) -> Result<(), FeedError> {
    let Some(entry) = entry else {
        return Ok(());
    };
    match (depth, tag) {
        (3, Tag::Link) if entry.link.is_none() => {
            entry.link = attribute(e, b"href")?;
        }
        (4, Tag::Thumbnail) if in_group => {
            if let Some(url) = attribute(e, b"url")? {
                entry.thumbnail = Some(url);
            }
        }
        _ => {}
    }
    Ok(())
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, FeedError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

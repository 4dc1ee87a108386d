use chrono::Utc;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use html_escape::decode_html_entities;
use tracing::debug;
use url::Url;

use crate::app::{PreprintError, Result};
use crate::domain::Paper;

/// Turns raw Atom bytes into normalized [`Paper`] records.
///
/// Identity fields (`id`, `title`) are strict: an entry missing either is
/// dropped. Descriptive fields are lenient: a missing or unreadable
/// `published` date becomes the parse time, a missing `updated` falls back to
/// `published`, missing links become empty strings. Entries come out in feed
/// order.
#[derive(Debug, Clone, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, body: &[u8]) -> Result<Vec<Paper>> {
        let feed = parser::parse(body).map_err(|e| PreprintError::FeedParse(e.to_string()))?;

        let total = feed.entries.len();
        let papers: Vec<Paper> = feed.entries.into_iter().filter_map(paper_from_entry).collect();

        if papers.len() < total {
            debug!("Dropped {} malformed entries out of {}", total - papers.len(), total);
        }

        Ok(papers)
    }
}

fn paper_from_entry(entry: Entry) -> Option<Paper> {
    let Some(id) = paper_id(&entry.id) else {
        debug!("Skipping entry without a canonical id: {:?}", entry.id);
        return None;
    };

    let title = entry.title.map(|t| clean_text(&t.content)).unwrap_or_default();
    if title.is_empty() {
        debug!("Skipping entry {} without a title", id);
        return None;
    }

    let published_at = entry.published.unwrap_or_else(Utc::now);
    let mut paper = Paper::new(id, title, published_at);

    paper.updated_at = Some(entry.updated.unwrap_or(published_at));
    paper.summary = entry.summary.map(|s| clean_text(&s.content)).unwrap_or_default();
    paper.authors = entry
        .authors
        .iter()
        .map(|a| clean_text(&a.name))
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    paper.categories = entry
        .categories
        .iter()
        .map(|c| c.term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect();
    paper.landing_page_url = entry
        .links
        .iter()
        .find(|l| is_landing_page(l))
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();
    paper.pdf_url = entry
        .links
        .iter()
        .find(|l| is_pdf(l))
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();

    Some(paper)
}

/// The last path segment of an absolute entry URL, e.g.
/// `http://arxiv.org/abs/2401.01234v2` yields `2401.01234v2`.
///
/// Ids that are not absolute URLs are rejected. This also rejects the hashed
/// ids feed-rs synthesizes for entries that carry no `<id>` at all.
pub fn paper_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    Url::parse(raw).ok()?;
    let id = raw.trim_end_matches('/').rsplit('/').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Trim and collapse every run of whitespace (newlines and tabs included)
/// into a single space.
pub fn clean_text(raw: &str) -> String {
    decode_html_entities(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_landing_page(link: &Link) -> bool {
    match link.rel.as_deref() {
        None | Some("alternate") => !is_pdf(link),
        Some(_) => false,
    }
}

fn is_pdf(link: &Link) -> bool {
    link.media_type.as_deref() == Some("application/pdf")
        || link.title.as_deref() == Some("pdf")
        || (link.rel.as_deref() == Some("related") && link.href.contains("/pdf/"))
}

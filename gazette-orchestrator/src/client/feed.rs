//! Feed fetching
//!
//! Downloads RSS 2.0 and Atom feeds and turns their entries into candidate
//! items. A failing source never fails the fetch: it is logged and
//! contributes nothing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gazette_core::domain::item::{CandidateItem, FeedSource};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use reqwest::Client;
use thiserror::Error;

/// Feed error type
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Parse(String),
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetches up to `limit_per_source` items from each source
    ///
    /// Never fails as a whole; sources that cannot be fetched or parsed are
    /// skipped.
    async fn fetch_candidates(
        &self,
        sources: &[FeedSource],
        limit_per_source: usize,
    ) -> Vec<CandidateItem>;
}

/// HTTP implementation of FeedFetcher
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gazette/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_source(
        &self,
        source: &FeedSource,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, FeedError> {
        let response = self.client.get(&source.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_feed(&body, &source.name, limit)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_candidates(
        &self,
        sources: &[FeedSource],
        limit_per_source: usize,
    ) -> Vec<CandidateItem> {
        let mut items = Vec::new();

        for source in sources {
            match self.fetch_source(source, limit_per_source).await {
                Ok(fetched) => {
                    tracing::debug!("Fetched {} item(s) from {}", fetched.len(), source.name);
                    items.extend(fetched);
                }
                Err(e) => {
                    tracing::warn!("Skipping feed {} ({}): {}", source.name, source.url, e);
                }
            }
        }

        items
    }
}

/// Parses an RSS 2.0 or Atom document into at most `limit` candidate items
///
/// Entries without a title or a link are dropped.
pub fn parse_feed(xml: &[u8], source: &str, limit: usize) -> Result<Vec<CandidateItem>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<EntryBuilder> = None;
    let mut current_element = String::new();

    loop {
        if items.len() >= limit {
            break;
        }

        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if name == "item" || name == "entry" {
                    current = Some(EntryBuilder::default());
                } else if name == "link" {
                    if let Some(entry) = current.as_mut() {
                        entry.link_from_attributes(&e);
                    }
                }
                current_element = name;
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"link" {
                    if let Some(entry) = current.as_mut() {
                        entry.link_from_attributes(&e);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if matches!(e.name().as_ref(), b"item" | b"entry") {
                    if let Some(item) = current.take().and_then(|entry| entry.build(source)) {
                        items.push(item);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(entry) = current.as_mut() {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        // HTML entities such as &nbsp; are not XML; keep the raw text
                        Err(_) => String::from_utf8_lossy(&e).into_owned(),
                    };
                    entry.push(&current_element, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(entry) = current.as_mut() {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    entry.push(&current_element, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "XML parse error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

#[derive(Default)]
struct EntryBuilder {
    title: String,
    link: Option<String>,
    guid: String,
    published: String,
    updated: String,
    summary: String,
    content: String,
}

impl EntryBuilder {
    fn push(&mut self, element: &str, text: &str) {
        let field = match element {
            "title" => &mut self.title,
            "guid" | "id" => &mut self.guid,
            "pubDate" | "published" | "dc:date" => &mut self.published,
            "updated" => &mut self.updated,
            "description" | "summary" => &mut self.summary,
            "content:encoded" | "content" => &mut self.content,
            "link" => {
                if self.link.is_none() {
                    self.link = Some(text.trim().to_string());
                }
                return;
            }
            _ => return,
        };
        field.push_str(text);
    }

    /// Atom `<link href=".."/>`; only the alternate (or untyped) link counts
    fn link_from_attributes(&mut self, e: &BytesStart) {
        if self.link.is_some() {
            return;
        }

        let attribute = |name: &str| {
            e.try_get_attribute(name)
                .ok()
                .flatten()
                .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
        };

        if attribute("rel").is_some_and(|rel| rel != "alternate") {
            return;
        }
        if let Some(href) = attribute("href") {
            self.link = Some(href);
        }
    }

    fn build(self, source: &str) -> Option<CandidateItem> {
        let title = plain_text(&self.title);
        let link = self.link.filter(|l| !l.is_empty())?;
        if title.is_empty() {
            return None;
        }

        let published_at = parse_date(&self.published).or_else(|| parse_date(&self.updated));
        let body = if self.content.trim().is_empty() {
            &self.summary
        } else {
            &self.content
        };
        let guid = Some(self.guid.trim().to_string());

        Some(CandidateItem::new(
            source,
            title,
            link,
            guid,
            published_at,
            plain_text(body),
        ))
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom, Dublin Core)
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|date| date.with_timezone(&Utc))
        .ok()
}

/// Drops markup and collapses whitespace
fn plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Progress events emitted by the crawl loop
//!
//! Events go to an [`EventSink`] supplied by the caller and, for persistent
//! sessions, are appended to the session's event log.

use serde::Serialize;

/// Kind of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SiteStart,
    Page,
    Item,
    DetailSaved,
    NotDetail,
    Warn,
    Error,
    SiteDone,
    CategoryStart,
    CategoryDone,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SiteStart => "site_start",
            Self::Page => "page",
            Self::Item => "item",
            Self::DetailSaved => "detail_saved",
            Self::NotDetail => "not_detail",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::SiteDone => "site_done",
            Self::CategoryStart => "category_start",
            Self::CategoryDone => "category_done",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress event
///
/// Only the fields relevant to the event kind are set; unset fields are
/// omitted from the JSON form.
///
/// # Example
///
/// ```
/// use dytt_index::{CrawlEvent, EventKind};
///
/// let event = CrawlEvent::new(EventKind::Page)
///     .with_url("http://www.dydytt.net/html/gndy/dyzz/index.html")
///     .with_found(25)
///     .with_queued(20);
///
/// let json = serde_json::to_string(&event).unwrap();
/// assert!(json.starts_with(r#"{"event":"page""#));
/// assert!(!json.contains("detail_url"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlEvent {
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CrawlEvent {
    pub fn new(event: EventKind) -> Self {
        Self {
            event,
            section: None,
            url: None,
            detail_url: None,
            message: None,
            count: None,
            found: None,
            queued: None,
            title: None,
            year: None,
            kind: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_detail_url(mut self, detail_url: impl Into<String>) -> Self {
        self.detail_url = Some(detail_url.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_found(mut self, found: usize) -> Self {
        self.found = Some(found);
        self
    }

    pub fn with_queued(mut self, queued: usize) -> Self {
        self.queued = Some(queued);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Receives progress events from the crawl loop
pub trait EventSink: Send {
    fn emit(&mut self, event: &CrawlEvent);
}

/// Collects events, mostly useful in tests
impl EventSink for Vec<CrawlEvent> {
    fn emit(&mut self, event: &CrawlEvent) {
        self.push(event.clone());
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &CrawlEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serde() {
        for kind in [
            EventKind::SiteStart,
            EventKind::DetailSaved,
            EventKind::NotDetail,
            EventKind::CategoryDone,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_item_event_serialization() {
        let event = CrawlEvent::new(EventKind::Item)
            .with_detail_url("http://www.dydytt.net/html/gndy/dyzz/20240101/1.html")
            .with_title("流浪地球2")
            .with_year(Some(2023))
            .with_kind("movie_cn");

        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "item");
        assert_eq!(value["title"], "流浪地球2");
        assert_eq!(value["year"], 2023);
        assert!(value.get("url").is_none());
        assert!(value.get("count").is_none());
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<CrawlEvent> = Vec::new();
        sink.emit(&CrawlEvent::new(EventKind::SiteStart));
        sink.emit(&CrawlEvent::new(EventKind::SiteDone).with_count(3));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].count, Some(3));
    }
}

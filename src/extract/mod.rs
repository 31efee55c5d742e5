//! Field extraction for detail pages
//!
//! This module turns one detail document into a typed [`Item`]:
//! - Isolating the content block and splitting it into text lines
//! - Scanning labeled fields (`fields`)
//! - Reconciling titles and aliases (`titles`)
//! - Keyword tagging and language hints (`keywords`)
//! - Content kind classification (`kind`)
//! - Download links and episode numbers (`downloads`)
//!
//! [`extract`] never fails; a field that cannot be read is left empty.

pub mod downloads;
pub mod fields;
pub mod keywords;
pub mod kind;
pub mod titles;

use crate::item::{Item, RatingSource};
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised when a document cannot become an item
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Not a detail page: {0}")]
    NotDetail(String),

    #[error("No usable title for {0}")]
    Untitled(String),

    #[error("Item has no detail URL")]
    MissingDetailUrl,
}

/// Extracts an item from a detail document
///
/// # Arguments
///
/// * `html` - The decoded document
/// * `detail_url` - URL the document was fetched from; becomes the item key
///
/// # Example
///
/// ```
/// use dytt_index::{extract, Kind};
///
/// let html = r#"<html><body><div id="Zoom">
///     ◎译　　名　流浪地球<br />
///     ◎片　　名　The Wandering Earth<br />
///     ◎年　　代　2019<br />
///     ◎产　　地　中国大陆<br />
/// </div></body></html>"#;
///
/// let item = extract(html, "http://www.dydytt.net/html/gndy/dyzz/20190205/58203.html");
/// assert_eq!(item.title, "流浪地球");
/// assert_eq!(item.original_title.as_deref(), Some("The Wandering Earth"));
/// assert_eq!(item.year, Some(2019));
/// assert_eq!(item.kind, Kind::MovieCn);
/// ```
pub fn extract(html: &str, detail_url: &str) -> Item {
    extract_with_stats(html, detail_url).0
}

/// Extracts an item, rejecting documents that carry no item data
///
/// A document with neither a labeled field nor a download link is reported as
/// [`ExtractError::NotDetail`].
pub fn extract_detail(html: &str, detail_url: &str) -> Result<Item, ExtractError> {
    let (item, labeled) = extract_with_stats(html, detail_url);
    if labeled == 0 && item.download_links.is_empty() {
        return Err(ExtractError::NotDetail(detail_url.to_string()));
    }
    item.validate()?;
    Ok(item)
}

fn extract_with_stats(html: &str, detail_url: &str) -> (Item, usize) {
    let document = Html::parse_document(html);
    let page_url = Url::parse(detail_url).ok();

    let content = content_block(&document);
    let lines = visible_lines(content);
    let full_text = lines.join("\n");

    let labeled = fields::scan(&lines);

    let h1 = first_text(&document, "h1");
    let title_tag = first_text(&document, "title");
    let names = titles::reconcile(&labeled.names, h1.as_deref(), title_tag.as_deref());

    let mut item = Item::new(detail_url, names.title);
    item.original_title = names.original_title;
    item.alt_titles = names.alt_titles;

    item.year = labeled
        .year
        .or_else(|| fields::find_year(&full_text))
        .or_else(|| labeled.release_date.as_deref().and_then(fields::find_year));

    item.country = labeled.country.clone();
    item.language = labeled.language.clone();
    item.director = labeled.director.clone();
    item.actors = join_lines(&labeled.actors);
    item.description = join_lines(&labeled.description);

    (item.rating_source, item.rating_value, item.rating_votes) =
        match (labeled.douban_rating, labeled.imdb_rating) {
            (Some(value), _) => (Some(RatingSource::Douban), Some(value), labeled.douban_votes),
            (None, Some(value)) => (Some(RatingSource::Imdb), Some(value), labeled.imdb_votes),
            (None, None) => (None, None, None),
        };

    let scanned = format!(
        "{}\n{}\n{}",
        item.title,
        item.description.as_deref().unwrap_or_default(),
        full_text
    );
    let hits = keywords::scan(&scanned);

    let mut tags: Vec<String> = Vec::new();
    for tag in labeled.genres.iter().chain(hits.tags()) {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    item.tags = tags;

    if item.country.is_none() {
        item.country = item
            .language
            .as_deref()
            .and_then(keywords::country_from_language)
            .map(str::to_string);
    }

    let signals = kind::KindSignals {
        genres: &labeled.genres,
        tags: &item.tags,
        status_hits: &hits.status,
        url: detail_url,
        title: &item.title,
        country: item.country.as_deref(),
    };
    item.kind = kind::classify(&signals).0;

    item.download_links = downloads::collect(&document, page_url.as_ref());
    item.cover_url = cover_url(content, page_url.as_ref());
    item.raw_html = Some(html.to_string());

    (item, labeled.matched)
}

/// The `#Zoom` block, else `<body>`, else the whole document
fn content_block(document: &Html) -> ElementRef<'_> {
    for selector in ["#Zoom", "body"] {
        if let Ok(sel) = Selector::parse(selector) {
            if let Some(element) = document.select(&sel).next() {
                return element;
            }
        }
    }
    document.root_element()
}

/// Visible text of an element as trimmed, non-empty lines
///
/// Full-width and non-breaking spaces become ASCII spaces.
pub fn visible_lines(root: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    for node in root.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node
                .parent()
                .and_then(ElementRef::wrap)
                .map(|parent| matches!(parent.value().name(), "script" | "style" | "noscript"))
                .unwrap_or(false);
            if hidden {
                continue;
            }
            for line in text.split('\n') {
                let line = line.replace(['\u{3000}', '\u{a0}'], " ");
                let line = line.trim();
                if !line.is_empty() {
                    lines.push(line.to_string());
                }
            }
        }
    }
    lines
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let element = document.select(&sel).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn cover_url(content: ElementRef<'_>, page_url: Option<&Url>) -> Option<String> {
    let sel = Selector::parse("img[src]").ok()?;
    let src = content.select(&sel).next()?.value().attr("src")?;
    match page_url {
        Some(base) => resolve_link(src, base).map(|u| u.to_string()),
        None => Some(src.trim().to_string()).filter(|s| !s.is_empty()),
    }
}

fn join_lines(lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

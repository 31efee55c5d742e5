//! Link classification for list and detail pages
//!
//! This module scans a fetched document for outbound links and sorts them into:
//! - Detail candidates (`/html/<segments>/<digits>/<file>.html`)
//! - List/pagination candidates (list_/index files, category sections, directories)
//! - The "next page" link, when one can be identified
//!
//! Everything else (other hosts, download schemes, media files) is noise.

use crate::crawler::fetcher::ResolvedSite;
use crate::url::resolve_link;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Anchor texts that mark the next page of a listing
const NEXT_PAGE_TEXTS: &[&str] = &["下一页", "下一頁", "下页"];

/// Path segments of the site's section listings
const SECTION_SEGMENTS: &[&str] = &[
    "/html/gndy/",
    "/html/tv/",
    "/html/zongyi/",
    "/html/dongman/",
    "/html/jilupian/",
    "/html/2009zongyi/",
    "/html/newgame/",
];

/// Extensions of resources that are never crawled
const BINARY_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "zip", "rar", "7z", "gz", "tar",
    "bz2", "xz", "mp4", "mkv", "avi", "rmvb", "rm", "wmv", "flv", "mov", "ts", "mp3", "flac",
    "wav", "aac", "torrent", "exe", "apk", "msi", "dmg", "pdf", "doc", "docx", "xls", "xlsx",
    "css", "js",
];

/// Links found on one page, split by role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkClassification {
    /// Detail pages, first-seen order, deduplicated
    pub detail_candidates: Vec<Url>,
    /// List, pagination and section pages, first-seen order, deduplicated
    pub page_candidates: Vec<Url>,
    /// The next page of the current listing
    pub next_page: Option<Url>,
}

impl LinkClassification {
    /// Number of useful links found
    pub fn found(&self) -> usize {
        self.detail_candidates.len() + self.page_candidates.len()
    }

    /// All links in the order they should be queued: details, next page, pages
    pub fn queue_order(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.detail_candidates
            .iter()
            .chain(self.next_page.iter())
            .chain(self.page_candidates.iter())
            .map(|u| u.to_string())
            .filter(|u| seen.insert(u.clone()))
            .collect()
    }
}

/// Classifies the outbound links of a document
///
/// Scans `a[href]`, `frame[src]`, `iframe[src]` and `meta` refresh targets in
/// document order, resolving each against `current_url`. Links outside the
/// site's host allow-list are dropped.
///
/// # Arguments
///
/// * `html` - The decoded document
/// * `current_url` - URL the document was fetched from
/// * `site` - The resolved mirror and its allow-list
///
/// # Example
///
/// ```
/// use dytt_index::crawler::{classify, ResolvedSite};
/// use url::Url;
///
/// let site = ResolvedSite::from_base("http://www.dydytt.net", &[]).unwrap();
/// let page = Url::parse("http://www.dydytt.net/html/gndy/dyzz/index.html").unwrap();
/// let html = r#"<a href="/html/gndy/dyzz/20240101/65000.html">电影</a>
///               <a href="list_23_2.html">下一页</a>"#;
///
/// let links = classify(html, &page, &site);
/// assert_eq!(links.detail_candidates.len(), 1);
/// assert_eq!(
///     links.next_page.unwrap().as_str(),
///     "http://www.dydytt.net/html/gndy/dyzz/list_23_2.html"
/// );
/// ```
pub fn classify(html: &str, current_url: &Url, site: &ResolvedSite) -> LinkClassification {
    let document = Html::parse_document(html);
    let mut result = LinkClassification::default();

    let selector = match Selector::parse("a[href], frame[src], iframe[src], meta[http-equiv]") {
        Ok(selector) => selector,
        Err(_) => return result,
    };

    let mut seen_details = HashSet::new();
    let mut seen_pages = HashSet::new();
    let mut text_next: Option<Url> = None;
    let mut pattern_next: Option<Url> = None;

    for element in document.select(&selector) {
        let target = match link_target(&element) {
            Some(target) => target,
            None => continue,
        };

        let url = match resolve_link(&target, current_url) {
            Some(url) => url,
            None => continue,
        };

        if !site.allow.allows(&url) || is_binary(&url) {
            continue;
        }

        if element.value().name() == "a" && text_next.is_none() {
            let text = element.text().collect::<String>();
            if NEXT_PAGE_TEXTS.contains(&text.trim()) {
                text_next = Some(url.clone());
            }
        }

        if pattern_next.is_none() && is_pagination_file(&url) {
            pattern_next = Some(url.clone());
        }

        if is_detail_url(&url) {
            if seen_details.insert(url.to_string()) {
                result.detail_candidates.push(url);
            }
        } else if is_page_url(&url) && seen_pages.insert(url.to_string()) {
            result.page_candidates.push(url);
        }
    }

    result.next_page = text_next.or(pattern_next);
    result
}

/// Returns true when the URL path looks like a detail page
pub fn is_detail_url(url: &Url) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^/html/.+/\d+/[^/]+\.html?$").expect("Invalid regex"));
    re.is_match(url.path())
}

/// Returns true when the URL path looks like a listing, section or directory
pub fn is_page_url(url: &Url) -> bool {
    let path = url.path();
    if path.ends_with('/') {
        return true;
    }

    let file = file_name(url).to_ascii_lowercase();
    if (file.starts_with("list_") || file.starts_with("index"))
        && (file.ends_with(".html") || file.ends_with(".htm"))
    {
        return true;
    }

    let lowered = path.to_ascii_lowercase();
    SECTION_SEGMENTS.iter().any(|s| lowered.starts_with(s))
}

fn is_pagination_file(url: &Url) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(list_|index_).*\.html$").expect("Invalid regex"));
    re.is_match(file_name(url))
}

fn is_binary(url: &Url) -> bool {
    let file = file_name(url);
    match file.rsplit_once('.') {
        Some((_, ext)) => BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

fn file_name(url: &Url) -> &str {
    url.path().rsplit('/').next().unwrap_or("")
}

/// Extracts the raw link target of a scanned element
fn link_target(element: &ElementRef<'_>) -> Option<String> {
    let value = element.value();
    match value.name() {
        "a" => value.attr("href").map(str::to_string),
        "frame" | "iframe" => value.attr("src").map(str::to_string),
        "meta" => {
            if !value.attr("http-equiv")?.eq_ignore_ascii_case("refresh") {
                return None;
            }
            refresh_target(value.attr("content")?)
        }
        _ => None,
    }
}

/// Parses the URL out of a refresh directive such as `0; url=/html/gndy/`
fn refresh_target(content: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?i)url\s*=\s*['"]?([^'"\s]+)"#).expect("Invalid regex")
    });
    re.captures(content).map(|c| c[1].to_string())
}

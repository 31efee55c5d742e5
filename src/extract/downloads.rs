//! Download link collection and episode inference

use crate::item::{DownloadLink, LinkKind};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Hosts of cloud-drive share pages
const PAN_HOSTS: &[&str] = &[
    "pan.baidu.com",
    "cloud.baidu.com",
    "aliyundrive.com",
    "alipan.com",
    "pan.quark.cn",
];

/// Episode numbers outside this range are not believed
const EPISODE_RANGE: std::ops::RangeInclusive<u32> = 1..=150;

/// Collects the download links of a document
///
/// Links are deduplicated on (url, kind), first occurrence wins.
pub fn collect(document: &Html, page_url: Option<&Url>) -> Vec<DownloadLink> {
    let mut links = Vec::new();
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return links,
    };

    let mut seen = HashSet::new();
    for anchor in document.select(&selector) {
        let href = match anchor.value().attr("href") {
            Some(href) => href.trim(),
            None => continue,
        };
        let kind = match link_kind(href) {
            Some(kind) => kind,
            None => continue,
        };

        let url = match kind {
            LinkKind::Torrent | LinkKind::Pan => match page_url.and_then(|base| base.join(href).ok()) {
                Some(resolved) => resolved.to_string(),
                None => href.to_string(),
            },
            _ => href.to_string(),
        };

        if !seen.insert((url.clone(), kind)) {
            continue;
        }

        let label = anchor.text().collect::<String>().trim().to_string();
        let label = (!label.is_empty()).then_some(label);
        let episode = infer_episode(label.as_deref(), carried_file_name(&url, kind).as_deref());

        links.push(DownloadLink {
            url,
            kind,
            label,
            episode,
        });
    }
    links
}

/// Classifies an href as a download link
pub fn link_kind(href: &str) -> Option<LinkKind> {
    let lowered = href.trim().to_ascii_lowercase();

    let kind = if lowered.starts_with("magnet:") {
        LinkKind::Magnet
    } else if lowered.starts_with("ed2k:") {
        LinkKind::Ed2k
    } else if lowered.starts_with("ftp://") {
        LinkKind::Ftp
    } else if lowered.starts_with("thunder://") {
        LinkKind::Thunder
    } else if lowered.starts_with("qqdl://") {
        LinkKind::Qqdl
    } else if lowered.starts_with("flashget://") {
        LinkKind::Flashget
    } else if strip_query(&lowered).ends_with(".torrent") {
        LinkKind::Torrent
    } else if PAN_HOSTS.iter().any(|host| lowered.contains(host)) {
        LinkKind::Pan
    } else {
        return None;
    };
    Some(kind)
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Extracts the file name a download URL carries, if any
///
/// Magnet links carry it in `dn=`, ed2k links in their second field, other
/// links in their last path segment.
pub fn carried_file_name(url: &str, kind: LinkKind) -> Option<String> {
    let name = match kind {
        LinkKind::Magnet => {
            let query = url.split_once('?')?.1;
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "dn")
                .map(|(_, value)| value.into_owned())?
        }
        LinkKind::Ed2k => {
            let field = url.split('|').nth(2)?;
            percent_decode(field)
        }
        LinkKind::Thunder | LinkKind::Qqdl | LinkKind::Flashget => return None,
        _ => {
            let segment = strip_query(url).trim_end_matches('/').rsplit('/').next()?;
            percent_decode(segment)
        }
    };
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn percent_decode(text: &str) -> String {
    // form_urlencoded turns '+' into a space, which is harmless for file names
    url::form_urlencoded::parse(format!("v={}", text).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| text.to_string())
}

/// Infers an episode number from a link label, then from its file name
pub fn infer_episode(label: Option<&str>, file_name: Option<&str>) -> Option<u32> {
    [label, file_name]
        .into_iter()
        .flatten()
        .find_map(episode_in)
}

/// Looks for an episode number in one text
///
/// Patterns in order: `第N集/话/期`, an `E`/`EP` token, `SxxEyy`, then a
/// standalone short number.
pub fn episode_in(text: &str) -> Option<u32> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"第\s*(\d{1,3})\s*[集话期]",
            r"(?i)(?:^|[^a-z])EP?\s*(\d{1,3})(?:\D|$)",
            r"(?i)S\d{1,2}\s*E(\d{1,3})",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid regex"))
        .collect()
    });

    for re in patterns {
        if let Some(n) = re.captures(text).and_then(|c| c[1].parse::<u32>().ok()) {
            if n > 0 {
                return Some(n);
            }
        }
    }
    standalone_number(text)
}

/// Finds a short number standing on its own, such as the `02` in `show-02.mp4`
///
/// The number must follow one of `-`, `_`, space or `.`, be 1 to 3 digits long
/// and lie inside the episode range. Resolutions (`720p`, `4K`, `1080i`),
/// bit depths (`10bit`), frame rates (`60fps`) and decimals (`5.1`) are rejected.
fn standalone_number(text: &str) -> Option<u32> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let end = i;

        let prev = start.checked_sub(1).map(|p| chars[p]);
        let before_prev = start.checked_sub(2).map(|p| chars[p]);
        let next = chars.get(end).copied();
        let after_next = chars.get(end + 1).copied();

        if end - start > 3 || !matches!(prev, Some('-' | '_' | ' ' | '.')) {
            continue;
        }
        if matches!(
            next,
            Some('p' | 'P' | 'i' | 'I' | 'k' | 'K' | 'b' | 'B' | 'f' | 'F')
        ) {
            continue;
        }
        let decimal_before = prev == Some('.') && before_prev.is_some_and(|c| c.is_ascii_digit());
        let decimal_after = next == Some('.') && after_next.is_some_and(|c| c.is_ascii_digit());
        if decimal_before || decimal_after {
            continue;
        }

        let digits: String = chars[start..end].iter().collect();
        if let Ok(n) = digits.parse::<u32>() {
            if EPISODE_RANGE.contains(&n) {
                return Some(n);
            }
        }
    }
    None
}

//! Content kind classification
//!
//! Hints are consulted strongest first: the genre label, tag and keyword hits,
//! the URL path, the title. A URL hint then overrides anything but a genre-label hint,
//! and a plain `movie` is bucketed by country.

use crate::item::Kind;
use regex::Regex;
use std::sync::OnceLock;

/// Which signal decided the kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSource {
    GenreLabel,
    Keyword,
    Url,
    TitlePattern,
    Default,
}

/// Signals gathered during extraction
#[derive(Debug, Clone, Copy, Default)]
pub struct KindSignals<'a> {
    /// Tags split from the genre label
    pub genres: &'a [String],
    /// Every tag of the item, vocabulary hits included
    pub tags: &'a [String],
    /// Series-status keyword hits
    pub status_hits: &'a [String],
    pub url: &'a str,
    pub title: &'a str,
    pub country: Option<&'a str>,
}

/// Classifies an item
pub fn classify(signals: &KindSignals<'_>) -> (Kind, KindSource) {
    let url_hint = from_url(signals.url);

    let (mut kind, source) = if let Some(kind) = from_genres(signals.genres) {
        (kind, KindSource::GenreLabel)
    } else if let Some(kind) = from_genres(signals.tags) {
        (kind, KindSource::Keyword)
    } else if !signals.status_hits.is_empty() {
        (Kind::Tv, KindSource::Keyword)
    } else if let Some(kind) = url_hint {
        (kind, KindSource::Url)
    } else if is_serial_title(signals.title) {
        (Kind::Tv, KindSource::TitlePattern)
    } else {
        (Kind::Movie, KindSource::Default)
    };

    let source = match url_hint {
        Some(hint) if source != KindSource::GenreLabel => {
            kind = hint;
            KindSource::Url
        }
        _ => source,
    };

    if kind == Kind::Movie {
        kind = movie_bucket(signals.country);
    }
    (kind, source)
}

/// Kind implied by genre words or tags
pub fn from_genres(genres: &[String]) -> Option<Kind> {
    const RULES: &[(&[&str], Kind)] = &[
        (&["纪录"], Kind::Documentary),
        (&["电视剧", "剧集", "连续剧"], Kind::Tv),
        (&["综艺", "真人秀", "脱口秀"], Kind::Variety),
        (&["动漫", "番剧"], Kind::Anime),
    ];

    RULES
        .iter()
        .find(|(words, _)| {
            genres
                .iter()
                .any(|genre| words.iter().any(|word| genre.contains(word)))
        })
        .map(|(_, kind)| *kind)
}

/// Kind implied by the section segment of a detail URL
pub fn from_url(url: &str) -> Option<Kind> {
    let lowered = url.to_ascii_lowercase();
    if lowered.contains("/tv/") {
        Some(Kind::Tv)
    } else if lowered.contains("/dongman/") {
        Some(Kind::Anime)
    } else if lowered.contains("zongyi") {
        Some(Kind::Variety)
    } else if lowered.contains("/jilupian/") {
        Some(Kind::Documentary)
    } else {
        None
    }
}

/// Returns true for titles numbered like serial content
pub fn is_serial_title(title: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)第\s*[0-9一二三四五六七八九十百]+\s*[集季]|更新至|S\d{1,2}E\d{1,3}|(?:^|[^a-z])EP\d{1,3}")
            .expect("Invalid regex")
    });
    re.is_match(title)
}

/// Buckets a movie by the first country it lists
pub fn movie_bucket(country: Option<&str>) -> Kind {
    const HKTW: &[&str] = &["香港", "台湾", "澳门"];
    const CN: &[&str] = &["中国", "大陆", "内地"];
    const JPKR: &[&str] = &["日本", "韩国", "南韩"];
    const WEST: &[&str] = &[
        "美国", "英国", "法国", "德国", "意大利", "西班牙", "加拿大", "澳大利亚", "新西兰",
        "爱尔兰", "俄罗斯", "瑞典", "丹麦", "挪威", "芬兰", "荷兰", "比利时", "瑞士", "奥地利",
        "波兰", "葡萄牙", "欧美",
    ];

    let first = country.and_then(|c| {
        c.split(|ch: char| matches!(ch, '/' | '／' | '、' | ',' | '，' | '|'))
            .map(str::trim)
            .find(|s| !s.is_empty())
    });
    let first = match first {
        Some(first) => first,
        None => return Kind::Movie,
    };

    let any = |words: &[&str]| words.iter().any(|w| first.contains(w));
    if any(HKTW) {
        Kind::MovieHktw
    } else if any(CN) {
        Kind::MovieCn
    } else if any(JPKR) {
        Kind::MovieJpkr
    } else if any(WEST) {
        Kind::MovieWest
    } else {
        Kind::MovieOther
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_url_hint_classifies_serials() {
        let signals = KindSignals {
            url: "http://www.dydytt.net/html/tv/hytv/20240101/65000.html",
            title: "繁花",
            country: Some("中国大陆"),
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Tv, KindSource::Url));
    }

    #[test]
    fn test_documentary_label_beats_url() {
        let genres = strings(&["纪录片", "历史"]);
        let signals = KindSignals {
            genres: &genres,
            url: "http://www.dydytt.net/html/tv/hytv/20240101/65000.html",
            title: "河西走廊",
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Documentary, KindSource::GenreLabel));
    }

    #[test]
    fn test_url_overrides_keyword() {
        let status = strings(&["全集"]);
        let signals = KindSignals {
            status_hits: &status,
            url: "http://www.dydytt.net/html/dongman/20240101/1.html",
            title: "葬送的芙莉莲",
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Anime, KindSource::Url));
    }

    #[test]
    fn test_keyword_without_url_hint() {
        let status = strings(&["更新至"]);
        let signals = KindSignals {
            status_hits: &status,
            url: "http://www.dydytt.net/html/gndy/dyzz/20240101/1.html",
            title: "某剧",
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Tv, KindSource::Keyword));
    }

    #[test]
    fn test_serial_tag_sets_kind() {
        let tags = strings(&["电视剧", "国语"]);
        let signals = KindSignals {
            tags: &tags,
            url: "http://www.dydytt.net/html/gndy/dyzz/20240101/1.html",
            title: "繁花",
            country: Some("中国大陆"),
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Tv, KindSource::Keyword));
    }

    #[test]
    fn test_keyword_genre_hit_sets_kind() {
        let tags = strings(&["历史", "纪录片", "1080P"]);
        let signals = KindSignals {
            tags: &tags,
            url: "http://www.dydytt.net/html/gndy/dyzz/20240101/1.html",
            title: "河西走廊",
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Documentary, KindSource::Keyword));
    }

    #[test]
    fn test_tag_hint_beats_status_but_not_url() {
        let tags = strings(&["综艺"]);
        let status = strings(&["更新至"]);
        let signals = KindSignals {
            tags: &tags,
            status_hits: &status,
            url: "http://www.dydytt.net/html/gndy/dyzz/20240101/1.html",
            title: "乘风破浪",
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Variety, KindSource::Keyword));

        let signals = KindSignals {
            url: "http://www.dydytt.net/html/tv/hytv/20240101/1.html",
            ..signals
        };
        assert_eq!(classify(&signals), (Kind::Tv, KindSource::Url));
    }

    #[test]
    fn test_title_pattern() {
        assert!(is_serial_title("庆余年第二季"));
        assert!(is_serial_title("繁花 第30集"));
        assert!(is_serial_title("The Bear S03E01"));
        assert!(is_serial_title("Show EP02"));
        assert!(!is_serial_title("Creep 2014"));
        assert!(!is_serial_title("流浪地球2"));

        let signals = KindSignals {
            url: "http://www.dydytt.net/html/gndy/dyzz/20240101/1.html",
            title: "庆余年第二季",
            ..Default::default()
        };
        assert_eq!(classify(&signals), (Kind::Tv, KindSource::TitlePattern));
    }

    #[test]
    fn test_movies_are_bucketed_by_country() {
        let signals = KindSignals {
            url: "http://www.dydytt.net/html/gndy/dyzz/20240101/1.html",
            title: "流浪地球2",
            country: Some("中国大陆"),
            ..Default::default()
        };
        assert_eq!(classify(&signals).0, Kind::MovieCn);

        assert_eq!(movie_bucket(Some("中国香港 / 中国大陆")), Kind::MovieHktw);
        assert_eq!(movie_bucket(Some("美国/中国大陆")), Kind::MovieWest);
        assert_eq!(movie_bucket(Some("韩国")), Kind::MovieJpkr);
        assert_eq!(movie_bucket(Some("印度")), Kind::MovieOther);
        assert_eq!(movie_bucket(None), Kind::Movie);
    }

    #[test]
    fn test_non_movies_are_not_bucketed() {
        let genres = strings(&["综艺"]);
        let signals = KindSignals {
            genres: &genres,
            url: "http://www.dydytt.net/html/gndy/dyzz/20240101/1.html",
            title: "乘风破浪",
            country: Some("中国大陆"),
            ..Default::default()
        };
        assert_eq!(classify(&signals).0, Kind::Variety);
    }
}

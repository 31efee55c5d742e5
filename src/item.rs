//! Typed catalogue records
//!
//! `Item` is what the extraction engine produces and the store persists. Enum
//! columns round-trip through `to_db_string`/`from_db_string`.

use crate::extract::ExtractError;
use serde::Serialize;

/// Content bucket of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Film with no known country
    Movie,
    MovieCn,
    MovieHktw,
    MovieJpkr,
    MovieWest,
    MovieOther,
    Tv,
    Anime,
    Variety,
    Documentary,
}

impl Kind {
    pub const ALL: [Kind; 10] = [
        Kind::Movie,
        Kind::MovieCn,
        Kind::MovieHktw,
        Kind::MovieJpkr,
        Kind::MovieWest,
        Kind::MovieOther,
        Kind::Tv,
        Kind::Anime,
        Kind::Variety,
        Kind::Documentary,
    ];

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::MovieCn => "movie_cn",
            Self::MovieHktw => "movie_hktw",
            Self::MovieJpkr => "movie_jpkr",
            Self::MovieWest => "movie_west",
            Self::MovieOther => "movie_other",
            Self::Tv => "tv",
            Self::Anime => "anime",
            Self::Variety => "variety",
            Self::Documentary => "documentary",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.to_db_string() == s)
    }

    /// True for `movie` and every country bucket of it
    pub fn is_movie(&self) -> bool {
        matches!(
            self,
            Self::Movie
                | Self::MovieCn
                | Self::MovieHktw
                | Self::MovieJpkr
                | Self::MovieWest
                | Self::MovieOther
        )
    }

    /// Human readable label used by the console output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Movie => "电影",
            Self::MovieCn => "华语电影",
            Self::MovieHktw => "港台电影",
            Self::MovieJpkr => "日韩电影",
            Self::MovieWest => "欧美电影",
            Self::MovieOther => "其他电影",
            Self::Tv => "电视剧",
            Self::Anime => "动漫",
            Self::Variety => "综艺",
            Self::Documentary => "纪录片",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Where a rating came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RatingSource {
    Douban,
    Imdb,
}

impl RatingSource {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Douban => "Douban",
            Self::Imdb => "IMDB",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "Douban" => Some(Self::Douban),
            "IMDB" => Some(Self::Imdb),
            _ => None,
        }
    }
}

/// Transport of a download link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Magnet,
    Ed2k,
    Ftp,
    Thunder,
    Qqdl,
    Flashget,
    Torrent,
    /// Cloud-drive share page
    Pan,
}

impl LinkKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Magnet => "magnet",
            Self::Ed2k => "ed2k",
            Self::Ftp => "ftp",
            Self::Thunder => "thunder",
            Self::Qqdl => "qqdl",
            Self::Flashget => "flashget",
            Self::Torrent => "torrent",
            Self::Pan => "pan",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "magnet" => Some(Self::Magnet),
            "ed2k" => Some(Self::Ed2k),
            "ftp" => Some(Self::Ftp),
            "thunder" => Some(Self::Thunder),
            "qqdl" => Some(Self::Qqdl),
            "flashget" => Some(Self::Flashget),
            "torrent" => Some(Self::Torrent),
            "pan" => Some(Self::Pan),
            _ => None,
        }
    }
}

/// One download link attached to an item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadLink {
    pub url: String,
    pub kind: LinkKind,
    pub label: Option<String>,
    pub episode: Option<u32>,
}

/// A structured catalogue record keyed by its detail URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub detail_url: String,
    pub title: String,
    pub original_title: Option<String>,
    /// Distinct title candidates in document order
    pub alt_titles: Vec<String>,
    pub year: Option<i32>,
    pub kind: Kind,
    pub country: Option<String>,
    pub language: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub rating_source: Option<RatingSource>,
    pub rating_value: Option<f64>,
    /// Votes behind `rating_value`
    pub rating_votes: Option<u32>,
    /// Ordered, deduplicated tag names
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    #[serde(skip)]
    pub raw_html: Option<String>,
    pub download_links: Vec<DownloadLink>,
}

impl Item {
    /// Creates an item with only its key fields set
    pub fn new(detail_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            detail_url: detail_url.into(),
            title: title.into(),
            original_title: None,
            alt_titles: Vec::new(),
            year: None,
            kind: Kind::Movie,
            country: None,
            language: None,
            director: None,
            actors: None,
            rating_source: None,
            rating_value: None,
            rating_votes: None,
            tags: Vec::new(),
            description: None,
            cover_url: None,
            raw_html: None,
            download_links: Vec::new(),
        }
    }

    /// Checks the fields the store relies on
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.detail_url.trim().is_empty() {
            return Err(ExtractError::MissingDetailUrl);
        }
        if self.title.trim().is_empty() {
            return Err(ExtractError::Untitled(self.detail_url.clone()));
        }
        Ok(())
    }

    /// Tags as stored in `tags_text`
    pub fn tags_text(&self) -> Option<String> {
        join_non_empty(&self.tags)
    }

    /// Alternate titles as stored in `alt_titles_text`
    pub fn alt_titles_text(&self) -> Option<String> {
        join_non_empty(&self.alt_titles)
    }
}

fn join_non_empty(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

//! Storage module for persisting catalogue and crawl-session data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The idempotent item upsert (tags and download links included)
//! - Per-session frontier queue and visited sets for resumable crawls
//! - The append-only crawl event log
//! - Parameterised item queries and statistics

mod query;
mod schema;
mod sqlite;
mod traits;

pub use query::{ItemQuery, SortColumn, SortDirection};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::DyttError;

use std::path::Path;

/// Opens a storage database, creating parent directories when needed
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(DyttError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, DyttError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStorage::new(path)
}

/// Identifies where frontier and visited state live for a crawl
///
/// A persistent handle writes everything to the session tables so a later run
/// with the same id resumes. An ephemeral handle keeps state in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionHandle {
    Persistent(String),
    Ephemeral,
}

impl SessionHandle {
    /// The session id, if persistent
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Persistent(id) => Some(id),
            Self::Ephemeral => None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

/// Partition of the visited set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitKind {
    /// A fetched list or navigation page
    Page,
    /// A detail page that produced (or failed to produce) an item
    Detail,
}

impl VisitKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Detail => "detail",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "page" => Some(Self::Page),
            "detail" => Some(Self::Detail),
            _ => None,
        }
    }
}

/// Status of a frontier entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Queued,
    Done,
}

impl QueueStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Done => "done",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Represents a crawl session row
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub started_at: String,
    pub updated_at: String,
    pub notes: Option<String>,
}

/// A stored item, as read back from `movies`
#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub id: i64,
    pub detail_url: String,
    pub title: String,
    pub original_title: Option<String>,
    pub alt_titles_text: Option<String>,
    pub year: Option<i32>,
    pub kind: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub rating_source: Option<String>,
    pub rating_value: Option<f64>,
    pub tags_text: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub rating_votes: Option<u32>,
}

/// The columns listed by a search
#[derive(Debug, Clone)]
pub struct ItemSummary {
    pub id: i64,
    pub title: String,
    pub kind: Option<String>,
    pub year: Option<i32>,
    pub country: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub rating_source: Option<String>,
    pub rating_value: Option<f64>,
    pub tags_text: Option<String>,
    pub detail_url: String,
}

/// A stored download link
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadLinkRecord {
    pub kind: Option<String>,
    pub url: String,
    pub label: Option<String>,
    pub episode: Option<u32>,
}

/// Raw content kept for re-extraction
#[derive(Debug, Clone)]
pub struct RawItem {
    pub id: i64,
    pub detail_url: String,
    pub kind: Option<String>,
    pub raw_html: Option<String>,
}

/// Optional item columns whose fill rate the statistics report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    OriginalTitle,
    Year,
    Country,
    Language,
    Director,
    Actors,
    Rating,
    Tags,
    Description,
    Cover,
}

impl ItemField {
    pub const ALL: [ItemField; 10] = [
        ItemField::OriginalTitle,
        ItemField::Year,
        ItemField::Country,
        ItemField::Language,
        ItemField::Director,
        ItemField::Actors,
        ItemField::Rating,
        ItemField::Tags,
        ItemField::Description,
        ItemField::Cover,
    ];

    /// Column name in `movies`
    pub fn column(&self) -> &'static str {
        match self {
            Self::OriginalTitle => "original_title",
            Self::Year => "year",
            Self::Country => "country",
            Self::Language => "language",
            Self::Director => "director",
            Self::Actors => "actors",
            Self::Rating => "rating_value",
            Self::Tags => "tags_text",
            Self::Description => "description",
            Self::Cover => "cover_url",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_kind_roundtrip() {
        for kind in [VisitKind::Page, VisitKind::Detail] {
            assert_eq!(VisitKind::from_db_string(kind.to_db_string()), Some(kind));
        }
        assert_eq!(VisitKind::from_db_string("invalid"), None);
    }

    #[test]
    fn test_queue_status_roundtrip() {
        for status in [QueueStatus::Queued, QueueStatus::Done] {
            assert_eq!(QueueStatus::from_db_string(status.to_db_string()), Some(status));
        }
    }

    #[test]
    fn test_session_handle() {
        let handle = SessionHandle::Persistent("nightly".to_string());
        assert_eq!(handle.id(), Some("nightly"));
        assert!(handle.is_persistent());
        assert_eq!(SessionHandle::Ephemeral.id(), None);
    }

    #[test]
    fn test_open_storage_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("movies.db");
        assert!(open_storage(&path).is_ok());
        assert!(path.exists());
    }
}

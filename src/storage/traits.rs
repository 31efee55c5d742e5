//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CrawlEvent;
use crate::item::Item;
use crate::storage::{
    DownloadLinkRecord, ItemField, ItemQuery, ItemRecord, ItemSummary, QueueStatus, RawItem,
    SessionHandle, SessionRecord, VisitKind,
};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler and the
/// query commands. Every session-scoped operation is a no-op (or returns an
/// empty result) for `SessionHandle::Ephemeral`.
pub trait Storage {
    // ===== Session Management =====

    /// Resolves a session handle, creating the session row on first use
    ///
    /// # Arguments
    ///
    /// * `session_id` - The session id, or None for an in-memory crawl
    ///
    /// # Returns
    ///
    /// `SessionHandle::Persistent` when an id is given, otherwise `Ephemeral`
    fn ensure_session(&mut self, session_id: Option<&str>) -> StorageResult<SessionHandle>;

    /// Gets a session by id
    fn get_session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>>;

    /// Replaces the free-form notes of a session
    fn set_session_notes(&mut self, session: &SessionHandle, notes: &str) -> StorageResult<()>;

    // ===== Frontier Management =====

    /// Adds URLs to the session queue
    ///
    /// Duplicate `(session, url)` pairs are ignored, including URLs that are
    /// already done.
    ///
    /// # Returns
    ///
    /// The number of URLs that were newly queued
    fn enqueue(&mut self, session: &SessionHandle, urls: &[String]) -> StorageResult<usize>;

    /// Returns up to `limit` queued URLs in enqueue order
    fn dequeue_batch(&self, session: &SessionHandle, limit: usize) -> StorageResult<Vec<String>>;

    /// Moves a URL from queued to done
    fn mark_done(&mut self, session: &SessionHandle, url: &str) -> StorageResult<()>;

    /// Counts queue entries in one status
    fn count_queue(&self, session: &SessionHandle, status: QueueStatus) -> StorageResult<u64>;

    // ===== Visit Tracking =====

    /// Records a URL as visited under one kind
    fn mark_visited(
        &mut self,
        session: &SessionHandle,
        url: &str,
        kind: VisitKind,
    ) -> StorageResult<()>;

    /// Checks whether a URL was visited under one kind
    fn is_visited(&self, session: &SessionHandle, url: &str, kind: VisitKind)
        -> StorageResult<bool>;

    /// Loads the full visited set for one kind
    fn load_visited(&self, session: &SessionHandle, kind: VisitKind)
        -> StorageResult<HashSet<String>>;

    // ===== Event Log =====

    /// Appends a progress event to the session log
    fn append_event(&mut self, session: &SessionHandle, event: &CrawlEvent) -> StorageResult<()>;

    /// Counts logged events by event name, optionally for one session
    fn count_events(&self, session_id: Option<&str>) -> StorageResult<Vec<(String, u64)>>;

    // ===== Items =====

    /// Inserts or updates an item keyed by its detail URL
    ///
    /// Tags and download links are merged in the same transaction.
    ///
    /// # Returns
    ///
    /// The row id of the item
    fn upsert_item(&mut self, item: &Item) -> StorageResult<i64>;

    /// Gets an item by id
    fn get_item(&self, id: i64) -> StorageResult<Option<ItemRecord>>;

    /// Gets an item by detail URL
    fn get_item_by_url(&self, detail_url: &str) -> StorageResult<Option<ItemRecord>>;

    /// Gets the tag names linked to an item
    fn get_item_tags(&self, id: i64) -> StorageResult<Vec<String>>;

    /// Gets the download links of an item
    fn get_download_links(&self, id: i64) -> StorageResult<Vec<DownloadLinkRecord>>;

    /// Lists items matching a query
    fn search_items(&self, query: &ItemQuery) -> StorageResult<Vec<ItemSummary>>;

    /// Counts items matching a query, ignoring its limit and offset
    fn count_items(&self, query: &ItemQuery) -> StorageResult<u64>;

    /// Lists stored raw content for re-extraction
    ///
    /// # Arguments
    ///
    /// * `kind` - Only items of this kind (`movie` matches every movie bucket)
    /// * `limit` - Maximum rows, None for all
    fn list_raw_items(&self, kind: Option<&str>, limit: Option<usize>)
        -> StorageResult<Vec<RawItem>>;

    // ===== Statistics =====

    /// Counts all stored items
    fn count_total_items(&self) -> StorageResult<u64>;

    /// Counts items whose optional column holds a non-empty value
    fn count_filled(&self, field: ItemField) -> StorageResult<u64>;

    /// Item counts grouped by kind, largest first
    fn kind_distribution(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Download link counts grouped by link kind, largest first
    fn download_link_kinds(&self) -> StorageResult<Vec<(String, u64)>>;
}

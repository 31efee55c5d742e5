//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::CrawlEvent;
use crate::item::Item;
use crate::storage::schema::{drop_all_tables, initialize_schema};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    DownloadLinkRecord, ItemField, ItemQuery, ItemRecord, ItemSummary, QueueStatus, RawItem,
    SessionHandle, SessionRecord, VisitKind,
};
use crate::DyttError;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const ITEM_COLUMNS: &str = "id, detail_url, title, original_title, alt_titles_text, year, kind, \
     country, language, director, actors, rating_source, rating_value, tags_text, description, \
     cover_url, created_at, updated_at, rating_votes";

const SUMMARY_COLUMNS: &str = "id, title, kind, year, country, director, actors, rating_source, \
     rating_value, tags_text, detail_url";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(DyttError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, DyttError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DyttError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Drops every table and recreates an empty schema
    pub fn reset(&mut self) -> StorageResult<()> {
        drop_all_tables(&self.conn)?;
        initialize_schema(&self.conn)?;
        Ok(())
    }

    fn touch_session(&self, session_id: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE crawl_sessions SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), session_id],
        )?;
        Ok(())
    }

    fn query_item<P: rusqlite::Params>(
        &self,
        column: &str,
        key: P,
    ) -> StorageResult<Option<ItemRecord>> {
        let sql = format!("SELECT {} FROM movies WHERE {} = ?1", ITEM_COLUMNS, column);
        let item = self
            .conn
            .query_row(&sql, key, item_record_from_row)
            .optional()?;
        Ok(item)
    }
}

fn item_record_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRecord> {
    Ok(ItemRecord {
        id: row.get(0)?,
        detail_url: row.get(1)?,
        title: row.get(2)?,
        original_title: row.get(3)?,
        alt_titles_text: row.get(4)?,
        year: row.get(5)?,
        kind: row.get(6)?,
        country: row.get(7)?,
        language: row.get(8)?,
        director: row.get(9)?,
        actors: row.get(10)?,
        rating_source: row.get(11)?,
        rating_value: row.get(12)?,
        tags_text: row.get(13)?,
        description: row.get(14)?,
        cover_url: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        rating_votes: row.get(18)?,
    })
}

fn item_summary_from_row(row: &Row<'_>) -> rusqlite::Result<ItemSummary> {
    Ok(ItemSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        kind: row.get(2)?,
        year: row.get(3)?,
        country: row.get(4)?,
        director: row.get(5)?,
        actors: row.get(6)?,
        rating_source: row.get(7)?,
        rating_value: row.get(8)?,
        tags_text: row.get(9)?,
        detail_url: row.get(10)?,
    })
}

/// Trimmed, non-empty, first-seen-order tag names
fn distinct_tags(tags: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(*t))
        .collect()
}

impl Storage for SqliteStorage {
    // ===== Session Management =====

    fn ensure_session(&mut self, session_id: Option<&str>) -> StorageResult<SessionHandle> {
        let id = match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => return Ok(SessionHandle::Ephemeral),
        };

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO crawl_sessions (id, started_at, updated_at) VALUES (?1, ?2, ?2)",
            params![id, now],
        )?;
        self.touch_session(id)?;

        Ok(SessionHandle::Persistent(id.to_string()))
    }

    fn get_session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, started_at, updated_at, notes FROM crawl_sessions WHERE id = ?1",
                params![session_id],
                |row| {
                    Ok(SessionRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        updated_at: row.get(2)?,
                        notes: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    fn set_session_notes(&mut self, session: &SessionHandle, notes: &str) -> StorageResult<()> {
        if let Some(id) = session.id() {
            self.conn.execute(
                "UPDATE crawl_sessions SET notes = ?1, updated_at = ?2 WHERE id = ?3",
                params![notes, Utc::now().to_rfc3339(), id],
            )?;
        }
        Ok(())
    }

    // ===== Frontier Management =====

    fn enqueue(&mut self, session: &SessionHandle, urls: &[String]) -> StorageResult<usize> {
        let id = match session.id() {
            Some(id) if !urls.is_empty() => id,
            _ => return Ok(0),
        };

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO crawl_queue (session_id, url, status, enqueued_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for url in urls {
                inserted += stmt.execute(params![id, url, QueueStatus::Queued.to_db_string(), now])?;
            }
        }
        tx.execute(
            "UPDATE crawl_sessions SET updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        tx.commit()?;

        Ok(inserted)
    }

    fn dequeue_batch(&self, session: &SessionHandle, limit: usize) -> StorageResult<Vec<String>> {
        let id = match session.id() {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let mut stmt = self.conn.prepare(
            "SELECT url FROM crawl_queue WHERE session_id = ?1 AND status = ?2
             ORDER BY rowid ASC LIMIT ?3",
        )?;

        let urls = stmt
            .query_map(
                params![id, QueueStatus::Queued.to_db_string(), limit as i64],
                |row| row.get(0),
            )?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    fn mark_done(&mut self, session: &SessionHandle, url: &str) -> StorageResult<()> {
        if let Some(id) = session.id() {
            self.conn.execute(
                "UPDATE crawl_queue SET status = ?1, dequeued_at = ?2
                 WHERE session_id = ?3 AND url = ?4 AND status = ?5",
                params![
                    QueueStatus::Done.to_db_string(),
                    Utc::now().to_rfc3339(),
                    id,
                    url,
                    QueueStatus::Queued.to_db_string()
                ],
            )?;
            self.touch_session(id)?;
        }
        Ok(())
    }

    fn count_queue(&self, session: &SessionHandle, status: QueueStatus) -> StorageResult<u64> {
        let id = match session.id() {
            Some(id) => id,
            None => return Ok(0),
        };
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_queue WHERE session_id = ?1 AND status = ?2",
            params![id, status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Visit Tracking =====

    fn mark_visited(
        &mut self,
        session: &SessionHandle,
        url: &str,
        kind: VisitKind,
    ) -> StorageResult<()> {
        if let Some(id) = session.id() {
            self.conn.execute(
                "INSERT OR IGNORE INTO crawl_visits (session_id, url, kind, visited_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, url, kind.to_db_string(), Utc::now().to_rfc3339()],
            )?;
            self.touch_session(id)?;
        }
        Ok(())
    }

    fn is_visited(
        &self,
        session: &SessionHandle,
        url: &str,
        kind: VisitKind,
    ) -> StorageResult<bool> {
        let id = match session.id() {
            Some(id) => id,
            None => return Ok(false),
        };
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM crawl_visits WHERE session_id = ?1 AND url = ?2 AND kind = ?3",
                params![id, url, kind.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn load_visited(
        &self,
        session: &SessionHandle,
        kind: VisitKind,
    ) -> StorageResult<HashSet<String>> {
        let id = match session.id() {
            Some(id) => id,
            None => return Ok(HashSet::new()),
        };

        let mut stmt = self
            .conn
            .prepare("SELECT url FROM crawl_visits WHERE session_id = ?1 AND kind = ?2")?;
        let urls = stmt
            .query_map(params![id, kind.to_db_string()], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;

        Ok(urls)
    }

    // ===== Event Log =====

    fn append_event(&mut self, session: &SessionHandle, event: &CrawlEvent) -> StorageResult<()> {
        if let Some(id) = session.id() {
            let count = event.count.or(event.found.map(|f| f as u64)).map(|c| c as i64);
            self.conn.execute(
                "INSERT INTO crawl_events
                 (session_id, event, section, url, detail_url, message, count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    event.event.as_str(),
                    event.section,
                    event.url,
                    event.detail_url,
                    event.message,
                    count,
                    Utc::now().to_rfc3339()
                ],
            )?;
            self.touch_session(id)?;
        }
        Ok(())
    }

    fn count_events(&self, session_id: Option<&str>) -> StorageResult<Vec<(String, u64)>> {
        let (sql, args): (&str, Vec<Value>) = match session_id {
            Some(id) => (
                "SELECT event, COUNT(*) FROM crawl_events WHERE session_id = ?1
                 GROUP BY event ORDER BY COUNT(*) DESC, event",
                vec![Value::Text(id.to_string())],
            ),
            None => (
                "SELECT event, COUNT(*) FROM crawl_events GROUP BY event ORDER BY COUNT(*) DESC, event",
                Vec::new(),
            ),
        };

        let mut stmt = self.conn.prepare(sql)?;
        let counts = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((row.get(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    // ===== Items =====

    fn upsert_item(&mut self, item: &Item) -> StorageResult<i64> {
        item.validate()
            .map_err(|e| StorageError::InvalidItem(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO movies (
                title, original_title, alt_titles_text, year, kind, country, language,
                director, actors, rating_source, rating_value, tags_text, description,
                cover_url, detail_url, raw_html, created_at, updated_at, rating_votes
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17, ?18)
             ON CONFLICT(detail_url) DO UPDATE SET
                title = excluded.title,
                original_title = excluded.original_title,
                alt_titles_text = excluded.alt_titles_text,
                year = excluded.year,
                kind = excluded.kind,
                country = excluded.country,
                language = excluded.language,
                director = excluded.director,
                actors = excluded.actors,
                rating_source = excluded.rating_source,
                rating_value = excluded.rating_value,
                rating_votes = excluded.rating_votes,
                tags_text = excluded.tags_text,
                description = excluded.description,
                cover_url = excluded.cover_url,
                raw_html = excluded.raw_html,
                updated_at = excluded.updated_at",
            params![
                item.title.trim(),
                item.original_title,
                item.alt_titles_text(),
                item.year,
                item.kind.to_db_string(),
                item.country,
                item.language,
                item.director,
                item.actors,
                item.rating_source.map(|s| s.to_db_string()),
                item.rating_value,
                item.tags_text(),
                item.description,
                item.cover_url,
                item.detail_url,
                item.raw_html,
                now,
                item.rating_votes,
            ],
        )?;

        let movie_id: i64 = tx.query_row(
            "SELECT id FROM movies WHERE detail_url = ?1",
            params![item.detail_url],
            |row| row.get(0),
        )?;

        for name in distinct_tags(&item.tags) {
            tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;
            let tag_id: i64 =
                tx.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
                    row.get(0)
                })?;
            tx.execute(
                "INSERT OR IGNORE INTO movie_tags (movie_id, tag_id) VALUES (?1, ?2)",
                params![movie_id, tag_id],
            )?;
        }

        for link in &item.download_links {
            if link.url.trim().is_empty() {
                continue;
            }
            tx.execute(
                "INSERT INTO download_links (movie_id, url, kind, label, episode)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(movie_id, url) DO UPDATE SET
                    kind = excluded.kind,
                    label = excluded.label,
                    episode = COALESCE(excluded.episode, download_links.episode)",
                params![
                    movie_id,
                    link.url,
                    link.kind.to_db_string(),
                    link.label,
                    link.episode
                ],
            )?;
        }

        tx.commit()?;
        Ok(movie_id)
    }

    fn get_item(&self, id: i64) -> StorageResult<Option<ItemRecord>> {
        self.query_item("id", params![id])
    }

    fn get_item_by_url(&self, detail_url: &str) -> StorageResult<Option<ItemRecord>> {
        self.query_item("detail_url", params![detail_url])
    }

    fn get_item_tags(&self, id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM tags t JOIN movie_tags mt ON mt.tag_id = t.id
             WHERE mt.movie_id = ?1 ORDER BY t.id",
        )?;
        let tags = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(tags)
    }

    fn get_download_links(&self, id: i64) -> StorageResult<Vec<DownloadLinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, url, label, episode FROM download_links WHERE movie_id = ?1 ORDER BY id",
        )?;
        let links = stmt
            .query_map(params![id], |row| {
                Ok(DownloadLinkRecord {
                    kind: row.get(0)?,
                    url: row.get(1)?,
                    label: row.get(2)?,
                    episode: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    fn search_items(&self, query: &ItemQuery) -> StorageResult<Vec<ItemSummary>> {
        let (filter, mut args) = query.where_clause();
        let order = query.order_clause(&mut args);
        let sql = format!("SELECT {} FROM movies{}{}", SUMMARY_COLUMNS, filter, order);

        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), item_summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn count_items(&self, query: &ItemQuery) -> StorageResult<u64> {
        let (filter, args) = query.where_clause();
        let sql = format!("SELECT COUNT(*) FROM movies{}", filter);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn list_raw_items(
        &self,
        kind: Option<&str>,
        limit: Option<usize>,
    ) -> StorageResult<Vec<RawItem>> {
        let mut sql = String::from("SELECT id, detail_url, kind, raw_html FROM movies");
        let mut args: Vec<Value> = Vec::new();

        match kind.map(str::trim).filter(|k| !k.is_empty()) {
            Some("movie") => {
                sql.push_str(" WHERE kind LIKE ?");
                args.push(Value::Text("movie%".to_string()));
            }
            Some(kind) => {
                sql.push_str(" WHERE kind = ?");
                args.push(Value::Text(kind.to_string()));
            }
            None => {}
        }

        sql.push_str(" ORDER BY id ASC LIMIT ?");
        args.push(Value::Integer(limit.map(|l| l as i64).unwrap_or(-1)));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(RawItem {
                    id: row.get(0)?,
                    detail_url: row.get(1)?,
                    kind: row.get(2)?,
                    raw_html: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Statistics =====

    fn count_total_items(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_filled(&self, field: ItemField) -> StorageResult<u64> {
        let column = field.column();
        let sql = format!(
            "SELECT COUNT(*) FROM movies WHERE {col} IS NOT NULL AND TRIM(CAST({col} AS TEXT)) != ''",
            col = column
        );
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn kind_distribution(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(kind, 'unknown') AS k, COUNT(*) AS c FROM movies
             GROUP BY k ORDER BY c DESC, k",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn download_link_kinds(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(kind, 'unknown') AS k, COUNT(*) AS c FROM download_links
             GROUP BY k ORDER BY c DESC, k",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

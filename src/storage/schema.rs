//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the dytt-index database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Catalogue records, one per detail page
CREATE TABLE IF NOT EXISTS movies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    original_title TEXT,
    alt_titles_text TEXT,
    year INTEGER,
    kind TEXT,
    country TEXT,
    language TEXT,
    director TEXT,
    actors TEXT,
    rating_source TEXT,
    rating_value REAL,
    rating_votes INTEGER,
    tags_text TEXT,
    description TEXT,
    cover_url TEXT,
    detail_url TEXT NOT NULL UNIQUE,
    raw_html TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_movies_kind ON movies(kind);
CREATE INDEX IF NOT EXISTS idx_movies_year ON movies(year);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS movie_tags (
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (movie_id, tag_id)
);

CREATE TABLE IF NOT EXISTS download_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    kind TEXT,
    label TEXT,
    episode INTEGER,
    UNIQUE(movie_id, url)
);

CREATE INDEX IF NOT EXISTS idx_download_links_movie ON download_links(movie_id);

-- Resumable crawl sessions
CREATE TABLE IF NOT EXISTS crawl_sessions (
    id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    notes TEXT
);

-- Frontier queue; rowid order is enqueue order
CREATE TABLE IF NOT EXISTS crawl_queue (
    session_id TEXT NOT NULL REFERENCES crawl_sessions(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    enqueued_at TEXT NOT NULL,
    dequeued_at TEXT,
    PRIMARY KEY (session_id, url)
);

CREATE INDEX IF NOT EXISTS idx_crawl_queue_status ON crawl_queue(session_id, status);

CREATE TABLE IF NOT EXISTS crawl_visits (
    session_id TEXT NOT NULL REFERENCES crawl_sessions(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    visited_at TEXT NOT NULL,
    PRIMARY KEY (session_id, url, kind)
);

-- Append-only progress log
CREATE TABLE IF NOT EXISTS crawl_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES crawl_sessions(id) ON DELETE CASCADE,
    event TEXT NOT NULL,
    section TEXT,
    url TEXT,
    detail_url TEXT,
    message TEXT,
    count INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_events_session ON crawl_events(session_id);
"#;

/// Tables in dependency order, children first
const TABLES: &[&str] = &[
    "crawl_events",
    "crawl_visits",
    "crawl_queue",
    "crawl_sessions",
    "download_links",
    "movie_tags",
    "tags",
    "movies",
];

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    add_missing_columns(conn)?;
    Ok(())
}

/// Columns added to `movies` after its first release
const ADDED_MOVIE_COLUMNS: &[(&str, &str)] = &[("rating_votes", "INTEGER")];

/// Brings a `movies` table created by an older release up to date
fn add_missing_columns(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare("PRAGMA table_info(movies)")?;
    let existing = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;

    for (column, sql_type) in ADDED_MOVIE_COLUMNS {
        if !existing.iter().any(|c| c == column) {
            conn.execute_batch(&format!(
                "ALTER TABLE movies ADD COLUMN {} {};",
                column, sql_type
            ))?;
        }
    }
    Ok(())
}

/// Drops every table so the schema can be recreated from scratch
pub fn drop_all_tables(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    for table in TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", table))?;
    }
    Ok(())
}

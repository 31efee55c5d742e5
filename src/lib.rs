//! dytt-index: a resumable catalogue crawler
//!
//! This crate crawls a movie/TV download catalogue across its mirrors, extracts
//! structured records from loosely formatted detail pages and stores them in
//! SQLite with resumable, at-most-once processing per crawl session.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod item;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for dytt-index operations
#[derive(Debug, Error)]
pub enum DyttError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for dytt-index operations
pub type Result<T> = std::result::Result<T, DyttError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlEvent, EventKind, StopHandle};
pub use extract::{extract, extract_detail};
pub use item::{DownloadLink, Item, Kind, RatingSource};
pub use storage::{SessionHandle, SqliteStorage, Storage};

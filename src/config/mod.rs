//! Configuration module for dytt-index
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file (or no file at all) yields the
//! built-in site settings.
//!
//! # Example
//!
//! ```no_run
//! use dytt_index::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("dytt.toml")).unwrap();
//! println!("Crawl will stop after {} pages", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, FetchConfig, OutputConfig, SectionConfig, SiteConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

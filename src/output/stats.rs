//! Statistics generation from the catalogue database
//!
//! This module provides functionality for extracting and displaying
//! catalogue statistics from the storage layer.

use crate::storage::{ItemField, Storage};
use crate::DyttError;

/// Catalogue statistics summary
#[derive(Debug, Clone)]
pub struct CatalogueStatistics {
    /// Total number of stored items
    pub total_items: u64,

    /// Filled count per optional item column
    pub coverage: Vec<(ItemField, u64)>,

    /// Item count per kind, largest first
    pub kinds: Vec<(String, u64)>,

    /// Download link count per link kind, largest first
    pub link_kinds: Vec<(String, u64)>,

    /// Crawl event count per event name, largest first
    pub events: Vec<(String, u64)>,
}

impl CatalogueStatistics {
    /// Share of items with the field filled, as a percentage
    pub fn coverage_percent(&self, field: ItemField) -> f64 {
        let filled = self
            .coverage
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        percent(filled, self.total_items)
    }
}

fn percent(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `session_id` - Restricts event counts to one session when given
///
/// # Returns
///
/// * `Ok(CatalogueStatistics)` - Successfully loaded statistics
/// * `Err(DyttError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    session_id: Option<&str>,
) -> Result<CatalogueStatistics, DyttError> {
    let total_items = storage.count_total_items()?;

    let mut coverage = Vec::with_capacity(ItemField::ALL.len());
    for field in ItemField::ALL {
        coverage.push((field, storage.count_filled(field)?));
    }

    Ok(CatalogueStatistics {
        total_items,
        coverage,
        kinds: storage.kind_distribution()?,
        link_kinds: storage.download_link_kinds()?,
        events: storage.count_events(session_id)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CatalogueStatistics) {
    println!("=== Catalogue Statistics ===\n");

    println!("Overview:");
    println!("  Total items: {}", stats.total_items);
    println!();

    println!("Field Coverage:");
    for (field, filled) in &stats.coverage {
        println!(
            "  {}: {} ({:.1}%)",
            field.column(),
            filled,
            percent(*filled, stats.total_items)
        );
    }
    println!();

    if !stats.kinds.is_empty() {
        println!("Items by Kind:");
        for (kind, count) in &stats.kinds {
            println!(
                "  {}: {} ({:.1}%)",
                kind,
                count,
                percent(*count, stats.total_items)
            );
        }
        println!();
    }

    if !stats.link_kinds.is_empty() {
        let total_links: u64 = stats.link_kinds.iter().map(|(_, n)| n).sum();
        println!("Download Links ({}):", total_links);
        for (kind, count) in &stats.link_kinds {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if !stats.events.is_empty() {
        println!("Crawl Events:");
        for (event, count) in &stats.events {
            println!("  {}: {}", event, count);
        }
    }
}

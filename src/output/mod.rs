//! Output module for crawl progress and catalogue reports
//!
//! This module handles:
//! - Rendering crawl events on the console, as text or JSON lines
//! - Loading and printing catalogue statistics
//! - Printing search results

mod progress;
pub mod stats;

pub use progress::{render_line, ConsoleSink, ProgressFormat};
pub use stats::{load_statistics, print_statistics, CatalogueStatistics};

use crate::storage::{DownloadLinkRecord, ItemSummary};

/// Prints search results as a table
///
/// # Arguments
///
/// * `items` - The matching items, in display order
/// * `total` - Number of items matching the query before paging
pub fn print_search_results(items: &[ItemSummary], total: u64) {
    println!("共 {} 条, 显示 {} 条\n", total, items.len());
    println!(
        "{:<6} {:<28} {:<10} {:<6} {:<12} {:<10} {}",
        "ID", "标题", "类别", "年份", "地区", "评分", "标签"
    );

    for item in items {
        let year = item.year.map(|y| y.to_string()).unwrap_or_default();
        let rating = match (&item.rating_source, item.rating_value) {
            (Some(source), Some(value)) => format!("{} {:.1}", source, value),
            (None, Some(value)) => format!("{:.1}", value),
            _ => String::new(),
        };
        println!(
            "{:<6} {:<28} {:<10} {:<6} {:<12} {:<10} {}",
            item.id,
            truncate(&item.title, 26),
            item.kind.as_deref().unwrap_or(""),
            year,
            truncate(item.country.as_deref().unwrap_or(""), 10),
            rating,
            item.tags_text.as_deref().unwrap_or("")
        );
    }
}

/// Prints the download links of one item
pub fn print_download_links(title: &str, links: &[DownloadLinkRecord]) {
    println!("\n{} 的下载链接 ({}):", title, links.len());
    for link in links {
        println!("{}", format_link(link));
    }
}

/// Formats a download link as `- [kind] label EPn: url`
pub fn format_link(link: &DownloadLinkRecord) -> String {
    let mut line = format!("- [{}]", link.kind.as_deref().unwrap_or("?"));
    if let Some(label) = &link.label {
        line.push(' ');
        line.push_str(label);
    }
    if let Some(episode) = link.episode {
        line.push_str(&format!(" EP{}", episode));
    }
    line.push_str(": ");
    line.push_str(&link.url);
    line
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

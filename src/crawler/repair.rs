//! Re-extraction of stored items
//!
//! Runs the current extraction over the HTML kept with each item and upserts
//! the result. Items whose stored HTML is missing or garbled are fetched again.

use crate::crawler::decode::{looks_garbled, redecode_garbled};
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::extract::extract_detail;
use crate::storage::{RawItem, Storage};
use crate::url::parse_http_url;
use crate::DyttError;
use tracing::{debug, info, warn};

/// Counters of one repair run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Items re-extracted and upserted
    pub repaired: usize,
    /// Items whose HTML had to be fetched again
    pub refetched: usize,
    /// Items left unchanged after a fetch or extraction failure
    pub failed: usize,
}

/// Re-extracts stored items
///
/// # Arguments
///
/// * `storage` - The catalogue store
/// * `fetcher` - Used only for items without usable stored HTML
/// * `kind` - Restricts the run to one kind (`movie` covers every movie bucket)
/// * `limit` - Maximum number of items visited, None for all
///
/// # Returns
///
/// * `Ok(RepairSummary)` - The run completed
/// * `Err(DyttError)` - A storage operation failed
pub async fn repair(
    storage: &mut dyn Storage,
    fetcher: &Fetcher,
    kind: Option<&str>,
    limit: Option<usize>,
) -> Result<RepairSummary, DyttError> {
    let raws = storage.list_raw_items(kind, limit)?;
    info!("Repairing {} stored items", raws.len());

    let mut summary = RepairSummary::default();
    for (index, raw) in raws.into_iter().enumerate() {
        let html = match usable_html(&raw) {
            Some(html) => html,
            None => match refetch(fetcher, &raw.detail_url).await {
                Some(html) => {
                    summary.refetched += 1;
                    html
                }
                None => {
                    summary.failed += 1;
                    continue;
                }
            },
        };

        match extract_detail(&html, &raw.detail_url) {
            Ok(item) => {
                storage.upsert_item(&item)?;
                summary.repaired += 1;
                debug!("Repaired #{} {}", raw.id, item.title);
            }
            Err(e) => {
                summary.failed += 1;
                warn!("Cannot repair #{} {}: {}", raw.id, raw.detail_url, e);
            }
        }

        if (index + 1) % 10 == 0 {
            info!("Progress: {} repaired, {} failed", summary.repaired, summary.failed);
        }
    }

    info!(
        "Repair finished: {} repaired, {} refetched, {} failed",
        summary.repaired, summary.refetched, summary.failed
    );
    Ok(summary)
}

/// Stored HTML worth re-extracting
fn usable_html(raw: &RawItem) -> Option<String> {
    raw.raw_html
        .as_ref()
        .filter(|html| !html.trim().is_empty() && !looks_garbled(html))
        .cloned()
}

async fn refetch(fetcher: &Fetcher, detail_url: &str) -> Option<String> {
    let url = match parse_http_url(detail_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot refetch {}: {}", detail_url, e);
            return None;
        }
    };

    let result = fetcher.fetch(&url).await;
    fetcher.pause().await;

    match result {
        FetchResult::Success(page) => {
            if !looks_garbled(page.text()) {
                return Some(page.text().to_string());
            }
            match redecode_garbled(&page.body) {
                Some(fixed) => {
                    warn!("{}: garbled text re-decoded as {}", detail_url, fixed.encoding);
                    Some(fixed.text)
                }
                None => Some(page.text().to_string()),
            }
        }
        failure => {
            warn!("Cannot refetch {}: {}", detail_url, failure.describe());
            None
        }
    }
}

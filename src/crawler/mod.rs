//! Crawler module for catalogue fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Mirror resolution and HTTP fetching with retry logic
//! - Encoding recovery for legacy Chinese pages
//! - Link classification into detail and list candidates
//! - The session-backed frontier
//! - Overall crawl coordination and progress events
//! - Re-extraction of stored items

mod classifier;
mod coordinator;
mod decode;
mod events;
mod fetcher;
mod frontier;
mod repair;

pub use classifier::{classify, is_detail_url, is_page_url, LinkClassification};
pub use coordinator::{Coordinator, CrawlSummary, StopHandle};
pub use decode::{decode, looks_garbled, redecode_garbled, DecodedText};
pub use events::{CrawlEvent, EventKind, EventSink, NullSink};
pub use fetcher::{build_http_client, FetchResult, FetchedPage, Fetcher, ResolvedSite};
pub use frontier::Frontier;
pub use repair::{repair, RepairSummary};

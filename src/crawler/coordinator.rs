//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Resolving the mirror and opening the session frontier
//! - Fetching, re-decoding garbled text and classifying links
//! - Extracting and upserting detail pages
//! - Honouring page/item ceilings and the cooperative stop flag
//! - Emitting progress events

use crate::config::Config;
use crate::crawler::classifier::{classify, is_detail_url};
use crate::crawler::decode::{looks_garbled, redecode_garbled};
use crate::crawler::events::{CrawlEvent, EventKind, EventSink};
use crate::crawler::fetcher::{FetchResult, FetchedPage, Fetcher, ResolvedSite};
use crate::crawler::frontier::Frontier;
use crate::extract::{extract_detail, ExtractError};
use crate::storage::{SessionHandle, SqliteStorage, Storage, VisitKind};
use crate::url::parse_http_url;
use crate::DyttError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Cooperative stop flag, polled between fetches
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the crawl to stop after the in-flight fetch
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters of one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// List/navigation pages fetched (successfully or not)
    pub pages: usize,
    /// Detail records saved
    pub items: usize,
    /// Detail URLs that turned out not to be detail pages
    pub not_detail: usize,
    /// URLs abandoned after fetch or extraction failures
    pub errors: usize,
}

impl CrawlSummary {
    fn add(&mut self, other: &CrawlSummary) {
        self.pages += other.pages;
        self.items += other.items;
        self.not_detail += other.not_detail;
        self.errors += other.errors;
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    storage: SqliteStorage,
    fetcher: Fetcher,
    sink: Box<dyn EventSink>,
    stop: StopHandle,
    section: Option<String>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - The opened store
    /// * `sink` - Receiver of progress events
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(DyttError)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        storage: SqliteStorage,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, DyttError> {
        let fetcher = Fetcher::new(&config.fetch)?;
        Ok(Self {
            config,
            storage,
            fetcher,
            sink,
            stop: StopHandle::new(),
            section: None,
        })
    }

    /// Handle that stops the crawl from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn into_storage(self) -> SqliteStorage {
        self.storage
    }

    /// Picks the mirror to crawl
    ///
    /// Probes the configured mirrors; when none answers, the configured
    /// default base URL is used.
    pub async fn resolve_site(&self) -> Result<ResolvedSite, DyttError> {
        let site = &self.config.site;
        if let Some(resolved) = self
            .fetcher
            .resolve_base(&site.mirrors, &site.alternate_hosts)
            .await
        {
            return Ok(resolved);
        }

        warn!(
            "No mirror answered out of {} candidates, using {}",
            site.mirrors.len(),
            site.base_url
        );
        ResolvedSite::from_base(&site.base_url, &site.alternate_hosts)
    }

    /// Runs the main crawl loop from one start URL
    ///
    /// When `start_url` is given its origin becomes the crawled site and no
    /// mirror is probed; otherwise the mirrors are probed and the crawl starts
    /// at the resolved base URL.
    pub async fn run(&mut self, start_url: Option<&str>) -> Result<CrawlSummary, DyttError> {
        let (site, start) = match start_url {
            Some(start) => {
                let start = parse_http_url(start)?;
                let site = ResolvedSite::new(start.join("/")?, &self.config.site.alternate_hosts);
                (site, start)
            }
            None => {
                let site = self.resolve_site().await?;
                let start = site.base_url.clone();
                (site, start)
            }
        };

        let session_id = self.config.crawl.session_id.clone();
        self.crawl(&site, start, session_id).await
    }

    /// Walks every configured catalogue section in turn
    ///
    /// Each section gets its own ceilings and, for persistent crawls, its own
    /// session `<session-id>/<section name>` so sections resume independently.
    pub async fn run_sections(&mut self) -> Result<CrawlSummary, DyttError> {
        let site = self.resolve_site().await?;
        let sections = self.config.crawl.sections.clone();
        let base_session = self.config.crawl.session_id.clone();
        let mut total = CrawlSummary::default();

        for section in &sections {
            if self.stop.is_stopped() {
                break;
            }

            let start = site.base_url.join(&section.path)?;
            let session_id = base_session
                .as_ref()
                .map(|id| format!("{}/{}", id, section.name));
            let session = self.storage.ensure_session(session_id.as_deref())?;

            info!("Crawling section {} from {}", section.name, start);
            self.section = Some(section.name.clone());
            self.emit(
                &session,
                CrawlEvent::new(EventKind::CategoryStart).with_url(start.as_str()),
            )?;

            let summary = self.crawl(&site, start, session_id).await?;

            self.emit(
                &session,
                CrawlEvent::new(EventKind::CategoryDone).with_count(summary.items as u64),
            )?;
            total.add(&summary);
        }

        self.section = None;
        Ok(total)
    }

    async fn crawl(
        &mut self,
        site: &ResolvedSite,
        start: Url,
        session_id: Option<String>,
    ) -> Result<CrawlSummary, DyttError> {
        let session = self.storage.ensure_session(session_id.as_deref())?;
        let mut frontier = Frontier::open(
            &self.storage,
            session.clone(),
            self.config.crawl.resume_batch_limit,
        )?;
        self.fetcher.set_site(site);

        let max_pages = self.config.crawl.max_pages;
        let max_items = self.config.crawl.max_items;
        let probe = max_items == 0;

        info!(
            "Starting crawl of {} at {} (pages <= {}, items <= {})",
            site.base_url, start, max_pages, max_items
        );
        self.emit(
            &session,
            CrawlEvent::new(EventKind::SiteStart).with_url(site.base_url.as_str()),
        )?;
        frontier.push(&mut self.storage, &[start.to_string()])?;

        let mut summary = CrawlSummary::default();
        let started = Instant::now();
        let mut fetched = 0usize;

        loop {
            if self.stop.is_stopped() {
                info!("Stop requested, leaving {} URLs queued", frontier.len());
                break;
            }

            if !probe && summary.items >= max_items {
                info!("Item ceiling reached, leaving {} URLs queued", frontier.len());
                break;
            }
            let pages_full = summary.pages >= max_pages;
            if probe && pages_full {
                info!("Page ceiling reached");
                break;
            }

            let url = match frontier.pop() {
                Some(url) => url,
                None => {
                    info!("Frontier is empty, crawl complete");
                    break;
                }
            };

            let parsed = match Url::parse(&url) {
                Ok(parsed) => parsed,
                Err(e) => {
                    summary.errors += 1;
                    self.emit(
                        &session,
                        CrawlEvent::new(EventKind::Error)
                            .with_url(url.as_str())
                            .with_message(e.to_string()),
                    )?;
                    frontier.complete(&mut self.storage, &url, VisitKind::Page)?;
                    continue;
                }
            };

            if is_detail_url(&parsed) {
                if probe {
                    continue;
                }
                self.process_detail(&mut frontier, &parsed, &mut summary)
                    .await?;
            } else {
                if pages_full {
                    continue;
                }
                self.process_page(&mut frontier, site, &parsed, probe, &mut summary)
                    .await?;
            }

            fetched += 1;
            if fetched % 10 == 0 {
                let rate = fetched as f64 / started.elapsed().as_secs_f64().max(0.001);
                info!(
                    "Progress: {} pages, {} items, {} in frontier, {:.2} fetches/sec",
                    summary.pages,
                    summary.items,
                    frontier.len(),
                    rate
                );
            }

            self.fetcher.pause().await;
        }

        self.emit(
            &session,
            CrawlEvent::new(EventKind::SiteDone)
                .with_url(site.base_url.as_str())
                .with_count(summary.items as u64),
        )?;

        info!(
            "Crawl finished: {} pages, {} items, {} errors in {:?}",
            summary.pages,
            summary.items,
            summary.errors,
            started.elapsed()
        );
        Ok(summary)
    }

    /// Fetches a list page and queues its links
    async fn process_page(
        &mut self,
        frontier: &mut Frontier,
        site: &ResolvedSite,
        url: &Url,
        probe: bool,
        summary: &mut CrawlSummary,
    ) -> Result<(), DyttError> {
        let session = frontier.session().clone();
        summary.pages += 1;

        match self.fetcher.fetch(url).await {
            FetchResult::Success(page) => {
                let text = self.page_text(&session, &page)?;
                let links = classify(&text, &page.final_url, site);

                let mut targets = links.queue_order();
                if probe {
                    targets.retain(|target| {
                        Url::parse(target)
                            .map(|u| !is_detail_url(&u))
                            .unwrap_or(true)
                    });
                }

                let queued = frontier.push(&mut self.storage, &targets)?;
                debug!(
                    "Page {}: {} links, {} queued",
                    url,
                    links.found(),
                    queued
                );
                self.emit(
                    &session,
                    CrawlEvent::new(EventKind::Page)
                        .with_url(url.as_str())
                        .with_found(links.found())
                        .with_queued(queued),
                )?;
            }
            failure => {
                summary.errors += 1;
                self.emit(
                    &session,
                    CrawlEvent::new(EventKind::Error)
                        .with_url(url.as_str())
                        .with_message(failure.describe()),
                )?;
            }
        }

        frontier.complete(&mut self.storage, url.as_str(), VisitKind::Page)?;
        Ok(())
    }

    /// Fetches a detail page, extracts it and upserts the item
    async fn process_detail(
        &mut self,
        frontier: &mut Frontier,
        url: &Url,
        summary: &mut CrawlSummary,
    ) -> Result<(), DyttError> {
        let session = frontier.session().clone();

        match self.fetcher.fetch(url).await {
            FetchResult::Success(page) => {
                let text = self.page_text(&session, &page)?;
                match extract_detail(&text, url.as_str()) {
                    Ok(item) => {
                        self.storage.upsert_item(&item)?;
                        summary.items += 1;
                        debug!("Saved {} ({})", item.title, url);

                        self.emit(
                            &session,
                            CrawlEvent::new(EventKind::Item)
                                .with_detail_url(url.as_str())
                                .with_title(item.title.as_str())
                                .with_year(item.year)
                                .with_kind(item.kind.to_db_string()),
                        )?;
                        self.emit(
                            &session,
                            CrawlEvent::new(EventKind::DetailSaved).with_detail_url(url.as_str()),
                        )?;
                    }
                    Err(ExtractError::NotDetail(_)) => {
                        summary.not_detail += 1;
                        self.emit(
                            &session,
                            CrawlEvent::new(EventKind::NotDetail).with_detail_url(url.as_str()),
                        )?;
                    }
                    Err(e) => {
                        summary.errors += 1;
                        self.emit(
                            &session,
                            CrawlEvent::new(EventKind::Error)
                                .with_detail_url(url.as_str())
                                .with_message(e.to_string()),
                        )?;
                    }
                }
            }
            failure => {
                summary.errors += 1;
                self.emit(
                    &session,
                    CrawlEvent::new(EventKind::Error)
                        .with_detail_url(url.as_str())
                        .with_message(failure.describe()),
                )?;
            }
        }

        frontier.complete(&mut self.storage, url.as_str(), VisitKind::Detail)?;
        Ok(())
    }

    /// Returns the page text, re-decoding it when it looks garbled
    fn page_text(
        &mut self,
        session: &SessionHandle,
        page: &FetchedPage,
    ) -> Result<String, DyttError> {
        if !looks_garbled(page.text()) {
            return Ok(page.text().to_string());
        }

        let (text, message) = match redecode_garbled(&page.body) {
            Some(fixed) => {
                let message = format!("garbled text re-decoded as {}", fixed.encoding);
                (fixed.text, message)
            }
            None => (
                page.text().to_string(),
                format!("garbled text kept as {}", page.decoded.encoding),
            ),
        };

        warn!("{}: {}", page.url, message);
        self.emit(
            session,
            CrawlEvent::new(EventKind::Warn)
                .with_url(page.url.as_str())
                .with_message(message),
        )?;
        Ok(text)
    }

    /// Sends an event to the sink and, for persistent sessions, the event log
    fn emit(&mut self, session: &SessionHandle, mut event: CrawlEvent) -> Result<(), DyttError> {
        if event.section.is_none() {
            event.section = self.section.clone();
        }
        self.sink.emit(&event);
        self.storage.append_event(session, &event)?;
        Ok(())
    }
}

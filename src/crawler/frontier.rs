//! The crawl frontier
//!
//! An in-memory FIFO mirrored into the session tables. Opening a frontier for
//! a persistent session reloads the queued-but-undone URLs and both visited
//! sets, so an interrupted crawl picks up where it stopped.

use crate::crawler::classifier::is_detail_url;
use crate::storage::{SessionHandle, Storage, StorageResult, VisitKind};
use std::collections::{HashSet, VecDeque};
use tracing::info;
use url::Url;

/// Queue of URLs still to be processed in one session
#[derive(Debug)]
pub struct Frontier {
    session: SessionHandle,
    queue: VecDeque<String>,
    queued: HashSet<String>,
    visited_pages: HashSet<String>,
    visited_details: HashSet<String>,
}

impl Frontier {
    /// Opens the frontier of a session
    ///
    /// # Arguments
    ///
    /// * `storage` - The store holding the session tables
    /// * `session` - The session handle; ephemeral sessions start empty
    /// * `resume_limit` - Maximum number of queued URLs reloaded
    pub fn open(
        storage: &dyn Storage,
        session: SessionHandle,
        resume_limit: usize,
    ) -> StorageResult<Self> {
        let pending = storage.dequeue_batch(&session, resume_limit)?;
        let visited_pages = storage.load_visited(&session, VisitKind::Page)?;
        let visited_details = storage.load_visited(&session, VisitKind::Detail)?;

        if session.is_persistent() {
            info!(
                "Resuming session {}: {} queued, {} pages and {} details visited",
                session.id().unwrap_or_default(),
                pending.len(),
                visited_pages.len(),
                visited_details.len()
            );
        }

        let queued = pending.iter().cloned().collect();
        Ok(Self {
            session,
            queue: pending.into(),
            queued,
            visited_pages,
            visited_details,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Adds URLs to the back of the queue
    ///
    /// URLs already queued, or visited in this session as their own kind, are ignored.
    ///
    /// # Returns
    ///
    /// The number of URLs that were actually queued
    pub fn push(&mut self, storage: &mut dyn Storage, urls: &[String]) -> StorageResult<usize> {
        let mut fresh = Vec::new();
        for url in urls {
            if self.is_visited(url, visit_kind(url)) || !self.queued.insert(url.clone()) {
                continue;
            }
            fresh.push(url.clone());
        }

        if fresh.is_empty() {
            return Ok(0);
        }

        storage.enqueue(&self.session, &fresh)?;
        let count = fresh.len();
        self.queue.extend(fresh);
        Ok(count)
    }

    /// Takes the next unvisited URL off the front of the queue
    pub fn pop(&mut self) -> Option<String> {
        while let Some(url) = self.queue.pop_front() {
            if !self.is_visited(&url, visit_kind(&url)) {
                return Some(url);
            }
        }
        None
    }

    /// Records that a URL has been processed, whatever the outcome
    ///
    /// The URL joins the visited set of `kind` and its queue entry is marked done.
    pub fn complete(
        &mut self,
        storage: &mut dyn Storage,
        url: &str,
        kind: VisitKind,
    ) -> StorageResult<()> {
        storage.mark_visited(&self.session, url, kind)?;
        storage.mark_done(&self.session, url)?;
        match kind {
            VisitKind::Page => self.visited_pages.insert(url.to_string()),
            VisitKind::Detail => self.visited_details.insert(url.to_string()),
        };
        Ok(())
    }

    pub fn is_visited(&self, url: &str, kind: VisitKind) -> bool {
        match kind {
            VisitKind::Page => self.visited_pages.contains(url),
            VisitKind::Detail => self.visited_details.contains(url),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// The visited set a URL belongs to
pub fn visit_kind(url: &str) -> VisitKind {
    match Url::parse(url) {
        Ok(parsed) if is_detail_url(&parsed) => VisitKind::Detail,
        _ => VisitKind::Page,
    }
}

//! URL handling module for dytt-index
//!
//! This module provides link resolution, the https→http fallback rewrite, and
//! the host allow-list that keeps the crawl on the resolved mirror and its
//! configured alternates.

mod matcher;
mod normalize;

// Re-export main functions
pub use matcher::{matches_host, strip_www};
pub use normalize::{insecure_variant, parse_http_url, resolve_link};

use url::Url;

/// Hosts whose links the crawler is allowed to follow
///
/// Built once from the resolved mirror plus the configured alternate host
/// patterns, then threaded through classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowList {
    patterns: Vec<String>,
}

impl HostAllowList {
    /// Creates an allow-list from the base URL's host and extra patterns
    ///
    /// # Examples
    ///
    /// ```
    /// use dytt_index::url::HostAllowList;
    /// use url::Url;
    ///
    /// let base = Url::parse("http://www.dydytt.net/").unwrap();
    /// let allow = HostAllowList::new(&base, &["*.ygdy8.net".to_string()]);
    /// assert!(allow.allows(&Url::parse("http://dydytt.net/html/tv/").unwrap()));
    /// assert!(allow.allows(&Url::parse("https://m.ygdy8.net/").unwrap()));
    /// assert!(!allow.allows(&Url::parse("http://ads.example.com/").unwrap()));
    /// ```
    pub fn new(base_url: &Url, alternates: &[String]) -> Self {
        let mut patterns = Vec::with_capacity(alternates.len() + 1);
        if let Some(host) = base_url.host_str() {
            patterns.push(host.to_ascii_lowercase());
        }
        for alt in alternates {
            let alt = alt.trim().to_ascii_lowercase();
            if !alt.is_empty() && !patterns.contains(&alt) {
                patterns.push(alt);
            }
        }
        Self { patterns }
    }

    /// Returns true if the URL's host is on the list
    pub fn allows(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.patterns.iter().any(|p| matches_host(p, host)),
            None => false,
        }
    }

    /// The patterns making up the list, base host first
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

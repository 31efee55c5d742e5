//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with a randomly chosen user agent
//! - Mirror resolution (first candidate answering with a non-empty 2xx wins)
//! - GET with timeout, bounded retries and a single https→http fallback
//! - The randomised politeness pause between requests

use crate::config::FetchConfig;
use crate::crawler::decode::{decode, DecodedText};
use crate::url::{insecure_variant, parse_http_url, HostAllowList};
use crate::DyttError;
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, REFERER,
};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Fallback user agent when the configured list is empty
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0 Safari/537.36";

/// The mirror a crawl runs against
///
/// Produced once (by [`Fetcher::resolve_base`] or from the configured default)
/// and passed to every fetch and classification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSite {
    pub base_url: Url,
    pub allow: HostAllowList,
}

impl ResolvedSite {
    pub fn new(base_url: Url, alternates: &[String]) -> Self {
        let allow = HostAllowList::new(&base_url, alternates);
        Self { base_url, allow }
    }

    /// Builds a site from a configured base URL string
    pub fn from_base(base_url: &str, alternates: &[String]) -> Result<Self, DyttError> {
        Ok(Self::new(parse_http_url(base_url)?, alternates))
    }
}

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested (after any scheme fallback)
    pub url: Url,
    /// URL after redirects
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Raw body, kept for re-decoding
    pub body: Vec<u8>,
    pub decoded: DecodedText,
}

impl FetchedPage {
    pub fn text(&self) -> &str {
        &self.decoded.text
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success(FetchedPage),

    /// Server answered with a non-success status or an empty body
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, TLS failure, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Short description of a failure, for events and logs
    pub fn describe(&self) -> String {
        match self {
            Self::Success(page) => format!("HTTP {}", page.status_code),
            Self::HttpError { status_code } => format!("HTTP {}", status_code),
            Self::NetworkError { error } => error.clone(),
        }
    }
}

/// Builds an HTTP client with browser-like defaults
///
/// One user agent is picked at random from `config.user_agents` for the
/// lifetime of the client.
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let agents: Vec<&str> = config
        .user_agents
        .iter()
        .map(|ua| ua.trim())
        .filter(|ua| !ua.is_empty())
        .collect();
    let user_agent = {
        let mut rng = rand::rng();
        agents.choose(&mut rng).copied().unwrap_or(DEFAULT_USER_AGENT).to_string()
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches documents from the catalogue mirrors
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    probe_timeout: Duration,
    retry: u32,
    sleep_min_ms: u64,
    sleep_max_ms: u64,
    referer: Option<String>,
}

impl Fetcher {
    /// Creates a fetcher from the fetch configuration
    pub fn new(config: &FetchConfig) -> Result<Self, DyttError> {
        Ok(Self {
            client: build_http_client(config)?,
            timeout: Duration::from_secs(config.timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            retry: config.retry,
            sleep_min_ms: config.sleep_min_ms,
            sleep_max_ms: config.sleep_max_ms.max(config.sleep_min_ms),
            referer: None,
        })
    }

    /// Sends the resolved base URL as `Referer` on every later request
    pub fn set_site(&mut self, site: &ResolvedSite) {
        self.referer = Some(site.base_url.to_string());
    }

    /// Probes mirror candidates in priority order
    ///
    /// Each candidate gets a single request with the probe timeout and no
    /// scheme fallback. The first one answering 2xx with a non-empty body wins.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Mirror base URLs, highest priority first
    /// * `alternates` - Extra host patterns for the resulting allow-list
    ///
    /// # Returns
    ///
    /// The resolved site, or None when no candidate answered
    pub async fn resolve_base(
        &self,
        candidates: &[String],
        alternates: &[String],
    ) -> Option<ResolvedSite> {
        for candidate in candidates {
            let url = match parse_http_url(candidate) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping mirror {}: {}", candidate, e);
                    continue;
                }
            };

            match self.attempt(&url, self.probe_timeout).await {
                FetchResult::Success(_) => {
                    info!("Using mirror {}", url);
                    return Some(ResolvedSite::new(url, alternates));
                }
                failure => debug!("Mirror {} unavailable: {}", url, failure.describe()),
            }
        }
        None
    }

    /// Fetches a URL with the configured timeout and retry count
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        self.fetch_with(url, self.timeout, self.retry).await
    }

    /// Fetches a URL with explicit timeout and retry count
    ///
    /// Makes up to `retries + 1` attempts with a politeness pause between
    /// them. For https URLs, the first failed attempt is followed by one try
    /// against the http twin; that fallback is made at most once per call.
    ///
    /// # Returns
    ///
    /// A FetchResult; failures carry the last error seen
    pub async fn fetch_with(&self, url: &Url, timeout: Duration, retries: u32) -> FetchResult {
        let mut fallback = insecure_variant(url);
        let mut last = FetchResult::NetworkError {
            error: "no attempt made".to_string(),
        };

        for attempt in 0..=retries {
            if attempt > 0 {
                self.pause().await;
            }

            let result = self.attempt(url, timeout).await;
            if result.is_success() {
                return result;
            }
            debug!(
                "Attempt {}/{} for {} failed: {}",
                attempt + 1,
                retries + 1,
                url,
                result.describe()
            );
            last = result;

            if let Some(alt) = fallback.take() {
                debug!("Falling back to {}", alt);
                let result = self.attempt(&alt, timeout).await;
                if result.is_success() {
                    return result;
                }
                last = result;
            }
        }

        warn!("Giving up on {}: {}", url, last.describe());
        last
    }

    /// Sleeps for a random duration within the configured bounds
    pub async fn pause(&self) {
        let millis = if self.sleep_max_ms == 0 {
            0
        } else {
            let mut rng = rand::rng();
            rng.random_range(self.sleep_min_ms..=self.sleep_max_ms)
        };
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    async fn attempt(&self, url: &Url, timeout: Duration) -> FetchResult {
        let mut request = self.client.get(url.clone()).timeout(timeout);
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return network_error(e),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return network_error(e),
        };

        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let decoded = decode(&body, content_type.as_deref());
        FetchResult::Success(FetchedPage {
            url: url.clone(),
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
            decoded,
        })
    }
}

fn network_error(e: reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}

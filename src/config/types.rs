use serde::Deserialize;

/// Main configuration structure for dytt-index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Target site and its mirrors
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Default base URL, used when no mirror answers
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Mirror candidates, probed in priority order
    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<String>,

    /// Extra hosts whose links are followed (e.g. "*.ygdy8.net")
    #[serde(rename = "alternate-hosts", default = "default_alternate_hosts")]
    pub alternate_hosts: Vec<String>,
}

/// HTTP behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout used while probing mirrors (seconds)
    #[serde(rename = "probe-timeout-secs", default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Lower bound of the politeness pause between requests (milliseconds)
    #[serde(rename = "sleep-min-ms", default = "default_sleep_min_ms")]
    pub sleep_min_ms: u64,

    /// Upper bound of the politeness pause between requests (milliseconds)
    #[serde(rename = "sleep-max-ms", default = "default_sleep_max_ms")]
    pub sleep_max_ms: u64,

    /// User agents; one is picked at random per client
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

/// Crawl loop limits and session
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Ceiling on list/pagination pages fetched per run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Ceiling on detail records saved per run; 0 disables detail fetching
    #[serde(rename = "max-items", default = "default_max_items")]
    pub max_items: usize,

    /// Session identifier enabling resume; absent means an ephemeral crawl
    #[serde(rename = "session-id", default)]
    pub session_id: Option<String>,

    /// How many queued URLs are reloaded when resuming a session
    #[serde(rename = "resume-batch-limit", default = "default_resume_batch_limit")]
    pub resume_batch_limit: usize,

    /// Catalogue sections walked by a section crawl, in order
    #[serde(default = "default_sections")]
    pub sections: Vec<SectionConfig>,
}

/// One catalogue section (a listing entry point)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionConfig {
    pub name: String,
    /// Path relative to the resolved base URL
    pub path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mirrors: default_mirrors(),
            alternate_hosts: default_alternate_hosts(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            retry: default_retry(),
            sleep_min_ms: default_sleep_min_ms(),
            sleep_max_ms: default_sleep_max_ms(),
            user_agents: default_user_agents(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_items: default_max_items(),
            session_id: None,
            resume_batch_limit: default_resume_batch_limit(),
            sections: default_sections(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://www.dydytt.net".to_string()
}

fn default_mirrors() -> Vec<String> {
    [
        "http://www.dydytt.net",
        "https://www.dydytt.net",
        "http://www.ygdy8.net",
        "https://www.ygdy8.net",
        "http://www.ygdy8.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_alternate_hosts() -> Vec<String> {
    ["*.dydytt.net", "*.ygdy8.net", "*.ygdy8.com"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_probe_timeout_secs() -> u64 {
    8
}

fn default_retry() -> u32 {
    2
}

fn default_sleep_min_ms() -> u64 {
    800
}

fn default_sleep_max_ms() -> u64 {
    1800
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.5 Safari/605.1.15",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_pages() -> usize {
    300
}

fn default_max_items() -> usize {
    3000
}

fn default_resume_batch_limit() -> usize {
    10_000
}

fn default_sections() -> Vec<SectionConfig> {
    [
        ("最新电影", "/html/gndy/dyzz/index.html"),
        ("高清电影", "/html/gndy/hd/index.html"),
        ("电影总表", "/html/gndy/index.html"),
        ("国产剧", "/html/tv/gj/index.html"),
        ("美剧", "/html/tv/ous/"),
        ("韩剧", "/html/tv/rihan/"),
        ("日剧", "/html/tv/rjb/"),
        ("综艺", "/html/zongyi/"),
        ("动漫", "/html/dongman/"),
    ]
    .iter()
    .map(|(name, path)| SectionConfig {
        name: name.to_string(),
        path: path.to_string(),
    })
    .collect()
}

fn default_database_path() -> String {
    "data/movies.db".to_string()
}

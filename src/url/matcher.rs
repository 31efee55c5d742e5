/// Checks if a host matches a host pattern
///
/// Two pattern forms are supported:
/// 1. Exact: "ygdy8.net" matches only "ygdy8.net"
/// 2. Wildcard: "*.ygdy8.net" matches the bare host and any subdomain of it
///
/// Both sides are compared case-insensitively and with a leading "www."
/// removed, since the site's mirrors serve identical content with and without it.
///
/// # Examples
///
/// ```
/// use dytt_index::url::matches_host;
///
/// assert!(matches_host("ygdy8.net", "www.ygdy8.net"));
/// assert!(matches_host("*.ygdy8.net", "m.ygdy8.net"));
/// assert!(!matches_host("*.ygdy8.net", "ygdy8.com"));
/// ```
pub fn matches_host(pattern: &str, candidate: &str) -> bool {
    let candidate = strip_www(&candidate.to_ascii_lowercase()).to_string();
    let pattern = pattern.to_ascii_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        let base = strip_www(base);
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == strip_www(&pattern)
    }
}

/// Removes a leading "www." label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

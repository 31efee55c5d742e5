use crate::UrlError;
use url::Url;

/// Schemes that never lead to a crawlable document
const NON_HTTP_PREFIXES: &[&str] = &[
    "javascript:",
    "mailto:",
    "tel:",
    "data:",
    "magnet:",
    "ed2k:",
    "thunder:",
    "qqdl:",
    "flashget:",
    "ftp:",
];

/// Parses an absolute http(s) URL
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Resolves a link found in a document against the document URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel:, data: and download-scheme links
/// - anything that is not HTTP(S) after resolution
///
/// The fragment of the resolved URL is dropped.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if NON_HTTP_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}

/// Returns the plain-http twin of an https URL
///
/// Some mirrors only answer on the insecure scheme; the fetch layer uses this
/// for its single fallback attempt. Returns None for non-https URLs.
pub fn insecure_variant(url: &Url) -> Option<Url> {
    if url.scheme() != "https" {
        return None;
    }
    let mut alt = url.clone();
    alt.set_scheme("http").ok()?;
    // An explicit 443 makes no sense once the scheme changes
    if alt.port() == Some(443) {
        alt.set_port(None).ok()?;
    }
    Some(alt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://www.dydytt.net/html/gndy/dyzz/index.html").unwrap()
    }

    #[test]
    fn test_resolve_absolute_path() {
        let url = resolve_link("/html/gndy/dyzz/20240101/65000.html", &base()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://www.dydytt.net/html/gndy/dyzz/20240101/65000.html"
        );
    }

    #[test]
    fn test_resolve_relative_file() {
        let url = resolve_link("list_23_2.html", &base()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://www.dydytt.net/html/gndy/dyzz/list_23_2.html"
        );
    }

    #[test]
    fn test_fragment_dropped() {
        let url = resolve_link("/html/tv/index.html#top", &base()).unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_excluded_links() {
        for href in [
            "",
            "   ",
            "#",
            "#comments",
            "javascript:void(0)",
            "JavaScript:history.back()",
            "mailto:admin@dydytt.net",
            "magnet:?xt=urn:btih:abcdef",
            "thunder://QUFodHRwOi8vZXhhbXBsZQ==",
            "ftp://a:b@dy.example.com/file.mkv",
        ] {
            assert!(resolve_link(href, &base()).is_none(), "{href:?} should be dropped");
        }
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://www.ygdy8.net/").is_ok());
        assert!(matches!(
            parse_http_url("ftp://www.ygdy8.net/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(parse_http_url("not a url"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_insecure_variant() {
        let url = Url::parse("https://www.dydytt.net/html/tv/index.html?p=2").unwrap();
        assert_eq!(
            insecure_variant(&url).unwrap().as_str(),
            "http://www.dydytt.net/html/tv/index.html?p=2"
        );

        let with_port = Url::parse("https://127.0.0.1:8443/a").unwrap();
        assert_eq!(
            insecure_variant(&with_port).unwrap().as_str(),
            "http://127.0.0.1:8443/a"
        );

        let plain = Url::parse("http://www.dydytt.net/").unwrap();
        assert!(insecure_variant(&plain).is_none());
    }
}

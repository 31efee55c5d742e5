//! Title and alias reconciliation

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Placeholder title when a page offers nothing better
pub const UNTITLED: &str = "未命名";

/// Canonical title, original title and every distinct name of an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Titles {
    pub title: String,
    pub original_title: Option<String>,
    pub alt_titles: Vec<String>,
}

/// Returns true when the text contains Han characters
pub fn has_han(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
    })
}

/// Splits declared names on slashes into distinct candidates, in order
pub fn candidates(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .flat_map(|name| name.split(|c: char| c == '/' || c == '／'))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

/// Picks the canonical title among the declared names
///
/// The first Han-script candidate wins, then the first candidate of any
/// script, then the `<h1>` text, then the `《…》` part of the `<title>` tag
/// (or the whole tag), then [`UNTITLED`].
pub fn reconcile(names: &[String], h1: Option<&str>, title_tag: Option<&str>) -> Titles {
    let alt_titles = candidates(names);

    let title = alt_titles
        .iter()
        .find(|name| has_han(name))
        .or_else(|| alt_titles.first())
        .cloned()
        .or_else(|| non_empty(h1))
        .or_else(|| title_tag.and_then(title_from_tag))
        .unwrap_or_else(|| UNTITLED.to_string());

    let original_title = alt_titles
        .iter()
        .find(|name| !has_han(name) && **name != title)
        .cloned();

    Titles {
        title,
        original_title,
        alt_titles,
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    let text = text?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn title_from_tag(tag: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"《([^》]+)》").expect("Invalid regex"));
    match re.captures(tag) {
        Some(c) => non_empty(Some(&c[1])),
        None => non_empty(Some(tag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_han_candidate_wins() {
        let titles = reconcile(&names(&["The Wandering Earth", "流浪地球"]), None, None);
        assert_eq!(titles.title, "流浪地球");
        assert_eq!(titles.original_title.as_deref(), Some("The Wandering Earth"));
        assert_eq!(titles.alt_titles, names(&["The Wandering Earth", "流浪地球"]));
    }

    #[test]
    fn test_slashes_split_candidates() {
        let titles = reconcile(
            &names(&["奥本海默 / 奥本海默传", "Oppenheimer／奥本海默"]),
            None,
            None,
        );
        assert_eq!(titles.title, "奥本海默");
        assert_eq!(titles.original_title.as_deref(), Some("Oppenheimer"));
        assert_eq!(titles.alt_titles, names(&["奥本海默", "奥本海默传", "Oppenheimer"]));
    }

    #[test]
    fn test_non_han_only() {
        let titles = reconcile(&names(&["Dune: Part Two"]), None, None);
        assert_eq!(titles.title, "Dune: Part Two");
        assert_eq!(titles.original_title, None);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(reconcile(&[], Some(" 沙丘2 "), None).title, "沙丘2");
        assert_eq!(
            reconcile(&[], None, Some("2024年科幻《沙丘2》BD中英双字_电影天堂")).title,
            "沙丘2"
        );
        assert_eq!(reconcile(&[], Some(""), Some("电影天堂")).title, "电影天堂");
        assert_eq!(reconcile(&[], None, None).title, UNTITLED);
    }

    #[test]
    fn test_has_han() {
        assert!(has_han("流浪地球2"));
        assert!(!has_han("Ça commence"));
        assert!(!has_han("ドラマ"));
    }
}

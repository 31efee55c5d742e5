//! Labeled field scanning
//!
//! Detail pages list their metadata as `◎片　　名　流浪地球` style lines. Each
//! line is tried against an ordered table of label patterns; the first match
//! wins. Actors and description may continue over following unlabeled lines.

use regex::Regex;
use std::sync::OnceLock;

/// Lines containing any of these start the download section
const DOWNLOAD_MARKERS: &[&str] = &["下载地址", "磁力链", "迅雷下载", "点击下载", "magnet:", "ftp://"];

/// A labeled field of a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Alias,
    Title,
    Year,
    Country,
    Language,
    Genre,
    Director,
    Actors,
    DoubanRating,
    ImdbRating,
    Description,
    ReleaseDate,
}

impl Field {
    fn labels(&self) -> &'static [&'static str] {
        match self {
            Self::Alias => &["译名", "又名"],
            Self::Title => &["片名", "剧名"],
            Self::Year => &["年代", "年份"],
            Self::Country => &["国家", "产地", "地区"],
            Self::Language => &["语言"],
            Self::Genre => &["类别", "类型"],
            Self::Director => &["导演"],
            Self::Actors => &["主演", "演员"],
            Self::DoubanRating => &["豆瓣评分"],
            Self::ImdbRating => &["IMDb评分"],
            Self::Description => &["简介", "剧情介绍", "内容简介", "剧情简介"],
            Self::ReleaseDate => &["上映日期", "首播"],
        }
    }

    fn is_multiline(&self) -> bool {
        matches!(self, Self::Actors | Self::Description)
    }
}

/// Scan order; the first pattern matching a line wins
const FIELD_ORDER: [Field; 12] = [
    Field::Alias,
    Field::Title,
    Field::Year,
    Field::Country,
    Field::Language,
    Field::Genre,
    Field::Director,
    Field::Actors,
    Field::DoubanRating,
    Field::ImdbRating,
    Field::Description,
    Field::ReleaseDate,
];

/// Raw values collected from the labeled lines of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledFields {
    /// Title and alias values in document order
    pub names: Vec<String>,
    pub year: Option<i32>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub actors: Vec<String>,
    pub douban_rating: Option<f64>,
    pub douban_votes: Option<u32>,
    pub imdb_rating: Option<f64>,
    pub imdb_votes: Option<u32>,
    pub description: Vec<String>,
    pub release_date: Option<String>,
    /// Number of lines that matched a label
    pub matched: usize,
}

/// Scans content lines for labeled fields
pub fn scan(lines: &[String]) -> LabeledFields {
    let mut fields = LabeledFields::default();
    let mut open: Option<Field> = None;

    for line in lines {
        if let Some((field, value)) = match_label(line) {
            fields.matched += 1;
            open = field.is_multiline().then_some(field);
            fields.apply(field, value.trim());
            continue;
        }

        if line.starts_with('◎') || line.starts_with('【') || is_download_marker(line) {
            open = None;
            continue;
        }

        match open {
            Some(Field::Actors) => fields.actors.push(line.trim().to_string()),
            Some(Field::Description) => fields.description.push(line.trim().to_string()),
            _ => {}
        }
    }

    fields
}

impl LabeledFields {
    fn apply(&mut self, field: Field, value: &str) {
        match field {
            Field::Alias | Field::Title => {
                if !value.is_empty() {
                    self.names.push(value.to_string());
                }
            }
            Field::Year => {
                if self.year.is_none() {
                    self.year = find_year(value);
                }
            }
            Field::Country => set_once(&mut self.country, value),
            Field::Language => set_once(&mut self.language, value),
            Field::Genre => self.genres.extend(split_genres(value)),
            Field::Director => set_once(&mut self.director, value),
            Field::Actors => {
                if !value.is_empty() {
                    self.actors.push(value.to_string());
                }
            }
            Field::DoubanRating => {
                if self.douban_rating.is_none() {
                    self.douban_rating = parse_rating(value);
                    self.douban_votes = self.douban_rating.and(parse_votes(value));
                }
            }
            Field::ImdbRating => {
                if self.imdb_rating.is_none() {
                    self.imdb_rating = parse_rating(value);
                    self.imdb_votes = self.imdb_rating.and(parse_votes(value));
                }
            }
            Field::Description => {
                if !value.is_empty() {
                    self.description.push(value.to_string());
                }
            }
            Field::ReleaseDate => set_once(&mut self.release_date, value),
        }
    }
}

fn set_once(slot: &mut Option<String>, value: &str) {
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value.to_string());
    }
}

/// Matches a line against the label table
pub fn match_label(line: &str) -> Option<(Field, &str)> {
    static PATTERNS: OnceLock<Vec<(Field, Regex)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        FIELD_ORDER
            .iter()
            .map(|field| (*field, label_regex(field.labels())))
            .collect()
    });

    patterns.iter().find_map(|(field, re)| {
        re.captures(line)
            .and_then(|c| c.get(1))
            .map(|m| (*field, m.as_str()))
    })
}

/// Builds `^[◎【] label [】:：] (value)$`, allowing spaces between label characters
fn label_regex(labels: &[&str]) -> Regex {
    let alternatives = labels
        .iter()
        .map(|label| {
            label
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect::<Vec<_>>()
                .join(r"\s*")
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)^[◎【]\s*(?:{})\s*】?\s*[:：]?\s*(.*)$", alternatives))
        .expect("Invalid regex")
}

fn is_download_marker(line: &str) -> bool {
    let lowered = line.to_lowercase();
    DOWNLOAD_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Returns the first plausible `19xx`/`20xx` year token
///
/// Tokens inside longer numbers or followed by `x`, `×` or `p` are
/// resolutions, not years.
pub fn find_year(text: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?:19|20)\d{2}").expect("Invalid regex"));
    re.find_iter(text)
        .find(|m| {
            let prev = text[..m.start()].chars().next_back();
            let next = text[m.end()..].chars().next();
            !prev.is_some_and(|c| c.is_ascii_digit())
                && !next.is_some_and(|c| {
                    c.is_ascii_digit() || matches!(c, 'x' | 'X' | '×' | 'p' | 'P')
                })
        })
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses the leading number of a rating value, keeping it only inside 0..=10
pub fn parse_rating(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("Invalid regex"));
    let value: f64 = re.captures(text)?[1].parse().ok()?;
    (0.0..=10.0).contains(&value).then_some(value)
}

/// Parses the vote count of a rating value
pub fn parse_votes(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)from\s+([\d,]+)\s*users|([\d,]+)\s*人(?:评价)?").expect("Invalid regex")
    });
    let caps = re.captures(text)?;
    let digits = caps.get(1).or_else(|| caps.get(2))?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Splits a genre value into tags
pub fn split_genres(value: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[、,，/／|｜\s]+").expect("Invalid regex"));
    re.split(value)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn test_label_with_spaced_characters() {
        let (field, value) = match_label("◎片  名  The Wandering Earth").unwrap();
        assert_eq!(field, Field::Title);
        assert_eq!(value, "The Wandering Earth");

        let (field, value) = match_label("【导演】：郭帆").unwrap();
        assert_eq!(field, Field::Director);
        assert_eq!(value, "郭帆");

        assert!(match_label("片名 流浪地球").is_none());
    }

    #[test]
    fn test_scan_typical_block() {
        let fields = scan(&lines(
            "◎译  名 流浪地球 / 流浪地球1
             ◎片  名 The Wandering Earth
             ◎年  代 2019
             ◎产  地 中国大陆
             ◎类  别 科幻 / 冒险、灾难
             ◎语  言 汉语普通话
             ◎豆瓣评分 7.9/10 from 2,000,000 users
             ◎IMDb评分 6.0/10 from 40,000 users
             ◎导  演 郭帆 Frant Gwo
             ◎主  演 吴京 Jing Wu
                     屈楚萧 Qu Chuxiao
             ◎简  介
                近未来，科学家们发现太阳急速衰老膨胀。
                人类提出一个名为流浪地球的大胆计划。
             【下载地址】
             流浪地球.HD1080p.国语中字.mkv",
        ));

        assert_eq!(fields.names, vec!["流浪地球 / 流浪地球1", "The Wandering Earth"]);
        assert_eq!(fields.year, Some(2019));
        assert_eq!(fields.country.as_deref(), Some("中国大陆"));
        assert_eq!(fields.genres, vec!["科幻", "冒险", "灾难"]);
        assert_eq!(fields.douban_rating, Some(7.9));
        assert_eq!(fields.imdb_rating, Some(6.0));
        assert_eq!(fields.douban_votes, Some(2_000_000));
        assert_eq!(fields.imdb_votes, Some(40_000));
        assert_eq!(fields.actors, vec!["吴京 Jing Wu", "屈楚萧 Qu Chuxiao"]);
        assert_eq!(fields.description.len(), 2);
        assert_eq!(fields.matched, 11);
    }

    #[test]
    fn test_new_label_closes_multiline_field() {
        let fields = scan(&lines(
            "◎主  演 演员甲
             演员乙
             ◎标  签 剧情
             不是演员",
        ));
        assert_eq!(fields.actors, vec!["演员甲", "演员乙"]);
    }

    #[test]
    fn test_find_year() {
        assert_eq!(find_year("2019-02-05(中国大陆)"), Some(2019));
        assert_eq!(find_year("上映 1998年"), Some(1998));
        assert_eq!(find_year("12019"), None);
        assert_eq!(find_year("1080p"), None);
        assert_eq!(find_year("1920x1080"), None);
        assert_eq!(find_year("分辨率 1920×1080 2021年"), Some(2021));
        assert_eq!(find_year("2012p 片源 2012"), Some(2012));
    }

    #[test]
    fn test_parse_rating_bounds() {
        assert_eq!(parse_rating("8.5/10 from 100 users"), Some(8.5));
        assert_eq!(parse_rating("暂无"), None);
        assert_eq!(parse_rating("85"), None);
    }

    #[test]
    fn test_parse_votes() {
        assert_eq!(parse_votes("8.5/10 from 1,234 users"), Some(1234));
        assert_eq!(parse_votes("7.1/10 from 98 users"), Some(98));
        assert_eq!(parse_votes("7.9 (35620人评价)"), Some(35620));
        assert_eq!(parse_votes("6.0"), None);
    }

    #[test]
    fn test_split_genres() {
        assert_eq!(
            split_genres("剧情，爱情|｜悬疑 犯罪"),
            vec!["剧情", "爱情", "悬疑", "犯罪"]
        );
    }
}

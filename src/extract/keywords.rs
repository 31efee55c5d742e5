//! Keyword vocabularies and language hints

/// Genre words
pub const GENRE: &[&str] = &[
    "剧情", "喜剧", "动作", "爱情", "科幻", "动画", "悬疑", "惊悚", "恐怖", "犯罪", "冒险", "奇幻",
    "战争", "历史", "传记", "音乐", "歌舞", "家庭", "武侠", "古装", "西部", "运动", "灾难",
    "纪录片",
];

/// Quality and media words
pub const QUALITY: &[&str] = &[
    "4K", "2160P", "1080P", "720P", "HDR", "蓝光", "BD", "HD", "WEB-DL", "REMUX", "高清",
    "杜比视界", "DTS", "HEVC", "X265",
];

/// Language and subtitle words
pub const LANGUAGE: &[&str] = &[
    "国语", "粤语", "英语", "日语", "韩语", "中字", "中英双字", "双语", "内封", "外挂",
    "特效字幕",
];

/// Series status words
pub const STATUS: &[&str] = &["完结", "全集", "更新至", "连载", "首播", "季终"];

/// Language name hints and the country they imply, checked in order
const LANGUAGE_COUNTRY: &[(&[&str], &str)] = &[
    (&["国语", "普通话", "汉语"], "中国大陆"),
    (&["粤语"], "中国香港"),
    (&["英语"], "美国"),
    (&["日语"], "日本"),
    (&["韩语"], "韩国"),
    (&["法语"], "法国"),
    (&["泰语"], "泰国"),
    (&["印地语"], "印度"),
];

/// Vocabulary hits of one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordHits {
    pub genre: Vec<String>,
    pub quality: Vec<String>,
    pub language: Vec<String>,
    pub status: Vec<String>,
}

impl KeywordHits {
    /// All hits, vocabulary by vocabulary
    pub fn tags(&self) -> impl Iterator<Item = &String> {
        self.genre
            .iter()
            .chain(&self.quality)
            .chain(&self.language)
            .chain(&self.status)
    }
}

/// Scans a text against the four vocabularies
///
/// Latin entries match case-insensitively.
pub fn scan(text: &str) -> KeywordHits {
    let upper = text.to_uppercase();
    KeywordHits {
        genre: hits(&upper, GENRE),
        quality: hits(&upper, QUALITY),
        language: hits(&upper, LANGUAGE),
        status: hits(&upper, STATUS),
    }
}

fn hits(upper: &str, vocabulary: &[&str]) -> Vec<String> {
    vocabulary
        .iter()
        .filter(|word| upper.contains(*word))
        .map(|word| word.to_string())
        .collect()
}

/// Infers a country from a language value
pub fn country_from_language(language: &str) -> Option<&'static str> {
    LANGUAGE_COUNTRY
        .iter()
        .find(|(hints, _)| hints.iter().any(|hint| language.contains(hint)))
        .map(|(_, country)| *country)
}

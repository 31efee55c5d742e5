//! Byte-to-text decoding with charset recovery
//!
//! The catalogue mixes UTF-8 pages with legacy GB2312/GBK pages whose headers
//! are often missing or wrong. Decoding walks an ordered candidate list with
//! strict decoders and never fails: the last resort is lossy UTF-8.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, GB18030, UTF_8};
use regex::Regex;
use std::sync::OnceLock;

/// How far into the document the meta charset hint is searched for
const META_SCAN_BYTES: usize = 2048;

/// Marker characters typical of text decoded with the wrong charset
const GARBLED_MARKERS: &[char] = &[
    '\u{FFFD}', '锟', '斤', '拷', 'Ã', 'Â', 'Ð', 'Ñ', 'å', 'æ', 'ç', 'è',
];

/// Marker count at which text is considered garbled
const GARBLED_THRESHOLD: usize = 3;

/// Candidates for a second pass over text that came out garbled
pub const CHINESE_FIRST: &[&str] = &["gb18030", "big5", "utf-8"];

/// Decoded document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Canonical name of the encoding that produced `text`
    pub encoding: &'static str,
    /// True when no candidate decoded cleanly and replacement characters were used
    pub lossy: bool,
}

/// Decodes a response body
///
/// Candidates, in order: byte-order mark, `charset` from the Content-Type
/// header, `<meta>` charset within the first 2048 bytes, the detector's guess,
/// then UTF-8 and GB18030.
///
/// # Examples
///
/// ```
/// use dytt_index::crawler::decode;
///
/// let decoded = decode("电影".as_bytes(), Some("text/html; charset=utf-8"));
/// assert_eq!(decoded.text, "电影");
/// assert_eq!(decoded.encoding, "UTF-8");
/// ```
pub fn decode(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    let mut candidates: Vec<&'static Encoding> = Vec::with_capacity(6);

    let mut body = bytes;
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        candidates.push(encoding);
        body = &bytes[bom_len..];
    }

    if let Some(encoding) = content_type.and_then(header_charset).and_then(|l| lookup(&l)) {
        candidates.push(encoding);
    }

    if let Some(encoding) = meta_charset(body).and_then(|l| lookup(&l)) {
        candidates.push(encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    candidates.push(normalize(detector.guess(None, true)));

    candidates.push(UTF_8);
    candidates.push(GB18030);

    decode_in_order(body, &candidates)
}

/// Decodes with an explicit list of encoding labels
///
/// Unknown labels are skipped. Falls back to lossy UTF-8 when no label decodes
/// cleanly.
pub fn decode_with_candidates(bytes: &[u8], labels: &[&str]) -> DecodedText {
    let candidates: Vec<&'static Encoding> = labels.iter().filter_map(|l| lookup(l)).collect();
    decode_in_order(bytes, &candidates)
}

/// Re-decodes bytes whose first decoding looked garbled
///
/// Returns the first Chinese-first candidate that decodes cleanly and does not
/// itself look garbled, or None when nothing does better.
pub fn redecode_garbled(bytes: &[u8]) -> Option<DecodedText> {
    CHINESE_FIRST
        .iter()
        .filter_map(|label| lookup(label))
        .filter_map(|encoding| strict(bytes, encoding))
        .find(|decoded| !looks_garbled(&decoded.text))
}

/// Returns true when the text carries enough mojibake markers to be suspect
pub fn looks_garbled(text: &str) -> bool {
    text.chars()
        .filter(|c| GARBLED_MARKERS.contains(c))
        .take(GARBLED_THRESHOLD)
        .count()
        >= GARBLED_THRESHOLD
}

fn decode_in_order(bytes: &[u8], candidates: &[&'static Encoding]) -> DecodedText {
    for encoding in candidates {
        if let Some(decoded) = strict(bytes, encoding) {
            return decoded;
        }
    }

    let (text, _) = UTF_8.decode_without_bom_handling(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding: UTF_8.name(),
        lossy: true,
    }
}

fn strict(bytes: &[u8], encoding: &'static Encoding) -> Option<DecodedText> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| DecodedText {
            text: text.into_owned(),
            encoding: encoding.name(),
            lossy: false,
        })
}

/// Resolves a label, widening the legacy simplified-Chinese family to GB18030
fn lookup(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().to_ascii_lowercase();
    match label.as_str() {
        "gb2312" | "gbk" | "x-gbk" | "cp936" | "windows-936" | "euc-cn" | "gb18030" => {
            Some(GB18030)
        }
        _ => Encoding::for_label(label.as_bytes()).map(normalize),
    }
}

fn normalize(encoding: &'static Encoding) -> &'static Encoding {
    if encoding == encoding_rs::GBK {
        GB18030
    } else {
        encoding
    }
}

fn header_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

fn meta_charset(bytes: &[u8]) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_\-]+)"#).expect("Invalid regex")
    });

    let head = &bytes[..bytes.len().min(META_SCAN_BYTES)];
    let head = String::from_utf8_lossy(head);
    re.captures(&head).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "◎片名　流浪地球 ◎年代　2019 ◎类别　科幻/冒险 ◎导演　郭帆";

    fn encode(label: &str, text: &str) -> Vec<u8> {
        let encoding = Encoding::for_label(label.as_bytes()).unwrap();
        let (bytes, _, had_errors) = encoding.encode(text);
        assert!(!had_errors, "{label} cannot encode sample");
        bytes.into_owned()
    }

    #[test]
    fn test_utf8_without_hints() {
        let decoded = decode(SAMPLE.as_bytes(), None);
        assert_eq!(decoded.text, SAMPLE);
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_gbk_with_header_charset() {
        let bytes = encode("gbk", SAMPLE);
        let decoded = decode(&bytes, Some("text/html; charset=GBK"));
        assert_eq!(decoded.text, SAMPLE);
        assert_eq!(decoded.encoding, "gb18030");
        assert!(!looks_garbled(&decoded.text));
    }

    #[test]
    fn test_gb2312_via_meta_tag() {
        let html = format!(
            "<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=gb2312\"></head><body>{}</body></html>",
            SAMPLE
        );
        let bytes = encode("gb2312", &html);
        let decoded = decode(&bytes, Some("text/html"));
        assert_eq!(decoded.text, html);
        assert!(!looks_garbled(&decoded.text));
    }

    #[test]
    fn test_charset_roundtrips() {
        let cases = [
            ("big5", "電影天堂 最新電影 下載"),
            ("shift_jis", "映画のダウンロード 最新作"),
            ("euc-kr", "영화 다운로드 최신작"),
        ];
        for (label, text) in cases {
            let bytes = encode(label, text);
            let content_type = format!("text/html; charset={}", label);
            let decoded = decode(&bytes, Some(&content_type));
            assert_eq!(decoded.text, text, "{label} did not round-trip");
            assert!(!looks_garbled(&decoded.text));
        }
    }

    #[test]
    fn test_wrong_header_falls_through() {
        // GBK bytes labelled as UTF-8 are not valid UTF-8, so later candidates win
        let text = format!(
            "<html><body>{}\n◎简介　近未来，科学家们发现太阳急速衰老膨胀，短时间内包括地球在内的整个太阳系都将被太阳所吞没。为了自救，人类提出一个名为流浪地球的大胆计划。</body></html>",
            SAMPLE
        );
        let bytes = encode("gbk", &text);
        let decoded = decode(&bytes, Some("text/html; charset=utf-8"));
        assert_eq!(decoded.text, text);
    }

    #[test]
    fn test_never_fails() {
        let decoded = decode_with_candidates(&[0xff, 0xfe, 0xfd, b'a'], &["utf-8"]);
        assert!(decoded.lossy);
        assert!(decoded.text.ends_with('a'));
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("电影".as_bytes());
        assert_eq!(decode(&bytes, None).text, "电影");
    }

    #[test]
    fn test_header_charset_parsing() {
        assert_eq!(
            header_charset("text/html; Charset=\"gb2312\"").as_deref(),
            Some("gb2312")
        );
        assert_eq!(header_charset("text/html"), None);
    }

    #[test]
    fn test_looks_garbled() {
        assert!(looks_garbled("锟斤拷锟斤拷"));
        assert!(looks_garbled("ç”µå½±å¤©å ‚"));
        assert!(!looks_garbled(SAMPLE));
        assert!(!looks_garbled("Café crème"));
    }

    #[test]
    fn test_redecode_garbled() {
        let bytes = encode("gbk", SAMPLE);
        let wrong = decode_with_candidates(&bytes, &["windows-1252"]);
        assert_ne!(wrong.text, SAMPLE);

        let fixed = redecode_garbled(&bytes).unwrap();
        assert_eq!(fixed.text, SAMPLE);
    }
}

use chrono::Utc;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

use crate::fetcher::types::PageResponse;

/// How far into the body we look for a `<meta>` charset declaration.
const SNIFF_LEN: usize = 4096;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

pub fn process_response(
    url_final: Url,
    status: StatusCode,
    body_bytes: &[u8],
    content_type: &str,
) -> PageResponse {
    let encoding = detect_encoding(content_type, body_bytes);
    let body_utf8 = decode_to_utf8(body_bytes, encoding);

    PageResponse {
        url_final,
        status,
        content_type: content_type.to_string(),
        body_utf8,
        encoding,
        fetched_at: Utc::now(),
    }
}

fn label_to_encoding(re: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = re.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

/// Header charset first, then `<meta charset>` / http-equiv in the first
/// few KB, then a statistical guess.
pub fn detect_encoding(content_type: &str, body_bytes: &[u8]) -> &'static Encoding {
    if let Some(encoding) = label_to_encoding(&CHARSET_REGEX, content_type) {
        return encoding;
    }

    let head = &body_bytes[..body_bytes.len().min(SNIFF_LEN)];
    let head_str = String::from_utf8_lossy(head);

    // The http-equiv form ends in `content="text/html; charset=..."`, which the
    // generic charset pattern also catches.
    if let Some(encoding) = label_to_encoding(&META_CHARSET_REGEX, &head_str)
        .or_else(|| label_to_encoding(&CHARSET_REGEX, &head_str))
    {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body_bytes.len() <= SNIFF_LEN);
    detector.guess(None, true)
}

/// Malformed sequences become U+FFFD; pages with a stray bad byte still convert.
fn decode_to_utf8(body_bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, _encoding, had_errors) = encoding.decode(body_bytes);

    if had_errors {
        warn!(encoding = encoding.name(), "replaced malformed byte sequences while decoding");
    }

    decoded.into_owned()
}

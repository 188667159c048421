use chrono::{DateTime, Utc};

/// charset for bodies that do not declare one, see RFC 2616 section 3.7.1
pub const DEFAULT_CHARSET: &str = "ISO-8859-1";

/// What a metadata probe found out about a URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlInfo {
    available: bool,
    content_length: i64,
    last_modified: Option<DateTime<Utc>>,
    body_charset: Option<String>,
}
impl UrlInfo {
    /// the result of every failed probe, no matter why it failed
    pub const UNAVAILABLE: UrlInfo = UrlInfo {
        available: false,
        content_length: -1,
        last_modified: None,
        body_charset: None,
    };

    pub fn available(content_length: i64, last_modified: Option<DateTime<Utc>>, body_charset: impl Into<String>) -> UrlInfo {
        UrlInfo {
            available: true,
            content_length,
            last_modified,
            body_charset: Some(body_charset.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// -1 if unknown
    pub fn content_length(&self) -> i64 {
        self.content_length
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn body_charset(&self) -> Option<&str> {
        self.body_charset.as_deref()
    }
}

/// Extracts the charset parameter from a Content-Type header value. The parameter name is
///  matched case-insensitively; a missing or empty charset falls back to ISO-8859-1.
pub fn charset_of(content_type: Option<&str>) -> String {
    const KEY: &str = "charset=";

    let charset = content_type.and_then(|content_type| {
        content_type.split(';')
            .map(str::trim)
            .filter(|element| element.get(..KEY.len()).map_or(false, |key| key.eq_ignore_ascii_case(KEY)))
            .filter_map(|element| element.get(KEY.len()..))
            .map(str::trim)
            .last()
    });

    match charset {
        Some(charset) if !charset.is_empty() => charset.to_string(),
        _ => DEFAULT_CHARSET.to_string(),
    }
}

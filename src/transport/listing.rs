use std::collections::BTreeSet;
use std::path::Path;

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref HREF_REGEX: Regex = Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']?([^"'\s>]+)"#).unwrap();
}

/// Extracts the names of the direct children of `directory` from an HTML directory index as
///  Apache httpd, nginx and most repository managers render it. Links to parents, to other
///  hosts, sort links and anchors are ignored.
pub fn parse_directory_listing(directory: &Url, html: &str) -> Vec<String> {
    let mut result = BTreeSet::new();

    for captures in HREF_REGEX.captures_iter(html) {
        let href = &captures[1];
        if href.starts_with('?') || href.starts_with('#') {
            continue;
        }

        let target = match directory.join(href) {
            Ok(target) => target,
            Err(_) => continue,
        };
        if target.origin() != directory.origin() {
            continue;
        }

        let child = match target.path().strip_prefix(directory.path()) {
            Some(child) => child.trim_end_matches('/'),
            None => continue,
        };
        if child.is_empty() || child.contains('/') {
            continue;
        }

        if let Ok(name) = percent_decode_str(child).decode_utf8() {
            result.insert(name.into_owned());
        }
    }
    result.into_iter().collect()
}

/// the entries of a local directory, empty if it does not exist
pub async fn list_directory(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut result = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        result.push(entry.file_name().to_string_lossy().into_owned());
    }
    result.sort();
    Ok(result)
}

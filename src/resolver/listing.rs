use std::collections::BTreeMap;

use regex::Regex;
use tracing::{debug, trace};

use crate::module::patterns::substitute_tokens;
use crate::transport::ResourceLister;

/// Finds the values a token takes in a repository, by listing the directory that contains the
///  token's first occurrence in `pattern` and matching the entries against the path segment
///  the token sits in.
///
/// All other tokens are substituted from `tokens` first. Returns `None` if the pattern can not
///  be listed this way, i.e. if it does not contain the token or if the directory to list
///  still depends on an unknown token.
pub async fn list_token_values(
    lister: &dyn ResourceLister,
    pattern: &str,
    tokens: &BTreeMap<String, String>,
    token: &str,
) -> anyhow::Result<Option<Vec<String>>> {
    let mut tokens = tokens.clone();
    tokens.remove(token);
    let partial = substitute_tokens(pattern, &tokens)?;

    let placeholder = format!("[{}]", token);
    let token_start = match partial.find(&placeholder) {
        Some(index) => index,
        None => {
            trace!("pattern {} has no token {}", pattern, placeholder);
            return Ok(None);
        }
    };

    let segment_start = partial[..token_start].rfind('/').map_or(0, |i| i + 1);
    let segment_end = partial[token_start..].find('/').map_or(partial.len(), |i| token_start + i);
    let parent = &partial[..segment_start];
    let segment = &partial[segment_start..segment_end];

    if parent.contains('[') {
        debug!("can not list {} in {}: parent location {} depends on unknown tokens", placeholder, pattern, parent);
        return Ok(None);
    }

    let segment_regex = segment_regex(segment, &placeholder)?;
    let names = lister.list(parent).await?;
    trace!("listed {} entries in {}", names.len(), parent);

    let mut values = Vec::new();
    for name in names {
        if let Some(value) = segment_regex.captures(&name).and_then(|c| c.get(1)) {
            let value = value.as_str().to_string();
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    Ok(Some(values))
}

/// A regex matching a whole path segment. The first occurrence of the token is captured,
///  repeated occurrences and other unresolved tokens match anything.
fn segment_regex(segment: &str, placeholder: &str) -> anyhow::Result<Regex> {
    let mut regex = String::from("^");
    for (i, text) in segment.split(placeholder).enumerate() {
        match i {
            0 => {}
            1 => regex.push_str("(.+?)"),
            _ => regex.push_str(".+?"),
        }
        regex.push_str(&other_tokens_as_wildcards(text));
    }
    regex.push('$');

    Ok(Regex::new(&regex)?)
}

fn other_tokens_as_wildcards(text: &str) -> String {
    let mut result = String::new();
    let mut rest = text;
    while let Some(start) = rest.find('[') {
        match rest[start..].find(']') {
            Some(len) => {
                result.push_str(&regex::escape(&rest[..start]));
                result.push_str(".*?");
                rest = &rest[start + len + 1..];
            }
            None => break,
        }
    }
    result.push_str(&regex::escape(rest));
    result
}

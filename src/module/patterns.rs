use std::collections::BTreeMap;

use thiserror::Error;

use crate::module::coordinates::ArtifactRequest;

/// A pattern that can not be substituted. This is always a configuration bug, so there is no
///  point in retrying.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid start of token at position {position} in pattern {pattern:?}")]
    NestedToken { pattern: String, position: usize },
    #[error("invalid end of token at position {position} in pattern {pattern:?}")]
    UnexpectedTokenEnd { pattern: String, position: usize },
    #[error("invalid start of optional part at position {position} in pattern {pattern:?}")]
    NestedOptional { pattern: String, position: usize },
    #[error("invalid end of optional part at position {position} in pattern {pattern:?}")]
    UnexpectedOptionalEnd { pattern: String, position: usize },
    #[error("parenthesis inside token at position {position} in pattern {pattern:?}")]
    ParenthesisInToken { pattern: String, position: usize },
    #[error("unclosed token in pattern {pattern:?}")]
    UnclosedToken { pattern: String },
    #[error("unclosed optional part in pattern {pattern:?}")]
    UnclosedOptional { pattern: String },
}

/// Substitutes the artifact's attributes into a pattern like
///  "[organisation]/[module]/[revision]/[artifact]-[revision](-[classifier]).[ext]"
pub fn substitute(pattern: &str, artifact: &ArtifactRequest) -> Result<String, PatternError> {
    substitute_tokens(pattern, &artifact.token_values())
}

/// Replaces every "[token]" in the pattern with its value.
///
/// A token without a value is left in place literally, which is what makes partially
///  substituted patterns usable for listing. A part in parentheses is optional: it is dropped
///  unless all tokens inside it have a non-empty value, and the parentheses themselves are
///  removed. An optional part without any tokens is kept verbatim, parentheses included.
pub fn substitute_tokens(pattern: &str, tokens: &BTreeMap<String, String>) -> Result<String, PatternError> {
    let mut result = String::with_capacity(pattern.len());
    let mut token: Option<String> = None;
    let mut optional: Option<OptionalPart> = None;

    for (position, c) in pattern.char_indices() {
        match c {
            '(' | ')' if token.is_some() => {
                return Err(PatternError::ParenthesisInToken { pattern: pattern.to_string(), position });
            }
            '(' => {
                if optional.is_some() {
                    return Err(PatternError::NestedOptional { pattern: pattern.to_string(), position });
                }
                optional = Some(OptionalPart::default());
            }
            ')' => {
                match optional.take() {
                    Some(part) => part.render_into(&mut result),
                    None => return Err(PatternError::UnexpectedOptionalEnd { pattern: pattern.to_string(), position }),
                }
            }
            '[' => {
                if token.is_some() {
                    return Err(PatternError::NestedToken { pattern: pattern.to_string(), position });
                }
                token = Some(String::new());
            }
            ']' => {
                let name = token.take()
                    .ok_or_else(|| PatternError::UnexpectedTokenEnd { pattern: pattern.to_string(), position })?;
                let value = tokens.get(&name).map(String::as_str);

                match optional.as_mut() {
                    Some(part) => part.push_token(value),
                    None => match value {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push('[');
                            result.push_str(&name);
                            result.push(']');
                        }
                    },
                }
            }
            c => {
                if let Some(name) = token.as_mut() {
                    name.push(c);
                }
                else if let Some(part) = optional.as_mut() {
                    part.text.push(c);
                }
                else {
                    result.push(c);
                }
            }
        }
    }

    if token.is_some() {
        return Err(PatternError::UnclosedToken { pattern: pattern.to_string() });
    }
    if optional.is_some() {
        return Err(PatternError::UnclosedOptional { pattern: pattern.to_string() });
    }
    Ok(result)
}

/// checks that a pattern can be substituted at all, without caring about the result
pub fn validate(pattern: &str) -> Result<(), PatternError> {
    substitute_tokens(pattern, &BTreeMap::new()).map(|_| ())
}

#[derive(Default)]
struct OptionalPart {
    text: String,
    has_tokens: bool,
    has_missing_token: bool,
}
impl OptionalPart {
    fn push_token(&mut self, value: Option<&str>) {
        self.has_tokens = true;
        match value {
            Some(value) if !value.is_empty() => self.text.push_str(value),
            _ => self.has_missing_token = true,
        }
    }

    fn render_into(self, result: &mut String) {
        if !self.has_tokens {
            result.push('(');
            result.push_str(&self.text);
            result.push(')');
        }
        else if !self.has_missing_token {
            result.push_str(&self.text);
        }
    }
}

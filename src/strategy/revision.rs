use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LETTER_THEN_DIGIT: Regex = Regex::new(r"([a-zA-Z])(\d)").unwrap();
    static ref DIGIT_THEN_LETTER: Regex = Regex::new(r"(\d)([a-zA-Z])").unwrap();
    static ref SEPARATORS: Regex = Regex::new(r"[._\-+]").unwrap();
}

/// textual revision parts that sort differently from plain alphabetical order
fn special_meaning(part: &str) -> Option<i32> {
    match part.to_ascii_lowercase().as_str() {
        "dev" => Some(-1),
        "rc" => Some(1),
        "final" => Some(2),
        _ => None,
    }
}

fn is_number(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// numeric comparison without overflow for arbitrarily long digit strings
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len())
        .then_with(|| a.cmp(b))
}

fn split_parts(revision: &str) -> Vec<String> {
    let revision = LETTER_THEN_DIGIT.replace_all(revision, "${1}.${2}");
    let revision = DIGIT_THEN_LETTER.replace_all(&revision, "${1}.${2}");
    SEPARATORS.split(&revision)
        .map(str::to_string)
        .collect()
}

/// Compares two revision strings the way humans read them: "1.10" is newer than "1.9",
///  "1.0-rc1" is older than "1.0", "1.0-dev" is older than "1.0-rc1".
pub fn compare_revisions(rev1: &str, rev2: &str) -> Ordering {
    if rev1 == rev2 {
        return Ordering::Equal;
    }

    let parts1 = split_parts(rev1);
    let parts2 = split_parts(rev2);

    for (p1, p2) in parts1.iter().zip(parts2.iter()) {
        if p1 == p2 {
            continue;
        }
        if is_number(p1) && is_number(p2) {
            match compare_numbers(p1, p2) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        // "1.0.1" is newer than "1.0-rc1"
        match (is_number(p1), is_number(p2)) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        return match (special_meaning(p1), special_meaning(p2)) {
            (Some(s1), s2) => s1.cmp(&s2.unwrap_or(0)),
            (None, Some(s2)) => 0.cmp(&s2),
            (None, None) => p1.cmp(p2),
        };
    }

    // one revision is a prefix of the other: an additional number means newer ("1.0.1" > "1.0"),
    //  an additional qualifier means older ("1.0-beta" < "1.0")
    match parts1.len().cmp(&parts2.len()) {
        Ordering::Greater => if is_number(&parts1[parts2.len()]) { Ordering::Greater } else { Ordering::Less },
        Ordering::Less => if is_number(&parts2[parts1.len()]) { Ordering::Less } else { Ordering::Greater },
        Ordering::Equal => Ordering::Equal,
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::equal("1.0", "1.0", Ordering::Equal)]
    #[case::numeric("1.10", "1.9", Ordering::Greater)]
    #[case::numeric_leading_zero("1.01", "1.1", Ordering::Equal)]
    #[case::longer_numeric("1.0.1", "1.0", Ordering::Greater)]
    #[case::longer_qualifier("1.0-beta", "1.0", Ordering::Less)]
    #[case::rc_before_release("1.0-rc1", "1.0", Ordering::Less)]
    #[case::glued_rc_before_release("1.0rc1", "1.0", Ordering::Less)]
    #[case::dev_before_rc("1.0-dev", "1.0-rc1", Ordering::Less)]
    #[case::rc_before_final("1.0-rc2", "1.0-final", Ordering::Less)]
    #[case::other_before_rc("1.0-alpha", "1.0-rc", Ordering::Less)]
    #[case::alphabetical("1.0-alpha", "1.0-beta", Ordering::Less)]
    #[case::rc_numbers("1.0-rc2", "1.0-rc10", Ordering::Less)]
    #[case::huge_numbers("1.123456789012345678901234567890", "1.9", Ordering::Greater)]
    #[case::number_beats_qualifier("1.0-2", "1.0-beta", Ordering::Greater)]
    #[case::number_beats_rc("1.0.1", "1.0-rc1", Ordering::Greater)]
    #[case::number_beats_final("1.0.1", "1.0-final", Ordering::Greater)]
    #[case::separators("1_2+3", "1.2.3", Ordering::Equal)]
    fn test_compare(#[case] rev1: &str, #[case] rev2: &str, #[case] expected: Ordering) {
        assert_eq!(compare_revisions(rev1, rev2), expected);
        assert_eq!(compare_revisions(rev2, rev1), expected.reverse());
    }
}

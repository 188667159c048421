use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;

use crate::metadata::ParsedDescriptor;
use crate::module::coordinates::ModuleCoordinate;
use crate::strategy::revision::compare_revisions;
use crate::strategy::VersionMatcher;

lazy_static! {
    static ref RANGE_REGEX: Regex = Regex::new(r"^([\[\]\(])\s*([^,\[\]\(\)]*?)\s*,\s*([^,\[\]\(\)]*?)\s*([\[\]\)])$").unwrap();
}

const LATEST_PREFIX: &str = "latest.";

/// Known statuses, most mature first.
pub const STATUSES: [&str; 3] = ["release", "milestone", "integration"];

fn status_priority(status: &str) -> Option<usize> {
    STATUSES.iter().position(|s| *s == status)
}

/// A fixed revision only matches itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactVersionMatcher;

impl VersionMatcher for ExactVersionMatcher {
    fn is_dynamic(&self, _requested: &ModuleCoordinate) -> bool {
        false
    }

    fn accept(&self, requested: &ModuleCoordinate, found: &ModuleCoordinate) -> bool {
        requested.revision() == found.revision()
    }

    fn needs_full_metadata(&self, _requested: &ModuleCoordinate, _found: &ModuleCoordinate) -> bool {
        false
    }
}

/// "latest.<status>" matches any revision whose descriptor has at least the requested status.
///  Since every revision is at least "integration", that one can be decided without the
///  descriptor.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestVersionMatcher;

impl LatestVersionMatcher {
    fn requested_status(requested: &ModuleCoordinate) -> Option<&str> {
        requested.revision().strip_prefix(LATEST_PREFIX)
    }
}

impl VersionMatcher for LatestVersionMatcher {
    fn is_dynamic(&self, requested: &ModuleCoordinate) -> bool {
        Self::requested_status(requested).is_some()
    }

    fn accept(&self, _requested: &ModuleCoordinate, _found: &ModuleCoordinate) -> bool {
        true
    }

    fn needs_full_metadata(&self, requested: &ModuleCoordinate, _found: &ModuleCoordinate) -> bool {
        match Self::requested_status(requested) {
            Some(status) => Some(status) != STATUSES.last().copied(),
            None => false,
        }
    }

    fn accept_descriptor(&self, requested: &ModuleCoordinate, descriptor: &ParsedDescriptor) -> bool {
        let requested_priority = Self::requested_status(requested).and_then(status_priority);
        let found_priority = status_priority(descriptor.status());
        match (requested_priority, found_priority) {
            (Some(requested), Some(found)) => found <= requested,
            _ => false,
        }
    }
}

/// "1.2.+" matches every revision starting with "1.2."
#[derive(Debug, Default, Clone, Copy)]
pub struct SubVersionMatcher;

impl VersionMatcher for SubVersionMatcher {
    fn is_dynamic(&self, requested: &ModuleCoordinate) -> bool {
        requested.revision().ends_with('+')
    }

    fn accept(&self, requested: &ModuleCoordinate, found: &ModuleCoordinate) -> bool {
        let prefix = requested.revision().trim_end_matches('+');
        found.revision().starts_with(prefix)
    }

    fn needs_full_metadata(&self, _requested: &ModuleCoordinate, _found: &ModuleCoordinate) -> bool {
        false
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Bound<'a> {
    revision: &'a str,
    inclusive: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct Range<'a> {
    lower: Option<Bound<'a>>,
    upper: Option<Bound<'a>>,
}
impl <'a> Range<'a> {
    fn parse(revision: &'a str) -> Option<Range<'a>> {
        let captures = RANGE_REGEX.captures(revision)?;
        let open = captures.get(1)?.as_str();
        let lower = captures.get(2)?.as_str();
        let upper = captures.get(3)?.as_str();
        let close = captures.get(4)?.as_str();

        let lower = if lower.is_empty() {
            None
        }
        else {
            Some(Bound { revision: lower, inclusive: open == "[" })
        };
        let upper = if upper.is_empty() {
            None
        }
        else {
            Some(Bound { revision: upper, inclusive: close == "]" })
        };

        if lower.is_none() && upper.is_none() {
            return None;
        }
        Some(Range { lower, upper })
    }

    fn contains(&self, revision: &str) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(bound) => match compare_revisions(revision, bound.revision) {
                Ordering::Greater => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Less => false,
            },
        };
        let below_upper = match &self.upper {
            None => true,
            Some(bound) => match compare_revisions(revision, bound.revision) {
                Ordering::Less => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Greater => false,
            },
        };
        above_lower && below_upper
    }
}

/// Mathematical revision ranges: "[1.0,2.0]" and "[1.0,2.0[" (or "[1.0,2.0)"), "]1.0,2.0]" or
///  "(1.0,2.0]" for an exclusive lower bound, "[1.0,)" and "(,2.0]" for open ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionRangeMatcher;

impl VersionMatcher for VersionRangeMatcher {
    fn is_dynamic(&self, requested: &ModuleCoordinate) -> bool {
        Range::parse(requested.revision()).is_some()
    }

    fn accept(&self, requested: &ModuleCoordinate, found: &ModuleCoordinate) -> bool {
        match Range::parse(requested.revision()) {
            Some(range) => range.contains(found.revision()),
            None => false,
        }
    }

    fn needs_full_metadata(&self, _requested: &ModuleCoordinate, _found: &ModuleCoordinate) -> bool {
        false
    }
}

/// Delegates to the first matcher that considers the requested revision dynamic, and to exact
///  matching if none does.
pub struct ChainVersionMatcher {
    matchers: Vec<Box<dyn VersionMatcher>>,
    fallback: ExactVersionMatcher,
}
impl ChainVersionMatcher {
    pub fn new(matchers: Vec<Box<dyn VersionMatcher>>) -> ChainVersionMatcher {
        ChainVersionMatcher {
            matchers,
            fallback: ExactVersionMatcher,
        }
    }

    /// latest.*, sub revisions and ranges
    pub fn standard() -> ChainVersionMatcher {
        ChainVersionMatcher::new(vec![
            Box::new(LatestVersionMatcher),
            Box::new(SubVersionMatcher),
            Box::new(VersionRangeMatcher),
        ])
    }

    fn delegate(&self, requested: &ModuleCoordinate) -> &dyn VersionMatcher {
        self.matchers.iter()
            .find(|m| m.is_dynamic(requested))
            .map(|m| m.as_ref())
            .unwrap_or(&self.fallback)
    }
}

impl VersionMatcher for ChainVersionMatcher {
    fn is_dynamic(&self, requested: &ModuleCoordinate) -> bool {
        self.matchers.iter().any(|m| m.is_dynamic(requested))
    }

    fn accept(&self, requested: &ModuleCoordinate, found: &ModuleCoordinate) -> bool {
        self.delegate(requested).accept(requested, found)
    }

    fn needs_full_metadata(&self, requested: &ModuleCoordinate, found: &ModuleCoordinate) -> bool {
        self.delegate(requested).needs_full_metadata(requested, found)
    }

    fn accept_descriptor(&self, requested: &ModuleCoordinate, descriptor: &ParsedDescriptor) -> bool {
        self.delegate(requested).accept_descriptor(requested, descriptor)
    }
}

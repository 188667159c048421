use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

use crate::metadata::ParsedDescriptor;

/// How a candidate's existence was established
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Existence {
    /// the transport confirmed the resource with a direct probe
    Probed,
    /// the resource showed up in a listing, it was never probed
    Listed,
}

/// One concrete location produced by substituting a pattern, together with the revision it
///  stands for. Candidates only live for the duration of a single search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateResource {
    location: String,
    revision: String,
    last_modified: Option<DateTime<Utc>>,
    existence: Existence,
}
impl CandidateResource {
    pub fn probed(location: impl Into<String>, revision: impl Into<String>, last_modified: Option<DateTime<Utc>>) -> CandidateResource {
        CandidateResource {
            location: location.into(),
            revision: revision.into(),
            last_modified,
            existence: Existence::Probed,
        }
    }

    pub fn listed(location: impl Into<String>, revision: impl Into<String>) -> CandidateResource {
        CandidateResource {
            location: location.into(),
            revision: revision.into(),
            last_modified: None,
            existence: Existence::Listed,
        }
    }

    /// the handle the transport uses to reach the resource
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn existence(&self) -> Existence {
        self.existence
    }

    /// a listed candidate that has since been probed successfully
    pub(crate) fn confirm(self, last_modified: Option<DateTime<Utc>>) -> CandidateResource {
        CandidateResource {
            last_modified: last_modified.or(self.last_modified),
            existence: Existence::Probed,
            ..self
        }
    }
}

impl Display for CandidateResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.location, self.revision)
    }
}

/// The winner of a search, paired with its descriptor if matching had to parse it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedResource {
    pub resource: CandidateResource,
    pub descriptor: Option<ParsedDescriptor>,
}

/// `None` means nothing satisfied the request, which is a normal outcome rather than a fault.
pub type SelectionResult = Option<ResolvedResource>;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::module::coordinates::ModuleCoordinate;
use crate::resolver::candidate::CandidateResource;

/// Status assumed for modules that have no descriptor of their own
pub const DEFAULT_STATUS: &str = "integration";

/// The parts of a module descriptor that revision matching can depend on. The descriptor file
///  format itself is none of this crate's business - parsers produce this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedDescriptor {
    coordinate: ModuleCoordinate,
    status: String,
    publication: Option<DateTime<Utc>>,
    is_default: bool,
}
impl ParsedDescriptor {
    pub fn new(coordinate: ModuleCoordinate, status: impl Into<String>, publication: Option<DateTime<Utc>>) -> ParsedDescriptor {
        ParsedDescriptor {
            coordinate,
            status: status.into(),
            publication,
            is_default: false,
        }
    }

    /// a placeholder for a module that exists, but has no descriptor file
    pub fn synthesized_default(coordinate: ModuleCoordinate, publication: Option<DateTime<Utc>>) -> ParsedDescriptor {
        ParsedDescriptor {
            coordinate,
            status: DEFAULT_STATUS.to_string(),
            publication,
            is_default: true,
        }
    }

    pub fn coordinate(&self) -> &ModuleCoordinate {
        &self.coordinate
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn publication(&self) -> Option<DateTime<Utc>> {
        self.publication
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

/// Fetches and parses the descriptor behind a candidate. `coordinate` is the concrete
///  coordinate the candidate stands for.
#[async_trait]
pub trait MetadataParser: Send + Sync {
    async fn parse(&self, candidate: &CandidateResource, coordinate: &ModuleCoordinate) -> anyhow::Result<ParsedDescriptor>;
}

/// Synthesizes a default descriptor without touching the resource. Used when searching for
///  artifacts, where there is no descriptor to parse.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDescriptorParser;

#[async_trait]
impl MetadataParser for DefaultDescriptorParser {
    async fn parse(&self, candidate: &CandidateResource, coordinate: &ModuleCoordinate) -> anyhow::Result<ParsedDescriptor> {
        Ok(ParsedDescriptor::synthesized_default(coordinate.clone(), candidate.last_modified()))
    }
}

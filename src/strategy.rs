pub mod latest;
pub mod matcher;
pub mod revision;

use crate::metadata::ParsedDescriptor;
use crate::module::coordinates::ModuleCoordinate;
use crate::resolver::candidate::CandidateResource;

pub use latest::{LatestLexicographicStrategy, LatestRevisionStrategy, LatestTimeStrategy};
pub use matcher::{ChainVersionMatcher, ExactVersionMatcher, LatestVersionMatcher, SubVersionMatcher, VersionRangeMatcher};

/// Decides whether a concrete revision satisfies a requested (possibly dynamic) one.
pub trait VersionMatcher: Send + Sync {
    fn is_dynamic(&self, requested: &ModuleCoordinate) -> bool;

    fn accept(&self, requested: &ModuleCoordinate, found: &ModuleCoordinate) -> bool;

    /// true if `accept` alone is not enough and the decision needs the found revision's full
    ///  descriptor, see `accept_descriptor`
    fn needs_full_metadata(&self, requested: &ModuleCoordinate, found: &ModuleCoordinate) -> bool;

    fn accept_descriptor(&self, requested: &ModuleCoordinate, descriptor: &ParsedDescriptor) -> bool {
        self.accept(requested, descriptor.coordinate())
    }
}

/// Orders candidates by preference.
pub trait LatestStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the candidates sorted with the most preferred one *last*.
    fn rank(&self, candidates: Vec<CandidateResource>) -> Vec<CandidateResource>;

    /// true if `rank` looks at last-modified timestamps, so candidates that were only listed
    ///  must be probed before ranking
    fn needs_timestamps(&self) -> bool {
        false
    }
}

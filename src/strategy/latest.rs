use std::cmp::Ordering;

use crate::resolver::candidate::CandidateResource;
use crate::strategy::revision::compare_revisions;
use crate::strategy::LatestStrategy;

/// Sorts ascending by `cmp`. Candidates that compare equal keep their discovery priority: the
///  one discovered first ends up later, i.e. more preferred.
fn rank_by(mut candidates: Vec<CandidateResource>, cmp: impl Fn(&CandidateResource, &CandidateResource) -> Ordering) -> Vec<CandidateResource> {
    candidates.reverse();
    candidates.sort_by(cmp);
    candidates
}

/// prefers the highest revision, see `compare_revisions`
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestRevisionStrategy;

impl LatestStrategy for LatestRevisionStrategy {
    fn name(&self) -> &str {
        "latest-revision"
    }

    fn rank(&self, candidates: Vec<CandidateResource>) -> Vec<CandidateResource> {
        rank_by(candidates, |a, b| compare_revisions(a.revision(), b.revision()))
    }
}

/// prefers the most recently modified resource; an unknown timestamp counts as oldest
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestTimeStrategy;

impl LatestStrategy for LatestTimeStrategy {
    fn name(&self) -> &str {
        "latest-time"
    }

    fn rank(&self, candidates: Vec<CandidateResource>) -> Vec<CandidateResource> {
        rank_by(candidates, |a, b| a.last_modified().cmp(&b.last_modified()))
    }

    fn needs_timestamps(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LatestLexicographicStrategy;

impl LatestStrategy for LatestLexicographicStrategy {
    fn name(&self) -> &str {
        "latest-lexico"
    }

    fn rank(&self, candidates: Vec<CandidateResource>) -> Vec<CandidateResource> {
        rank_by(candidates, |a, b| a.revision().cmp(b.revision()))
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use super::*;

    fn revisions(ranked: &[CandidateResource]) -> Vec<&str> {
        ranked.iter().map(|c| c.revision()).collect()
    }

    #[test]
    fn test_latest_revision() {
        let candidates = vec![
            CandidateResource::probed("a", "1.9", None),
            CandidateResource::probed("b", "1.10", None),
            CandidateResource::probed("c", "1.0-rc1", None),
            CandidateResource::probed("d", "1.0", None),
        ];

        let ranked = LatestRevisionStrategy.rank(candidates);
        assert_eq!(revisions(&ranked), vec!["1.0-rc1", "1.0", "1.9", "1.10"]);
    }

    #[test]
    fn test_latest_time() {
        let candidates = vec![
            CandidateResource::probed("a", "2.0", Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())),
            CandidateResource::probed("b", "1.0", Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())),
            CandidateResource::probed("c", "3.0", None),
        ];

        let ranked = LatestTimeStrategy.rank(candidates);
        assert_eq!(revisions(&ranked), vec!["3.0", "2.0", "1.0"]);
    }

    #[test]
    fn test_needs_timestamps() {
        assert!(LatestTimeStrategy.needs_timestamps());
        assert!(!LatestRevisionStrategy.needs_timestamps());
        assert!(!LatestLexicographicStrategy.needs_timestamps());
    }

    #[test]
    fn test_lexicographic() {
        let candidates = vec![
            CandidateResource::probed("a", "1.9", None),
            CandidateResource::probed("b", "1.10", None),
        ];

        let ranked = LatestLexicographicStrategy.rank(candidates);
        assert_eq!(revisions(&ranked), vec!["1.10", "1.9"]);
    }

    #[test]
    fn test_equal_candidates_prefer_first_discovered() {
        let candidates = vec![
            CandidateResource::probed("first", "1.0", None),
            CandidateResource::probed("second", "1.0", None),
            CandidateResource::probed("older", "0.9", None),
        ];

        let ranked = LatestRevisionStrategy.rank(candidates);
        let locations: Vec<&str> = ranked.iter().map(|c| c.location()).collect();
        assert_eq!(locations, vec!["older", "second", "first"]);
    }
}

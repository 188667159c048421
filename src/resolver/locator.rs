use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::metadata::MetadataParser;
use crate::module::coordinates::{ArtifactRequest, ModuleCoordinate, REVISION_KEY};
use crate::module::patterns::substitute;
use crate::resolver::candidate::{CandidateResource, Existence, ResolvedResource, SelectionResult};
use crate::resolver::listing::list_token_values;
use crate::strategy::{LatestStrategy, VersionMatcher};
use crate::transport::{ResourceLister, ResourceTransport};

/// Finds the best resource for a request across an ordered list of patterns.
///
/// A fixed revision is looked up pattern by pattern until the first hit. A dynamic revision
///  collects candidates from all patterns, which are then ranked by the latest strategy and
///  filtered: the first candidate (most preferred first) that is old enough, accepted by the
///  version matcher, has acceptable metadata where the matcher needs it, and is still
///  reachable wins.
pub struct PatternLocator {
    name: String,
    transport: Arc<dyn ResourceTransport>,
    lister: Option<Arc<dyn ResourceLister>>,
    matcher: Arc<dyn VersionMatcher>,
    strategy: Arc<dyn LatestStrategy>,
}

impl PatternLocator {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn ResourceTransport>,
        matcher: Arc<dyn VersionMatcher>,
        strategy: Arc<dyn LatestStrategy>,
    ) -> PatternLocator {
        PatternLocator {
            name: name.into(),
            transport,
            lister: None,
            matcher,
            strategy,
        }
    }

    /// Enables listing: dynamic revisions are then enumerated from the repository instead of
    ///  being substituted literally.
    pub fn with_lister(mut self, lister: Arc<dyn ResourceLister>) -> PatternLocator {
        self.lister = Some(lister);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &dyn ResourceTransport {
        self.transport.as_ref()
    }

    pub fn matcher(&self) -> &dyn VersionMatcher {
        self.matcher.as_ref()
    }

    pub fn lister(&self) -> Option<&dyn ResourceLister> {
        self.lister.as_deref()
    }

    /// Without an explicit `date`, the request's own publication date (if any) is the ceiling
    ///  for candidates' modification times.
    pub async fn find_resource_using_patterns(
        &self,
        patterns: &[String],
        artifact: &ArtifactRequest,
        parser: &dyn MetadataParser,
        date: Option<DateTime<Utc>>,
    ) -> anyhow::Result<SelectionResult> {
        let date = date.or(artifact.publication());
        let is_dynamic = self.matcher.is_dynamic(artifact.coordinate());

        let mut candidates = Vec::new();
        for pattern in patterns {
            let found = self.find_resource_using_pattern(pattern, artifact, is_dynamic).await?;
            if found.is_empty() {
                continue;
            }

            candidates.extend(found);
            if !is_dynamic {
                break;
            }
        }

        if candidates.is_empty() {
            debug!("{}: no resource found for {}", self.name, artifact);
            return Ok(None);
        }
        self.select(candidates, artifact.coordinate(), parser, date).await
    }

    async fn find_resource_using_pattern(&self, pattern: &str, artifact: &ArtifactRequest, is_dynamic: bool) -> anyhow::Result<Vec<CandidateResource>> {
        if is_dynamic {
            if let Some(lister) = &self.lister {
                if let Some(revisions) = list_token_values(lister.as_ref(), pattern, &artifact.token_values(), REVISION_KEY).await? {
                    let mut result = Vec::with_capacity(revisions.len());
                    for revision in revisions {
                        let concrete = artifact.with_coordinate(artifact.coordinate().with_revision(&revision));
                        result.push(CandidateResource::listed(substitute(pattern, &concrete)?, revision));
                    }
                    trace!("{}: listed {} revisions for {}", self.name, result.len(), pattern);
                    return Ok(result);
                }
            }
        }

        let location = substitute(pattern, artifact)?;
        let info = self.transport.probe(&location).await;
        if info.is_available() {
            trace!("{}: found {}", self.name, location);
            Ok(vec![CandidateResource::probed(location, artifact.coordinate().revision(), info.last_modified())])
        }
        else {
            trace!("{}: tried {}", self.name, location);
            Ok(Vec::new())
        }
    }

    /// Ranks the candidates and returns the most preferred one that passes all filters.
    ///  Candidates after the winner are never looked at.
    pub async fn select(
        &self,
        candidates: Vec<CandidateResource>,
        requested: &ModuleCoordinate,
        parser: &dyn MetadataParser,
        date: Option<DateTime<Utc>>,
    ) -> anyhow::Result<SelectionResult> {
        let candidates = if self.strategy.needs_timestamps() {
            let mut confirmed = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                if let Some(candidate) = self.confirm_listed(candidate).await {
                    confirmed.push(candidate);
                }
            }
            confirmed
        }
        else {
            candidates
        };
        let ranked = self.strategy.rank(candidates);

        for candidate in ranked.into_iter().rev() {
            if let Some(resolved) = self.filter(candidate, requested, parser, date).await? {
                debug!("{}: found {} for {}", self.name, resolved.resource, requested);
                return Ok(Some(resolved));
            }
        }
        debug!("{}: no acceptable candidate for {}", self.name, requested);
        Ok(None)
    }

    async fn filter(
        &self,
        candidate: CandidateResource,
        requested: &ModuleCoordinate,
        parser: &dyn MetadataParser,
        date: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Option<ResolvedResource>> {
        let mut candidate = candidate;

        if let Some(date) = date {
            if candidate.last_modified().is_none() {
                candidate = match self.confirm_listed(candidate).await {
                    Some(candidate) => candidate,
                    None => return Ok(None),
                };
            }
            if candidate.last_modified().map_or(false, |modified| modified > date) {
                debug!("{}: {} is too young (after {})", self.name, candidate, date);
                return Ok(None);
            }
        }

        let found = requested.with_revision(candidate.revision());
        if !self.matcher.accept(requested, &found) {
            debug!("{}: {} rejected by version matcher for {}", self.name, candidate, requested);
            return Ok(None);
        }

        let mut descriptor = None;
        if self.matcher.needs_full_metadata(requested, &found) {
            // there is no point in parsing something that is not there
            candidate = match self.confirm_listed(candidate).await {
                Some(candidate) => candidate,
                None => return Ok(None),
            };

            let parsed = parser.parse(&candidate, &found).await?;
            if parsed.is_default() {
                debug!("{}: {} has no descriptor of its own, rejected", self.name, candidate);
                return Ok(None);
            }
            if !self.matcher.accept_descriptor(requested, &parsed) {
                debug!("{}: descriptor of {} rejected by version matcher for {}", self.name, candidate, requested);
                return Ok(None);
            }
            descriptor = Some(parsed);
        }

        let candidate = match self.confirm_listed(candidate).await {
            Some(candidate) => candidate,
            None => return Ok(None),
        };
        Ok(Some(ResolvedResource { resource: candidate, descriptor }))
    }

    /// Probes a candidate that was only listed so far. Probed candidates pass unchanged.
    async fn confirm_listed(&self, candidate: CandidateResource) -> Option<CandidateResource> {
        if candidate.existence() == Existence::Probed {
            return Some(candidate);
        }

        let info = self.transport.probe(candidate.location()).await;
        if info.is_available() {
            Some(candidate.confirm(info.last_modified()))
        }
        else {
            debug!("{}: {} is not reachable", self.name, candidate);
            None
        }
    }
}

pub mod candidate;
pub mod listing;
pub mod locator;

#[cfg(test)]
pub(crate) mod test_fakes;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::metadata::{DefaultDescriptorParser, MetadataParser};
use crate::module::coordinates::{
    ArtifactRequest, ModuleCoordinate, ARTIFACT_KEY, DESCRIPTOR_ARTIFACT_EXT, DESCRIPTOR_ARTIFACT_NAME,
    DESCRIPTOR_ARTIFACT_TYPE, EXT_KEY, MODULE_KEY, TYPE_KEY,
};
use crate::module::patterns::{substitute, validate, PatternError};
use crate::resolver::candidate::{CandidateResource, ResolvedResource, SelectionResult};
use crate::resolver::listing::list_token_values;
use crate::resolver::locator::PatternLocator;

const LATEST_PREFIX: &str = "latest.";

/// A repository described by two ordered pattern lists: one for module descriptors, one for
///  artifacts.
///
/// The pattern lists can be replaced while searches are running; every search works on the
///  lists as they were when it started.
pub struct PatternResolver {
    locator: PatternLocator,
    descriptor_patterns: RwLock<Arc<Vec<String>>>,
    artifact_patterns: RwLock<Arc<Vec<String>>>,
    m2compatible: bool,
    allow_no_descriptor: bool,
    descriptor_parser: Arc<dyn MetadataParser>,
}

impl PatternResolver {
    pub fn new(locator: PatternLocator) -> PatternResolver {
        PatternResolver {
            locator,
            descriptor_patterns: RwLock::new(Arc::new(Vec::new())),
            artifact_patterns: RwLock::new(Arc::new(Vec::new())),
            m2compatible: false,
            allow_no_descriptor: false,
            descriptor_parser: Arc::new(DefaultDescriptorParser),
        }
    }

    /// Maven 2 layout: dots in the organization become directory separators
    pub fn with_m2compatible(mut self, m2compatible: bool) -> PatternResolver {
        self.m2compatible = m2compatible;
        self
    }

    /// whether modules without a descriptor count when listing names
    pub fn with_allow_no_descriptor(mut self, allow_no_descriptor: bool) -> PatternResolver {
        self.allow_no_descriptor = allow_no_descriptor;
        self
    }

    pub fn with_descriptor_parser(mut self, parser: Arc<dyn MetadataParser>) -> PatternResolver {
        self.descriptor_parser = parser;
        self
    }

    pub fn name(&self) -> &str {
        self.locator.name()
    }

    pub fn locator(&self) -> &PatternLocator {
        &self.locator
    }

    pub fn is_m2compatible(&self) -> bool {
        self.m2compatible
    }

    pub fn allows_no_descriptor(&self) -> bool {
        self.allow_no_descriptor
    }

    pub fn descriptor_patterns(&self) -> Arc<Vec<String>> {
        snapshot(&self.descriptor_patterns)
    }

    pub fn artifact_patterns(&self) -> Arc<Vec<String>> {
        snapshot(&self.artifact_patterns)
    }

    pub fn add_descriptor_pattern(&self, pattern: impl Into<String>) -> Result<(), PatternError> {
        add_pattern(&self.descriptor_patterns, pattern.into())
    }

    pub fn add_artifact_pattern(&self, pattern: impl Into<String>) -> Result<(), PatternError> {
        add_pattern(&self.artifact_patterns, pattern.into())
    }

    pub fn set_descriptor_patterns(&self, patterns: Vec<String>) -> Result<(), PatternError> {
        set_patterns(&self.descriptor_patterns, patterns)
    }

    pub fn set_artifact_patterns(&self, patterns: Vec<String>) -> Result<(), PatternError> {
        set_patterns(&self.artifact_patterns, patterns)
    }

    fn search_coordinate(&self, coordinate: &ModuleCoordinate) -> ModuleCoordinate {
        if self.m2compatible {
            coordinate.to_m2_search_form()
        }
        else {
            coordinate.clone()
        }
    }

    /// Looks for a module's descriptor file, using the descriptor patterns only.
    pub async fn find_descriptor(&self, coordinate: &ModuleCoordinate, date: Option<DateTime<Utc>>) -> anyhow::Result<SelectionResult> {
        let artifact = ArtifactRequest::descriptor_for(self.search_coordinate(coordinate), date);
        let patterns = self.descriptor_patterns();

        self.locator.find_resource_using_patterns(&patterns, &artifact, self.descriptor_parser.as_ref(), date).await
    }

    /// Looks for an artifact using the artifact patterns, falling back to the artifact's own
    ///  URL if it has one.
    pub async fn find_artifact(&self, artifact: &ArtifactRequest, date: Option<DateTime<Utc>>) -> anyhow::Result<SelectionResult> {
        let search = artifact.with_coordinate(self.search_coordinate(artifact.coordinate()));
        let patterns = self.artifact_patterns();

        let found = self.locator.find_resource_using_patterns(&patterns, &search, &DefaultDescriptorParser, date).await?;
        if found.is_some() {
            return Ok(found);
        }

        if let Some(url) = artifact.url() {
            let info = self.locator.transport().probe(url).await;
            if info.is_available() {
                debug!("{}: found {} at its own URL {}", self.name(), artifact, url);
                return Ok(Some(ResolvedResource {
                    resource: CandidateResource::probed(url, artifact.coordinate().revision(), info.last_modified()),
                    descriptor: None,
                }));
            }
        }
        Ok(None)
    }

    /// The locations a descriptor search for `coordinate` looks at, for diagnostics. For a
    ///  dynamic revision each pattern is listed a second time with the revision shown as a
    ///  placeholder.
    pub fn descriptor_not_found_attempts(&self, coordinate: &ModuleCoordinate) -> Result<Vec<String>, PatternError> {
        let coordinate = self.search_coordinate(coordinate);
        let patterns = self.descriptor_patterns();
        if patterns.is_empty() {
            return Ok(vec![format!("no descriptor pattern => no attempt to find module descriptor file for {}", coordinate)]);
        }

        let artifact = ArtifactRequest::descriptor_for(coordinate.clone(), None);
        let placeholder = artifact.with_coordinate(coordinate.with_revision(revision_placeholder(coordinate.revision())));
        let is_dynamic = self.locator.matcher().is_dynamic(&coordinate);

        let mut attempts = Vec::new();
        for pattern in patterns.iter() {
            attempts.push(substitute(pattern, &artifact)?);
            if is_dynamic {
                attempts.push(substitute(pattern, &placeholder)?);
            }
        }
        Ok(attempts)
    }

    /// The locations an artifact search looks at, for diagnostics.
    pub fn artifact_not_found_attempts(&self, artifact: &ArtifactRequest) -> Result<Vec<String>, PatternError> {
        let patterns = self.artifact_patterns();

        let mut attempts = Vec::new();
        if patterns.is_empty() && artifact.url().is_none() {
            attempts.push(format!("no artifact pattern => no attempt to find artifact {}", artifact));
        }

        let used = artifact.with_coordinate(self.search_coordinate(artifact.coordinate()));
        for pattern in patterns.iter() {
            attempts.push(substitute(pattern, &used)?);
        }
        if let Some(url) = artifact.url() {
            attempts.push(url.to_string());
        }
        Ok(attempts)
    }

    pub fn log_descriptor_not_found(&self, coordinate: &ModuleCoordinate) {
        match self.descriptor_not_found_attempts(coordinate) {
            Ok(attempts) => {
                info!("{}: module descriptor not found for {}", self.name(), coordinate);
                for attempt in attempts {
                    info!("\ttried {}", attempt);
                }
            }
            Err(e) => debug!("{}: can not list attempts for {}: {}", self.name(), coordinate, e),
        }
    }

    pub fn log_artifact_not_found(&self, artifact: &ArtifactRequest) {
        match self.artifact_not_found_attempts(artifact) {
            Ok(attempts) => {
                info!("{}: artifact not found: {}", self.name(), artifact);
                for attempt in attempts {
                    info!("\ttried {}", attempt);
                }
            }
            Err(e) => debug!("{}: can not list attempts for {}: {}", self.name(), artifact, e),
        }
    }

    /// The values `token` takes in this repository, given values for the tokens before it
    ///  (e.g. all revisions of an organization's module). Empty if the repository can not be
    ///  listed.
    pub async fn list_names(&self, token_values: &BTreeMap<String, String>, token: &str) -> anyhow::Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();

        let mut descriptor_tokens = token_values.clone();
        descriptor_tokens.insert(ARTIFACT_KEY.to_string(), DESCRIPTOR_ARTIFACT_NAME.to_string());
        descriptor_tokens.insert(TYPE_KEY.to_string(), DESCRIPTOR_ARTIFACT_TYPE.to_string());
        descriptor_tokens.insert(EXT_KEY.to_string(), DESCRIPTOR_ARTIFACT_EXT.to_string());
        self.collect_token_values(&self.descriptor_patterns(), &descriptor_tokens, token, &mut names).await?;

        if self.allow_no_descriptor {
            let mut artifact_tokens = token_values.clone();
            if let Some(module) = token_values.get(MODULE_KEY) {
                artifact_tokens.insert(ARTIFACT_KEY.to_string(), module.clone());
            }
            artifact_tokens.insert(TYPE_KEY.to_string(), "jar".to_string());
            artifact_tokens.insert(EXT_KEY.to_string(), "jar".to_string());
            self.collect_token_values(&self.artifact_patterns(), &artifact_tokens, token, &mut names).await?;
        }
        Ok(names)
    }

    async fn collect_token_values(&self, patterns: &[String], tokens: &BTreeMap<String, String>, token: &str, names: &mut BTreeSet<String>) -> anyhow::Result<()> {
        let lister = match self.locator.lister() {
            Some(lister) => lister,
            None => return Ok(()),
        };

        for pattern in patterns {
            if let Some(values) = list_token_values(lister, pattern, tokens, token).await? {
                names.extend(values);
            }
        }
        Ok(())
    }
}

/// how a dynamic revision shows up in diagnostics: "[any release]" for "latest.release"
fn revision_placeholder(revision: &str) -> String {
    match revision.strip_prefix(LATEST_PREFIX) {
        Some(status) => format!("[any {}]", status),
        None => format!("[{}]", revision),
    }
}

fn snapshot(patterns: &RwLock<Arc<Vec<String>>>) -> Arc<Vec<String>> {
    patterns.read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn add_pattern(patterns: &RwLock<Arc<Vec<String>>>, pattern: String) -> Result<(), PatternError> {
    validate(&pattern)?;

    let mut guard = patterns.write().unwrap_or_else(PoisonError::into_inner);
    let mut updated = guard.as_ref().clone();
    updated.push(pattern);
    *guard = Arc::new(updated);
    Ok(())
}

fn set_patterns(patterns: &RwLock<Arc<Vec<String>>>, new_patterns: Vec<String>) -> Result<(), PatternError> {
    for pattern in &new_patterns {
        validate(pattern)?;
    }

    *patterns.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(new_patterns);
    Ok(())
}

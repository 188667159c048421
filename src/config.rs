use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::resolver::locator::PatternLocator;
use crate::resolver::PatternResolver;
use crate::strategy::{ChainVersionMatcher, LatestLexicographicStrategy, LatestRevisionStrategy, LatestStrategy, LatestTimeStrategy};
use crate::transport::http::HttpTransport;
use crate::transport::{RequestMethod, ResourceLister, ResourceTransport};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatestStrategyKind {
    #[default]
    LatestRevision,
    LatestTime,
    LatestLexico,
}
impl LatestStrategyKind {
    pub fn strategy(&self) -> Arc<dyn LatestStrategy> {
        match self {
            LatestStrategyKind::LatestRevision => Arc::new(LatestRevisionStrategy),
            LatestStrategyKind::LatestTime => Arc::new(LatestTimeStrategy),
            LatestStrategyKind::LatestLexico => Arc::new(LatestLexicographicStrategy),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// 0 leaves timeouts to the OS
    pub timeout_ms: u64,
    pub request_method: RequestMethod,
    pub user_agent: Option<String>,
}
impl TransportConfig {
    pub fn build_transport(&self) -> HttpTransport {
        let mut transport = HttpTransport::new()
            .with_request_method(self.request_method)
            .with_timeout(Duration::from_millis(self.timeout_ms));
        if let Some(user_agent) = &self.user_agent {
            transport = transport.with_user_agent(user_agent.as_str());
        }
        transport
    }
}

/// One repository, as read from a JSON file:
///
/// ```json
/// {
///   "name": "shared",
///   "descriptor_patterns": ["https://repo.example/[organisation]/[module]/[revision]/ivy-[revision].xml"],
///   "artifact_patterns": ["https://repo.example/[organisation]/[module]/[revision]/[artifact]-[revision].[ext]"],
///   "m2compatible": false,
///   "latest_strategy": "latest-revision",
///   "transport": { "timeout_ms": 30000, "request_method": "head" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    pub name: String,
    #[serde(default)]
    pub descriptor_patterns: Vec<String>,
    #[serde(default)]
    pub artifact_patterns: Vec<String>,
    #[serde(default)]
    pub m2compatible: bool,
    #[serde(default)]
    pub allow_no_descriptor: bool,
    #[serde(default)]
    pub latest_strategy: LatestStrategyKind,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl ResolverConfig {
    pub fn load(path: &Path) -> anyhow::Result<ResolverConfig> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading resolver configuration {}", path.display()))?;
        ResolverConfig::from_json(&json)
            .with_context(|| format!("in resolver configuration {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<ResolverConfig> {
        let config: ResolverConfig = serde_json::from_str(json)
            .context("malformed resolver configuration")?;
        debug!("resolver {}: {} descriptor patterns, {} artifact patterns", config.name, config.descriptor_patterns.len(), config.artifact_patterns.len());
        Ok(config)
    }

    /// Builds the resolver on top of a repository access that can both probe and list.
    ///  Malformed patterns are reported here rather than during the first search.
    pub fn build_resolver<T>(&self, transport: Arc<T>) -> anyhow::Result<PatternResolver>
    where T: ResourceTransport + ResourceLister + 'static
    {
        let locator = PatternLocator::new(
            self.name.as_str(),
            transport.clone(),
            Arc::new(ChainVersionMatcher::standard()),
            self.latest_strategy.strategy(),
        ).with_lister(transport);

        let resolver = PatternResolver::new(locator)
            .with_m2compatible(self.m2compatible)
            .with_allow_no_descriptor(self.allow_no_descriptor);
        resolver.set_descriptor_patterns(self.descriptor_patterns.clone())
            .with_context(|| format!("invalid descriptor pattern for resolver {}", self.name))?;
        resolver.set_artifact_patterns(self.artifact_patterns.clone())
            .with_context(|| format!("invalid artifact pattern for resolver {}", self.name))?;
        Ok(resolver)
    }
}

//! Resource resolution for a dependency manager: locating module descriptors and artifacts
//!  across pattern-templated repository layouts, and moving their bytes over HTTP.

pub mod config;
pub mod metadata;
pub mod module;
pub mod resolver;
pub mod strategy;
pub mod transport;

pub use module::coordinates::{ArtifactRequest, ModuleCoordinate};
pub use resolver::candidate::{CandidateResource, Existence, ResolvedResource, SelectionResult};
pub use resolver::locator::PatternLocator;
pub use resolver::PatternResolver;
pub use transport::http::HttpTransport;
pub use transport::url_info::UrlInfo;

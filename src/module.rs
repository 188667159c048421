pub mod coordinates;
pub mod patterns;

pub use coordinates::{ArtifactRequest, ModuleCoordinate};
pub use patterns::{substitute, substitute_tokens, PatternError};

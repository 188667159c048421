use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

pub const ORGANISATION_KEY: &str = "organisation";
pub const ORGANIZATION_KEY: &str = "organization";
pub const ORG_PATH_KEY: &str = "orgPath";
pub const MODULE_KEY: &str = "module";
pub const BRANCH_KEY: &str = "branch";
pub const REVISION_KEY: &str = "revision";
pub const ARTIFACT_KEY: &str = "artifact";
pub const TYPE_KEY: &str = "type";
pub const EXT_KEY: &str = "ext";

/// Name, type and extension that stand in for the module descriptor file when it is looked up
///  through the same patterns as artifacts.
pub const DESCRIPTOR_ARTIFACT_NAME: &str = "ivy";
pub const DESCRIPTOR_ARTIFACT_TYPE: &str = "ivy";
pub const DESCRIPTOR_ARTIFACT_EXT: &str = "xml";

/// Identifies one revision of a module. The revision may be a fixed literal or a dynamic
///  specifier like "latest.integration" or "[1.0,2.0[" - which one is decided by a
///  `VersionMatcher`, not here.
///
/// Values are never modified after construction; derived coordinates are new values.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct ModuleCoordinate {
    organization: String,
    module: String,
    branch: Option<String>,
    revision: String,
}
impl ModuleCoordinate {
    pub fn new(organization: impl Into<String>, module: impl Into<String>, revision: impl Into<String>) -> ModuleCoordinate {
        ModuleCoordinate {
            organization: organization.into(),
            module: module.into(),
            branch: None,
            revision: revision.into(),
        }
    }

    pub fn with_branch(&self, branch: impl Into<String>) -> ModuleCoordinate {
        ModuleCoordinate {
            branch: Some(branch.into()),
            ..self.clone()
        }
    }

    /// the same module at another revision, e.g. a concrete revision found for a dynamic request
    pub fn with_revision(&self, revision: impl Into<String>) -> ModuleCoordinate {
        ModuleCoordinate {
            revision: revision.into(),
            ..self.clone()
        }
    }

    /// Maven-style repositories lay out organizations as directories, i.e. "org.apache" is
    ///  searched as "org/apache".
    pub fn to_m2_search_form(&self) -> ModuleCoordinate {
        if !self.organization.contains('.') {
            return self.clone();
        }
        ModuleCoordinate {
            organization: self.organization.replace('.', "/"),
            ..self.clone()
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl Display for ModuleCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.branch {
            None => write!(f, "{}#{};{}", self.organization, self.module, self.revision),
            Some(branch) => write!(f, "{}#{}#{};{}", self.organization, self.module, branch, self.revision),
        }
    }
}

/// A request for one file belonging to a module revision.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ArtifactRequest {
    coordinate: ModuleCoordinate,
    name: String,
    artifact_type: String,
    ext: String,
    extra_attributes: BTreeMap<String, String>,
    url: Option<String>,
    publication: Option<DateTime<Utc>>,
}
impl ArtifactRequest {
    pub fn new(coordinate: ModuleCoordinate, name: impl Into<String>, artifact_type: impl Into<String>, ext: impl Into<String>) -> ArtifactRequest {
        ArtifactRequest {
            coordinate,
            name: name.into(),
            artifact_type: artifact_type.into(),
            ext: ext.into(),
            extra_attributes: BTreeMap::new(),
            url: None,
            publication: None,
        }
    }

    /// the pseudo-artifact used to look up a module's descriptor file
    pub fn descriptor_for(coordinate: ModuleCoordinate, publication: Option<DateTime<Utc>>) -> ArtifactRequest {
        ArtifactRequest {
            publication,
            ..ArtifactRequest::new(coordinate, DESCRIPTOR_ARTIFACT_NAME, DESCRIPTOR_ARTIFACT_TYPE, DESCRIPTOR_ARTIFACT_EXT)
        }
    }

    pub fn with_extra_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> ArtifactRequest {
        self.extra_attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> ArtifactRequest {
        self.url = Some(url.into());
        self
    }

    pub fn with_publication(mut self, publication: DateTime<Utc>) -> ArtifactRequest {
        self.publication = Some(publication);
        self
    }

    /// the same artifact, attached to another module coordinate
    pub fn with_coordinate(&self, coordinate: ModuleCoordinate) -> ArtifactRequest {
        ArtifactRequest {
            coordinate,
            ..self.clone()
        }
    }

    pub fn coordinate(&self) -> &ModuleCoordinate {
        &self.coordinate
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn extra_attributes(&self) -> &BTreeMap<String, String> {
        &self.extra_attributes
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn publication(&self) -> Option<DateTime<Utc>> {
        self.publication
    }

    /// The attribute bag used for pattern substitution. Extra attributes come first so that
    ///  the standard tokens always win over an extra attribute of the same name.
    pub fn token_values(&self) -> BTreeMap<String, String> {
        let mut tokens = self.extra_attributes.clone();

        let coordinate = &self.coordinate;
        tokens.insert(ORGANISATION_KEY.to_string(), coordinate.organization.clone());
        tokens.insert(ORGANIZATION_KEY.to_string(), coordinate.organization.clone());
        tokens.insert(ORG_PATH_KEY.to_string(), coordinate.organization.replace('.', "/"));
        tokens.insert(MODULE_KEY.to_string(), coordinate.module.clone());
        tokens.insert(REVISION_KEY.to_string(), coordinate.revision.clone());
        if let Some(branch) = &coordinate.branch {
            tokens.insert(BRANCH_KEY.to_string(), branch.clone());
        }
        tokens.insert(ARTIFACT_KEY.to_string(), self.name.clone());
        tokens.insert(TYPE_KEY.to_string(), self.artifact_type.clone());
        tokens.insert(EXT_KEY.to_string(), self.ext.clone());
        tokens
    }
}

impl Display for ArtifactRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}.{}({})", self.coordinate, self.name, self.ext, self.artifact_type)
    }
}

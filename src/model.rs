//! Value types that make up a parsed descriptor.
//!
//! These types are plain data. Every merge in [`crate::management`] builds
//! new values from them instead of mutating shared ones, so a parent's
//! computed maps are never aliased by a child's.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coordinate::{ArtifactCoordinate, DEFAULT_TYPE};
use crate::properties::{interpolate, Properties};

/// Relative path assumed when a `<parent>` does not declare one.
pub const DEFAULT_RELATIVE_PATH: &str = "../pom.xml";

/// Group assumed for plugins that omit `<groupId>`.
pub const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";

/// The `<parent>` block of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentReference {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// The `<relativePath>` hint; `None` means the `../pom.xml` convention.
    pub relative_path: Option<String>,
}

impl ParentReference {
    /// The relative path checked for a local parent, always naming a file.
    pub fn descriptor_relative_path(&self) -> String {
        let hint = self
            .relative_path
            .as_deref()
            .unwrap_or(DEFAULT_RELATIVE_PATH);
        if hint.ends_with("pom.xml") {
            hint.to_string()
        } else if hint.ends_with('/') || hint.is_empty() {
            format!("{}pom.xml", hint)
        } else {
            format!("{}/pom.xml", hint)
        }
    }

    pub fn pom_coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::pom(&self.group_id, &self.artifact_id, &self.version)
    }
}

/// One `<exclusion>` of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    /// Whether this exclusion matches the given artifact, honouring `*` wildcards.
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        (self.group_id == "*" || self.group_id == group_id)
            && (self.artifact_id == "*" || self.artifact_id == artifact_id)
    }
}

/// Identity of a dependency across management layers.
///
/// The version is deliberately not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagementKey {
    pub group_id: String,
    pub artifact_id: String,
    pub r#type: String,
    pub classifier: String,
}

impl fmt::Display for ManagementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.r#type, self.classifier
        )
    }
}

/// A `<dependency>` as declared, before or after management is applied.
///
/// `None` means "not declared"; management fills only those fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub r#type: Option<String>,
    pub classifier: Option<String>,
    pub optional: Option<bool>,
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(group_id: &str, artifact_id: &str, version: Option<&str>) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn management_key(&self) -> ManagementKey {
        ManagementKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            r#type: self.effective_type().to_string(),
            classifier: self.classifier.clone().unwrap_or_default(),
        }
    }

    pub fn effective_type(&self) -> &str {
        self.r#type.as_deref().unwrap_or(DEFAULT_TYPE)
    }

    pub fn is_optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }

    /// `scope=import` with `type=pom`: a BOM to splice into management.
    pub fn is_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.effective_type() == "pom"
    }

    /// The artifact this dependency points at, if its version is known.
    pub fn coordinate(&self) -> Option<ArtifactCoordinate> {
        let version = self.version.as_deref()?;
        Some(
            ArtifactCoordinate::new(
                &self.group_id,
                &self.artifact_id,
                self.effective_type(),
                version,
            )
            .with_classifier(self.classifier.clone()),
        )
    }

    /// The descriptor of the artifact this dependency points at.
    pub fn pom_coordinate(&self) -> Option<ArtifactCoordinate> {
        let version = self.version.as_deref()?;
        Some(ArtifactCoordinate::pom(
            &self.group_id,
            &self.artifact_id,
            version,
        ))
    }

    /// A copy with `${...}` references substituted in every string field.
    pub fn interpolate(&self, properties: &Properties) -> Self {
        let sub = |v: &Option<String>| v.as_deref().map(|s| interpolate(s, properties));
        Self {
            group_id: interpolate(&self.group_id, properties),
            artifact_id: interpolate(&self.artifact_id, properties),
            version: sub(&self.version),
            scope: sub(&self.scope),
            r#type: sub(&self.r#type),
            classifier: sub(&self.classifier),
            optional: self.optional,
            exclusions: self
                .exclusions
                .iter()
                .map(|e| Exclusion {
                    group_id: interpolate(&e.group_id, properties),
                    artifact_id: interpolate(&e.artifact_id, properties),
                })
                .collect(),
        }
    }

    /// Fill every field this dependency leaves unset from a managed entry.
    pub fn with_management(&self, managed: &Dependency) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone().or_else(|| managed.version.clone()),
            scope: self.scope.clone().or_else(|| managed.scope.clone()),
            r#type: self.r#type.clone().or_else(|| managed.r#type.clone()),
            classifier: self.classifier.clone().or_else(|| managed.classifier.clone()),
            optional: self.optional,
            exclusions: if self.exclusions.is_empty() {
                managed.exclusions.clone()
            } else {
                self.exclusions.clone()
            },
        }
    }
}

/// Identity of a plugin across management layers: `groupId:artifactId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginKey {
    pub group_id: String,
    pub artifact_id: String,
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A `<plugin>` in `<build>` or `<pluginManagement>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
}

impl Plugin {
    pub fn new(group_id: Option<&str>, artifact_id: &str, version: Option<&str>) -> Self {
        Self {
            group_id: group_id.map(str::to_string),
            artifact_id: artifact_id.to_string(),
            version: version.map(str::to_string),
        }
    }

    pub fn effective_group_id(&self) -> &str {
        self.group_id.as_deref().unwrap_or(DEFAULT_PLUGIN_GROUP)
    }

    pub fn key(&self) -> PluginKey {
        PluginKey {
            group_id: self.effective_group_id().to_string(),
            artifact_id: self.artifact_id.clone(),
        }
    }

    pub fn interpolate(&self, properties: &Properties) -> Self {
        Self {
            group_id: self.group_id.as_deref().map(|s| interpolate(s, properties)),
            artifact_id: interpolate(&self.artifact_id, properties),
            version: self.version.as_deref().map(|s| interpolate(s, properties)),
        }
    }

    pub fn with_management(&self, managed: &Plugin) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone().or_else(|| managed.version.clone()),
        }
    }
}

/// A `<profile>`; only the parts that affect module discovery are modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Option<String>,
    pub modules: Vec<String>,
}

//! # Descriptor Model
//!
//! A [`Descriptor`] is one parsed `pom.xml`: its coordinates, parent
//! reference, properties, dependency and plugin declarations (both direct
//! and managed), modules, and profile modules.
//!
//! Descriptors are immutable values once loaded. A transformation that wants
//! to change a file clones the descriptor, edits the clone and hands it to
//! [`crate::persist::save`].
//!
//! Parsing goes through the colon-escaping workaround in [`crate::escape`]
//! and parses only the document element with `xot`; element names are
//! matched by local name, so the usual default POM namespace is irrelevant.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use xot::{Node, Xot};

use crate::error::{Error, Result};
use crate::escape::escape_configuration_colons;
use crate::model::{Dependency, Exclusion, ParentReference, Plugin, Profile};
use crate::properties::Properties;
use crate::xml::{
    child_element, child_elements, child_text, descend, document_element_span, element_children,
    local_name, text_of, SourceText,
};

/// File name every module directory is expected to contain.
pub const DESCRIPTOR_FILE_NAME: &str = "pom.xml";

/// One parsed project descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    /// Canonical path of the source file.
    pub path: PathBuf,
    pub group_id: Option<String>,
    /// Empty when the file does not declare one.
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentReference>,
    pub properties: Properties,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    pub plugins: Vec<Plugin>,
    pub plugin_management: Vec<Plugin>,
    pub modules: Vec<String>,
    pub profiles: Vec<Profile>,
}

impl Descriptor {
    /// Read and parse a descriptor from disk, canonicalizing its path.
    pub fn load(path: &Path) -> Result<Self> {
        let canonical = path.canonicalize()?;
        let raw = fs::read(&canonical)?;
        let source = SourceText::decode(&canonical, &raw)?;
        Self::parse(&canonical, &source.text)
    }

    /// Parse descriptor text. `path` is recorded as-is.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let escaped = escape_configuration_colons(text);
        let parse_error = |message: String| Error::DescriptorParse {
            path: path.to_path_buf(),
            message,
        };

        let (start, end) = document_element_span(&escaped)
            .ok_or_else(|| parse_error("no document element found".to_string()))?;

        let mut xot = Xot::new();
        let doc = xot
            .parse(&escaped[start..end])
            .map_err(|e| parse_error(e.to_string()))?;
        let project = xot
            .document_element(doc)
            .map_err(|e| parse_error(e.to_string()))?;

        if local_name(&xot, project) != Some("project") {
            return Err(parse_error(format!(
                "expected <project> root, found <{}>",
                local_name(&xot, project).unwrap_or_default()
            )));
        }

        Ok(read_project(&xot, project, path))
    }

    /// Directory containing the descriptor file.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Module names from `<modules>` and every profile, de-duplicated.
    ///
    /// The order is first occurrence: top-level modules, then each profile's
    /// modules in document order.
    pub fn all_modules(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.modules
            .iter()
            .chain(self.profiles.iter().flat_map(|p| p.modules.iter()))
            .filter(|m| seen.insert(m.as_str()))
            .cloned()
            .collect()
    }

    /// Expected descriptor path for a declared module.
    pub fn module_path(&self, module: &str) -> PathBuf {
        let dir = self.directory().join(module);
        if module.ends_with(".xml") {
            dir
        } else {
            dir.join(DESCRIPTOR_FILE_NAME)
        }
    }

    /// `groupId:artifactId:version` label, falling back to the parent's
    /// coordinates for inherited parts.
    pub fn display_name(&self) -> String {
        let parent = self.parent.as_ref();
        let group = self
            .group_id
            .as_deref()
            .or(parent.map(|p| p.group_id.as_str()))
            .unwrap_or("?");
        let version = self
            .version
            .as_deref()
            .or(parent.map(|p| p.version.as_str()))
            .unwrap_or("?");
        format!("{}:{}:{}", group, self.artifact_id, version)
    }
}

fn read_project(xot: &Xot, project: Node, path: &Path) -> Descriptor {
    let build = child_element(xot, project, "build");

    Descriptor {
        path: path.to_path_buf(),
        group_id: child_text(xot, project, "groupId"),
        artifact_id: child_text(xot, project, "artifactId").unwrap_or_default(),
        version: child_text(xot, project, "version"),
        packaging: child_text(xot, project, "packaging"),
        parent: child_element(xot, project, "parent").map(|p| read_parent(xot, p)),
        properties: child_element(xot, project, "properties")
            .map(|p| read_properties(xot, p))
            .unwrap_or_default(),
        dependencies: read_dependencies(xot, child_element(xot, project, "dependencies")),
        dependency_management: read_dependencies(
            xot,
            descend(xot, project, &["dependencyManagement", "dependencies"]),
        ),
        plugins: read_plugins(xot, build.and_then(|b| child_element(xot, b, "plugins"))),
        plugin_management: read_plugins(
            xot,
            build.and_then(|b| descend(xot, b, &["pluginManagement", "plugins"])),
        ),
        modules: read_modules(xot, child_element(xot, project, "modules")),
        profiles: descend(xot, project, &["profiles"])
            .map(|profiles| {
                child_elements(xot, profiles, "profile")
                    .map(|profile| Profile {
                        id: child_text(xot, profile, "id"),
                        modules: read_modules(xot, child_element(xot, profile, "modules")),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn read_parent(xot: &Xot, node: Node) -> ParentReference {
    ParentReference {
        group_id: child_text(xot, node, "groupId").unwrap_or_default(),
        artifact_id: child_text(xot, node, "artifactId").unwrap_or_default(),
        version: child_text(xot, node, "version").unwrap_or_default(),
        relative_path: child_text(xot, node, "relativePath"),
    }
}

fn read_properties(xot: &Xot, node: Node) -> Properties {
    element_children(xot, node)
        .into_iter()
        .filter_map(|child| {
            let name = local_name(xot, child)?;
            Some((name.to_string(), text_of(xot, child)))
        })
        .collect()
}

pub(crate) fn read_dependency(xot: &Xot, node: Node) -> Dependency {
    Dependency {
        group_id: child_text(xot, node, "groupId").unwrap_or_default(),
        artifact_id: child_text(xot, node, "artifactId").unwrap_or_default(),
        version: child_text(xot, node, "version"),
        scope: child_text(xot, node, "scope"),
        r#type: child_text(xot, node, "type"),
        classifier: child_text(xot, node, "classifier"),
        optional: child_text(xot, node, "optional").map(|v| v.eq_ignore_ascii_case("true")),
        exclusions: child_element(xot, node, "exclusions")
            .map(|exclusions| {
                child_elements(xot, exclusions, "exclusion")
                    .map(|e| Exclusion {
                        group_id: child_text(xot, e, "groupId").unwrap_or_default(),
                        artifact_id: child_text(xot, e, "artifactId").unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn read_dependencies(xot: &Xot, container: Option<Node>) -> Vec<Dependency> {
    container
        .map(|c| {
            child_elements(xot, c, "dependency")
                .map(|d| read_dependency(xot, d))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn read_plugin(xot: &Xot, node: Node) -> Plugin {
    Plugin {
        group_id: child_text(xot, node, "groupId"),
        artifact_id: child_text(xot, node, "artifactId").unwrap_or_default(),
        version: child_text(xot, node, "version"),
    }
}

fn read_plugins(xot: &Xot, container: Option<Node>) -> Vec<Plugin> {
    container
        .map(|c| {
            child_elements(xot, c, "plugin")
                .map(|p| read_plugin(xot, p))
                .collect()
        })
        .unwrap_or_default()
}

fn read_modules(xot: &Xot, container: Option<Node>) -> Vec<String> {
    container
        .map(|c| {
            child_elements(xot, c, "module")
                .map(|m| text_of(xot, m))
                .filter(|m| !m.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

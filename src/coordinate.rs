//! Artifact coordinates as understood by the artifact resolver.
//!
//! A coordinate is the `groupId:artifactId[:type[:classifier]]:version`
//! address of a single file in an artifact repository. Descriptor-level
//! types ([`Dependency`](crate::model::Dependency),
//! [`ParentReference`](crate::model::ParentReference)) convert into it
//! through explicitly named functions rather than implicit conversions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default artifact type when a coordinate or dependency does not name one.
pub const DEFAULT_TYPE: &str = "jar";

/// A fully qualified artifact address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    /// Artifact type, which doubles as the file extension (`jar`, `pom`, ...).
    pub r#type: String,
    pub classifier: Option<String>,
    pub version: String,
}

impl ArtifactCoordinate {
    pub fn new(group_id: &str, artifact_id: &str, r#type: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            r#type: r#type.to_string(),
            classifier: None,
            version: version.to_string(),
        }
    }

    /// The coordinate of the descriptor that describes this artifact.
    pub fn pom(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self::new(group_id, artifact_id, "pom", version)
    }

    pub fn with_classifier(mut self, classifier: Option<String>) -> Self {
        self.classifier = classifier.filter(|c| !c.is_empty());
        self
    }

    pub fn with_version(&self, version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..self.clone()
        }
    }

    /// The same artifact's descriptor (`type` = `pom`, no classifier).
    pub fn to_pom(&self) -> Self {
        Self::pom(&self.group_id, &self.artifact_id, &self.version)
    }

    /// File extension used on disk for this artifact's type.
    pub fn extension(&self) -> &str {
        match self.r#type.as_str() {
            "pom" => "pom",
            "test-jar" | "maven-plugin" | "ejb" | "ejb-client" | "bundle" => "jar",
            other => other,
        }
    }

    /// Classifier used on disk, accounting for types that imply one.
    pub fn effective_classifier(&self) -> Option<&str> {
        match (self.classifier.as_deref(), self.r#type.as_str()) {
            (Some(c), _) => Some(c),
            (None, "test-jar") => Some("tests"),
            (None, "ejb-client") => Some("client"),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(classifier) => write!(
                f,
                "{}:{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.r#type, classifier, self.version
            ),
            None => write!(
                f,
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.r#type, self.version
            ),
        }
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::InvalidCoordinate {
                coordinate: s.to_string(),
                message: "empty segment".to_string(),
            });
        }

        match parts.as_slice() {
            [g, a, v] => Ok(Self::new(g, a, DEFAULT_TYPE, v)),
            [g, a, t, v] => Ok(Self::new(g, a, t, v)),
            [g, a, t, c, v] => Ok(Self::new(g, a, t, v).with_classifier(Some(c.to_string()))),
            _ => Err(Error::InvalidCoordinate {
                coordinate: s.to_string(),
                message: format!("expected 3 to 5 segments, found {}", parts.len()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_four_segments() {
        let coordinate: ArtifactCoordinate = "org.example:parent:pom:1.0".parse().unwrap();
        assert_eq!(coordinate.group_id, "org.example");
        assert_eq!(coordinate.artifact_id, "parent");
        assert_eq!(coordinate.r#type, "pom");
        assert_eq!(coordinate.version, "1.0");
        assert_eq!(coordinate.to_string(), "org.example:parent:pom:1.0");
    }

    #[test]
    fn test_parse_defaults_type_to_jar() {
        let coordinate: ArtifactCoordinate = "org.example:lib:2.1".parse().unwrap();
        assert_eq!(coordinate.r#type, "jar");
    }

    #[test]
    fn test_parse_with_classifier() {
        let coordinate: ArtifactCoordinate = "org.example:lib:jar:sources:2.1".parse().unwrap();
        assert_eq!(coordinate.classifier.as_deref(), Some("sources"));
        assert_eq!(coordinate.to_string(), "org.example:lib:jar:sources:2.1");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("org.example".parse::<ArtifactCoordinate>().is_err());
        assert!("org.example::1.0".parse::<ArtifactCoordinate>().is_err());
        assert!("a:b:c:d:e:f".parse::<ArtifactCoordinate>().is_err());
    }

    #[test]
    fn test_test_jar_maps_to_tests_classifier() {
        let coordinate = ArtifactCoordinate::new("g", "a", "test-jar", "1");
        assert_eq!(coordinate.extension(), "jar");
        assert_eq!(coordinate.effective_classifier(), Some("tests"));
    }
}

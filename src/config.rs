//! # Resolver Configuration
//!
//! Settings for the artifact resolver, read from an optional YAML file:
//!
//! ```yaml
//! local_repository: /opt/maven/repository
//! cache_file: /tmp/pom-tree-cache.json
//! ```
//!
//! Every field is optional. Unset fields fall back to the values in
//! [`crate::defaults`]. The binary layers CLI flags and environment
//! variables on top with [`ResolverConfig::with_overrides`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults::{default_cache_file, default_local_repository};
use crate::error::{Error, Result};

/// Where artifacts are looked up and where resolution results are cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Root of a Maven-layout local repository.
    #[serde(default)]
    pub local_repository: Option<PathBuf>,
    /// JSON file backing the resolution cache.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
}

impl ResolverConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            hint: None,
        })?;
        parse(&content)
    }

    /// Replace fields with values given on the command line or in the
    /// environment.
    pub fn with_overrides(
        mut self,
        local_repository: Option<PathBuf>,
        cache_file: Option<PathBuf>,
    ) -> Self {
        if local_repository.is_some() {
            self.local_repository = local_repository;
        }
        if cache_file.is_some() {
            self.cache_file = cache_file;
        }
        self
    }

    pub fn local_repository_path(&self) -> PathBuf {
        self.local_repository
            .clone()
            .unwrap_or_else(default_local_repository)
    }

    pub fn cache_file_path(&self) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(default_cache_file)
    }
}

/// Parse configuration YAML. An empty document is the default configuration.
pub fn parse(yaml_content: &str) -> Result<ResolverConfig> {
    if yaml_content.trim().is_empty() {
        return Ok(ResolverConfig::default());
    }
    serde_yaml::from_str(yaml_content).map_err(|e| Error::Config {
        message: e.to_string(),
        hint: Some("known keys are local_repository and cache_file".to_string()),
    })
}

//! # Artifact Resolution Service
//!
//! The merge engine needs exactly one thing from the outside world: a local
//! file for a `groupId:artifactId:type:version` coordinate, used to fetch
//! remote parents and imported BOMs. That need is expressed by the
//! [`ArtifactResolver`] trait, so the engine can be driven by any backend and
//! by in-memory fakes in tests.
//!
//! ## Implementations
//!
//! - **`LocalRepository`**: answers from a directory laid out like a Maven
//!   local repository
//!   (`<root>/<group/path>/<artifactId>/<version>/<artifactId>-<version>[-classifier].<ext>`).
//!   Version-range and transitive-closure results can be memoized in a
//!   [`ResolutionCache`].
//!
//! Network retrieval is out of scope. A resolver that downloads artifacts
//! would implement the same trait.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::cache::ResolutionCache;
use crate::config::ResolverConfig;
use crate::coordinate::ArtifactCoordinate;
use crate::error::{Error, Result};
use crate::management::ManagedDependencies;
use crate::model::{Dependency, Exclusion};
use crate::resolution::ResolutionPass;
use crate::version::VersionRange;

/// Scopes that travel along transitive edges.
const TRANSITIVE_SCOPES: &[&str] = &["compile", "runtime"];

/// Resolves artifact coordinates to local files.
pub trait ArtifactResolver: Send + Sync {
    /// Return a local file for `coordinate`, or an error if none exists.
    fn resolve_artifact(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf>;

    /// The dependency itself followed by its transitive closure, nearest first.
    ///
    /// `managed_overrides` pins versions of transitive artifacts by
    /// management key.
    fn resolve_transitive_dependencies(
        &self,
        dependency: &Dependency,
        managed_overrides: &ManagedDependencies,
    ) -> Result<Vec<(ArtifactCoordinate, PathBuf)>>;

    /// Available versions matching the range in `pattern.version`, oldest first.
    fn resolve_version_range(&self, pattern: &ArtifactCoordinate) -> Result<Vec<String>>;
}

/// Resolver backed by a Maven-layout directory.
#[derive(Debug)]
pub struct LocalRepository {
    root: PathBuf,
    cache: Option<ResolutionCache>,
}

impl LocalRepository {
    pub fn new(root: PathBuf) -> Self {
        Self { root, cache: None }
    }

    pub fn with_cache(mut self, cache: ResolutionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build a resolver from configuration, with its on-disk cache.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.local_repository_path())
            .with_cache(ResolutionCache::new(config.cache_file_path()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, group_id: &str, artifact_id: &str) -> PathBuf {
        group_id
            .split('.')
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
            .join(artifact_id)
    }

    /// Where `coordinate` lives in this repository, whether or not it exists.
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        let file_name = match coordinate.effective_classifier() {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                coordinate.artifact_id,
                coordinate.version,
                classifier,
                coordinate.extension()
            ),
            None => format!(
                "{}-{}.{}",
                coordinate.artifact_id,
                coordinate.version,
                coordinate.extension()
            ),
        };
        self.artifact_dir(&coordinate.group_id, &coordinate.artifact_id)
            .join(&coordinate.version)
            .join(file_name)
    }

    fn cached<T, F>(&self, key: &str, compute: F) -> Result<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let Some(cache) = &self.cache else {
            return compute();
        };
        if let Some(hit) = cache.get(key)? {
            return Ok(hit);
        }
        let value = compute()?;
        cache.put(key, &value)?;
        Ok(value)
    }

    fn collect_transitive(
        &self,
        dependency: &Dependency,
        managed_overrides: &ManagedDependencies,
    ) -> Result<Vec<(ArtifactCoordinate, PathBuf)>> {
        let mut pass = ResolutionPass::new(self);
        let mut resolved = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut queue: VecDeque<(Dependency, Vec<Exclusion>)> = VecDeque::new();

        seen.insert((dependency.group_id.clone(), dependency.artifact_id.clone()));
        queue.push_back((dependency.clone(), dependency.exclusions.clone()));

        while let Some((current, exclusions)) = queue.pop_front() {
            let coordinate = current.coordinate().ok_or_else(|| Error::ArtifactResolution {
                coordinate: current.management_key().to_string(),
                message: "no version declared or managed".to_string(),
            })?;
            let path = self.resolve_artifact(&coordinate)?;
            resolved.push((coordinate.clone(), path.clone()));

            let pom_path = if coordinate.r#type == "pom" {
                path
            } else {
                match self.resolve_artifact(&coordinate.to_pom()) {
                    Ok(pom_path) => pom_path,
                    Err(e) => {
                        warn!("{}: no descriptor, not expanding: {}", coordinate, e);
                        continue;
                    }
                }
            };
            let descriptor = match pass.load(&pom_path) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!("{}: unreadable descriptor, not expanding: {}", coordinate, e);
                    continue;
                }
            };

            for mut child in pass.resolved_dependencies(&descriptor) {
                let scope = child.scope.as_deref().unwrap_or("compile");
                if !TRANSITIVE_SCOPES.contains(&scope) || child.is_optional() {
                    continue;
                }
                if exclusions
                    .iter()
                    .any(|e| e.matches(&child.group_id, &child.artifact_id))
                {
                    debug!("{}: excluded {}:{}", coordinate, child.group_id, child.artifact_id);
                    continue;
                }
                if !seen.insert((child.group_id.clone(), child.artifact_id.clone())) {
                    continue;
                }
                if let Some(pinned) = managed_overrides
                    .get(&child.management_key())
                    .and_then(|m| m.version.clone())
                {
                    child.version = Some(pinned);
                }
                let mut inherited = exclusions.clone();
                inherited.extend(child.exclusions.iter().cloned());
                queue.push_back((child, inherited));
            }
        }

        Ok(resolved)
    }
}

impl ArtifactResolver for LocalRepository {
    fn resolve_artifact(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf> {
        let path = self.artifact_path(coordinate);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::ArtifactResolution {
                coordinate: coordinate.to_string(),
                message: format!("not found at {}", path.display()),
            })
        }
    }

    fn resolve_transitive_dependencies(
        &self,
        dependency: &Dependency,
        managed_overrides: &ManagedDependencies,
    ) -> Result<Vec<(ArtifactCoordinate, PathBuf)>> {
        let mut dependency = dependency.clone();
        if let Some(pinned) = managed_overrides.get(&dependency.management_key()) {
            dependency = dependency.with_management(pinned);
        }

        if !managed_overrides.is_empty() {
            return self.collect_transitive(&dependency, managed_overrides);
        }
        let key = match dependency.coordinate() {
            Some(coordinate) => format!("deps:{}", coordinate),
            None => return self.collect_transitive(&dependency, managed_overrides),
        };
        self.cached(&key, || self.collect_transitive(&dependency, managed_overrides))
    }

    fn resolve_version_range(&self, pattern: &ArtifactCoordinate) -> Result<Vec<String>> {
        let range = VersionRange::parse(&pattern.version)?;
        let key = format!(
            "range:{}:{}:{}",
            pattern.group_id, pattern.artifact_id, pattern.version
        );
        self.cached(&key, || {
            let dir = self.artifact_dir(&pattern.group_id, &pattern.artifact_id);
            if !dir.is_dir() {
                return Ok(Vec::new());
            }
            let mut available = Vec::new();
            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| Error::ArtifactResolution {
                    coordinate: pattern.to_string(),
                    message: e.to_string(),
                })?;
                if entry.file_type().is_dir() {
                    available.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(range.select(available.iter().map(String::as_str)))
        })
    }
}

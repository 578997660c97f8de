//! # Resolution Pass
//!
//! A [`ResolutionPass`] is one logical resolution over a set of descriptors.
//! It owns the memo tables for every derived view (loaded descriptors,
//! parents, properties, managed dependencies, managed plugins). All tables
//! are keyed by canonical file path and filled lazily on first access.
//!
//! ## Resolve-once
//!
//! The memo tables are never invalidated. If a caller mutates a descriptor
//! after its views were computed, the pass keeps serving the old views.
//! Start a new pass (see [`crate::discovery::discover`]) for a fresh view.
//!
//! ## Failure model
//!
//! Nothing here returns an error. A parent that cannot be found locally or
//! through the [`ArtifactResolver`] is absent, and the descriptor acts as a
//! root ancestor. An import that cannot be resolved contributes nothing.
//! Cycles in parent chains or imports are logged and cut at the repeat.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::coordinate::ArtifactCoordinate;
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::management::{self, ManagedDependencies, ManagedPlugins};
use crate::model::{Dependency, Plugin};
use crate::properties::{self, Properties};
use crate::resolver::ArtifactResolver;

/// Memoized effective-model computations for one pass.
pub struct ResolutionPass<'r> {
    resolver: &'r dyn ArtifactResolver,
    descriptors: HashMap<PathBuf, Arc<Descriptor>>,
    local_parents: HashMap<PathBuf, Option<Arc<Descriptor>>>,
    parents: HashMap<PathBuf, Option<Arc<Descriptor>>>,
    properties: HashMap<PathBuf, Arc<Properties>>,
    managed_dependencies: HashMap<PathBuf, Arc<ManagedDependencies>>,
    managed_plugins: HashMap<PathBuf, Arc<ManagedPlugins>>,
    in_progress: HashSet<(View, PathBuf)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum View {
    Parent,
    Properties,
    ManagedDependencies,
    ManagedPlugins,
}

impl<'r> ResolutionPass<'r> {
    pub fn new(resolver: &'r dyn ArtifactResolver) -> Self {
        Self {
            resolver,
            descriptors: HashMap::new(),
            local_parents: HashMap::new(),
            parents: HashMap::new(),
            properties: HashMap::new(),
            managed_dependencies: HashMap::new(),
            managed_plugins: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn resolver(&self) -> &'r dyn ArtifactResolver {
        self.resolver
    }

    /// Load a descriptor, reusing the instance already loaded for its path.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Descriptor>> {
        let canonical = path.canonicalize()?;
        if let Some(descriptor) = self.descriptors.get(&canonical) {
            return Ok(Arc::clone(descriptor));
        }
        let descriptor = Arc::new(Descriptor::load(&canonical)?);
        self.descriptors
            .insert(canonical, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Register an in-memory descriptor so later lookups by path reuse it.
    pub fn register(&mut self, descriptor: Descriptor) -> Arc<Descriptor> {
        let descriptor = Arc::new(descriptor);
        self.descriptors
            .insert(descriptor.path.clone(), Arc::clone(&descriptor));
        descriptor
    }

    /// The parent found next to `descriptor` on disk, if it is the right one.
    ///
    /// The candidate is `relativePath` (default `../pom.xml`) resolved against
    /// the descriptor's directory. It is accepted only when its artifactId
    /// equals the declared parent artifactId.
    pub fn local_parent(&mut self, descriptor: &Descriptor) -> Option<Arc<Descriptor>> {
        if let Some(cached) = self.local_parents.get(&descriptor.path) {
            return cached.clone();
        }

        let found = descriptor.parent.as_ref().and_then(|reference| {
            let candidate = descriptor
                .directory()
                .join(reference.descriptor_relative_path());
            match self.load(&candidate) {
                Ok(parent) if parent.artifact_id == reference.artifact_id => Some(parent),
                Ok(parent) => {
                    debug!(
                        "{}: local parent candidate {} has artifactId '{}', expected '{}'",
                        descriptor.path.display(),
                        candidate.display(),
                        parent.artifact_id,
                        reference.artifact_id
                    );
                    None
                }
                Err(e) => {
                    debug!(
                        "{}: no local parent at {}: {}",
                        descriptor.path.display(),
                        candidate.display(),
                        e
                    );
                    None
                }
            }
        });

        self.local_parents
            .insert(descriptor.path.clone(), found.clone());
        found
    }

    /// The local parent, else the parent fetched through the resolver.
    pub fn parent(&mut self, descriptor: &Descriptor) -> Option<Arc<Descriptor>> {
        if let Some(cached) = self.parents.get(&descriptor.path) {
            return cached.clone();
        }
        if !self.enter(View::Parent, descriptor) {
            return None;
        }

        let found = match self.local_parent(descriptor) {
            Some(parent) => Some(parent),
            None => descriptor
                .parent
                .as_ref()
                .and_then(|reference| self.fetch(&reference.pom_coordinate(), descriptor)),
        };

        let found = found.filter(|parent| {
            let is_self = parent.path == descriptor.path;
            if is_self {
                warn!("{}: descriptor names itself as parent", descriptor.path.display());
            }
            !is_self
        });

        self.leave(View::Parent, descriptor);
        self.parents.insert(descriptor.path.clone(), found.clone());
        found
    }

    /// Ancestors from the immediate parent up to the root ancestor.
    pub fn ancestors(&mut self, descriptor: &Descriptor) -> Vec<Arc<Descriptor>> {
        let mut chain: Vec<Arc<Descriptor>> = Vec::new();
        let mut current = self.parent(descriptor);
        while let Some(parent) = current {
            if parent.path == descriptor.path || chain.iter().any(|seen| seen.path == parent.path) {
                warn!(
                    "{}: parent chain cycles back to {}",
                    descriptor.path.display(),
                    parent.path.display()
                );
                break;
            }
            current = self.parent(&parent);
            chain.push(parent);
        }
        chain
    }

    /// Cascaded and substituted properties of `descriptor`.
    pub fn properties(&mut self, descriptor: &Descriptor) -> Arc<Properties> {
        if let Some(cached) = self.properties.get(&descriptor.path) {
            return Arc::clone(cached);
        }
        if !self.enter(View::Properties, descriptor) {
            return Arc::new(properties::cascade(descriptor, None));
        }

        let parent = self.parent(descriptor);
        let inherited = parent.map(|p| self.properties(&p));
        let resolved = Arc::new(properties::cascade(descriptor, inherited.as_deref()));

        self.leave(View::Properties, descriptor);
        self.properties
            .insert(descriptor.path.clone(), Arc::clone(&resolved));
        resolved
    }

    /// Effective dependency management, including imported BOMs.
    pub fn managed_dependencies(&mut self, descriptor: &Descriptor) -> Arc<ManagedDependencies> {
        if let Some(cached) = self.managed_dependencies.get(&descriptor.path) {
            return Arc::clone(cached);
        }
        if !self.enter(View::ManagedDependencies, descriptor) {
            return Arc::new(ManagedDependencies::new());
        }

        let properties = self.properties(descriptor);
        let inherited = self
            .parent(descriptor)
            .map(|p| self.managed_dependencies(&p));

        let mut managed = management::overlay_managed_dependencies(
            inherited.as_deref(),
            &descriptor.dependency_management,
            &properties,
        );

        let imports =
            management::import_entries(&managed, &descriptor.dependency_management, &properties);
        for import in imports {
            if let Some(imported) = self.import(&import, descriptor) {
                management::splice_import(&mut managed, &imported);
            }
        }

        self.leave(View::ManagedDependencies, descriptor);
        let managed = Arc::new(managed);
        self.managed_dependencies
            .insert(descriptor.path.clone(), Arc::clone(&managed));
        managed
    }

    /// Declared dependencies with management applied, in declaration order.
    pub fn resolved_dependencies(&mut self, descriptor: &Descriptor) -> Vec<Dependency> {
        let properties = self.properties(descriptor);
        let managed = self.managed_dependencies(descriptor);
        management::resolve_dependencies(&descriptor.dependencies, &managed, &properties)
    }

    /// Effective plugin management.
    pub fn managed_plugins(&mut self, descriptor: &Descriptor) -> Arc<ManagedPlugins> {
        if let Some(cached) = self.managed_plugins.get(&descriptor.path) {
            return Arc::clone(cached);
        }
        if !self.enter(View::ManagedPlugins, descriptor) {
            return Arc::new(ManagedPlugins::new());
        }

        let properties = self.properties(descriptor);
        let inherited = self.parent(descriptor).map(|p| self.managed_plugins(&p));
        let managed = Arc::new(management::overlay_managed_plugins(
            inherited.as_deref(),
            &descriptor.plugin_management,
            &properties,
        ));

        self.leave(View::ManagedPlugins, descriptor);
        self.managed_plugins
            .insert(descriptor.path.clone(), Arc::clone(&managed));
        managed
    }

    /// Declared build plugins with plugin management applied.
    pub fn resolved_plugins(&mut self, descriptor: &Descriptor) -> Vec<Plugin> {
        let properties = self.properties(descriptor);
        let managed = self.managed_plugins(descriptor);
        management::resolve_plugins(&descriptor.plugins, &managed, &properties)
    }

    fn import(
        &mut self,
        import: &Dependency,
        importer: &Descriptor,
    ) -> Option<Arc<ManagedDependencies>> {
        let Some(coordinate) = import.pom_coordinate() else {
            warn!(
                "{}: import of {} has no version, skipping",
                importer.path.display(),
                import.management_key()
            );
            return None;
        };
        let bom = self.fetch(&coordinate, importer)?;
        Some(self.managed_dependencies(&bom))
    }

    fn fetch(
        &mut self,
        coordinate: &ArtifactCoordinate,
        requester: &Descriptor,
    ) -> Option<Arc<Descriptor>> {
        let path = match self.resolver.resolve_artifact(coordinate) {
            Ok(path) => path,
            Err(e) => {
                warn!("{}: cannot resolve {}: {}", requester.path.display(), coordinate, e);
                return None;
            }
        };
        match self.load(&path) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("{}: cannot load {}: {}", requester.path.display(), coordinate, e);
                None
            }
        }
    }

    fn enter(&mut self, view: View, descriptor: &Descriptor) -> bool {
        let fresh = self.in_progress.insert((view, descriptor.path.clone()));
        if !fresh {
            warn!(
                "cycle while computing {:?} of {}, cutting it",
                view,
                descriptor.path.display()
            );
        }
        fresh
    }

    fn leave(&mut self, view: View, descriptor: &Descriptor) {
        self.in_progress.remove(&(view, descriptor.path.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::MapResolver;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    const PARENT: &str = r#"<project>
  <groupId>org.example</groupId>
  <artifactId>parent</artifactId>
  <version>1.0</version>
  <properties>
    <aether.version>1.0.2.v20150114</aether.version>
    <shared>parent</shared>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.eclipse.aether</groupId>
        <artifactId>aether-api</artifactId>
        <version>${aether.version}</version>
        <scope>provided</scope>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>"#;

    const CHILD: &str = r#"<project>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>1.0</version>
  </parent>
  <artifactId>child</artifactId>
  <properties>
    <shared>child</shared>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.eclipse.aether</groupId>
      <artifactId>aether-api</artifactId>
    </dependency>
  </dependencies>
</project>"#;

    #[test]
    fn test_local_parent_cascade() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "pom.xml", PARENT);
        let child_path = write(temp.path(), "child/pom.xml", CHILD);

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let child = pass.load(&child_path).unwrap();

        let parent = pass.parent(&child).unwrap();
        assert_eq!(parent.artifact_id, "parent");

        let properties = pass.properties(&child);
        assert_eq!(properties["shared"], "child");
        assert_eq!(properties["project.version"], "1.0");
        assert_eq!(properties["project.groupId"], "org.example");

        let resolved = pass.resolved_dependencies(&child);
        assert_eq!(resolved[0].version.as_deref(), Some("1.0.2.v20150114"));
        assert_eq!(resolved[0].scope.as_deref(), Some("provided"));
    }

    #[test]
    fn test_local_parent_with_wrong_artifact_id_falls_back_to_resolver() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pom.xml",
            &PARENT.replace(
                "<artifactId>parent</artifactId>",
                "<artifactId>aggregator</artifactId>",
            ),
        );
        let remote = write(temp.path(), "repo/parent-1.0.pom", PARENT);
        let child_path = write(temp.path(), "child/pom.xml", CHILD);

        let resolver = MapResolver::default().with("org.example:parent:pom:1.0", remote);
        let mut pass = ResolutionPass::new(&resolver);
        let child = pass.load(&child_path).unwrap();

        assert!(pass.local_parent(&child).is_none());
        let parent = pass.parent(&child).unwrap();
        assert!(parent.path.ends_with("repo/parent-1.0.pom"));
    }

    #[test]
    fn test_unresolved_parent_acts_as_root() {
        let temp = TempDir::new().unwrap();
        let child_path = write(temp.path(), "child/pom.xml", CHILD);

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let child = pass.load(&child_path).unwrap();

        assert!(pass.parent(&child).is_none());
        let properties = pass.properties(&child);
        assert_eq!(properties["shared"], "child");
        assert_eq!(properties["project.version"], "1.0");
        assert!(pass.managed_dependencies(&child).is_empty());
        assert_eq!(pass.resolved_dependencies(&child)[0].version, None);
    }

    #[test]
    fn test_import_fills_only_missing_keys() {
        let temp = TempDir::new().unwrap();
        let bom = write(
            temp.path(),
            "repo/bom-2.0.pom",
            r#"<project>
  <groupId>org.example</groupId>
  <artifactId>bom</artifactId>
  <version>2.0</version>
  <dependencyManagement>
    <dependencies>
      <dependency><groupId>org.example</groupId><artifactId>a</artifactId><version>bom</version></dependency>
      <dependency><groupId>org.example</groupId><artifactId>b</artifactId><version>bom</version></dependency>
    </dependencies>
  </dependencyManagement>
</project>"#,
        );
        let root = write(
            temp.path(),
            "app/pom.xml",
            r#"<project>
  <groupId>org.example</groupId>
  <artifactId>app</artifactId>
  <version>1</version>
  <dependencyManagement>
    <dependencies>
      <dependency><groupId>org.example</groupId><artifactId>bom</artifactId><version>2.0</version><type>pom</type><scope>import</scope></dependency>
      <dependency><groupId>org.example</groupId><artifactId>missing-bom</artifactId><version>1</version><type>pom</type><scope>import</scope></dependency>
      <dependency><groupId>org.example</groupId><artifactId>a</artifactId><version>local</version></dependency>
    </dependencies>
  </dependencyManagement>
</project>"#,
        );

        let resolver = MapResolver::default().with("org.example:bom:pom:2.0", bom);
        let mut pass = ResolutionPass::new(&resolver);
        let app = pass.load(&root).unwrap();
        let managed = pass.managed_dependencies(&app);

        let version = |artifact: &str| {
            managed
                .values()
                .find(|d| d.artifact_id == artifact)
                .and_then(|d| d.version.clone())
        };
        assert_eq!(version("a").as_deref(), Some("local"));
        assert_eq!(version("b").as_deref(), Some("bom"));
    }

    #[test]
    fn test_parent_cycle_is_cut() {
        let temp = TempDir::new().unwrap();
        let a = write(
            temp.path(),
            "a/pom.xml",
            r#"<project><parent><groupId>g</groupId><artifactId>b</artifactId><version>1</version><relativePath>../b</relativePath></parent><artifactId>a</artifactId></project>"#,
        );
        write(
            temp.path(),
            "b/pom.xml",
            r#"<project><parent><groupId>g</groupId><artifactId>a</artifactId><version>1</version><relativePath>../a</relativePath></parent><artifactId>b</artifactId></project>"#,
        );

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let descriptor = pass.load(&a).unwrap();

        let properties = pass.properties(&descriptor);
        assert_eq!(properties["project.artifactId"], "a");
        assert_eq!(pass.ancestors(&descriptor).len(), 1);
    }

    #[test]
    fn test_views_are_memoized_per_pass() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "pom.xml", PARENT);

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let descriptor = pass.load(&path).unwrap();

        let first = pass.properties(&descriptor);
        let second = pass.properties(&descriptor);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&descriptor, &pass.load(&path).unwrap()));
    }
}

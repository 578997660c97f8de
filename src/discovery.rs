//! # Multi-Module Discovery
//!
//! Builds a [`ProjectTree`] from a root descriptor by following module
//! declarations recursively.
//!
//! ## Process
//!
//! 1.  **Root**: the root descriptor is loaded through the
//!     [`ResolutionPass`]. Failing to read or parse it fails discovery.
//!
//! 2.  **Modules**: every descriptor contributes the modules from its
//!     top-level `<modules>` and from each profile, de-duplicated in
//!     first-occurrence order. Each module is visited depth-first in
//!     declaration order. A module that cannot be read or parsed is skipped
//!     together with its subtree, with a warning. A path that was already
//!     visited is not visited twice, which also cuts module cycles.
//!
//! 3.  **Unprocessed parents**: the local parent of every tree member is
//!     computed. Parents that module declarations never reached are recorded
//!     separately so a transformation can still see (and rewrite) them.
//!
//! Each call should be given a fresh pass; see [`crate::resolution`] for why.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::resolution::ResolutionPass;

/// A descriptor and the modules it declares.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub descriptor: Arc<Descriptor>,
    pub children: Vec<ModuleNode>,
}

impl ModuleNode {
    fn new(descriptor: Arc<Descriptor>) -> Self {
        Self {
            descriptor,
            children: Vec::new(),
        }
    }

    /// Number of descriptors in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ModuleNode::count).sum::<usize>()
    }
}

/// Everything one discovery pass found.
#[derive(Debug, Clone)]
pub struct ProjectTree {
    pub root: Arc<Descriptor>,
    /// Module descriptors below the root, depth-first in declaration order.
    pub modules: Vec<Arc<Descriptor>>,
    /// Local parents of tree members that no module declaration reaches.
    pub unprocessed_parents: Vec<Arc<Descriptor>>,
    pub hierarchy: ModuleNode,
}

impl ProjectTree {
    /// The root followed by every discovered module.
    pub fn all(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        std::iter::once(&self.root).chain(self.modules.iter())
    }

    /// First tree member (root, modules, then unprocessed parents) with the
    /// given artifactId.
    pub fn find(&self, artifact_id: &str) -> Option<&Arc<Descriptor>> {
        self.all()
            .chain(self.unprocessed_parents.iter())
            .find(|d| d.artifact_id == artifact_id)
    }
}

/// Discover the project tree rooted at `root`.
///
/// `root` may be a descriptor file or a directory containing `pom.xml`.
pub fn discover(pass: &mut ResolutionPass<'_>, root: &Path) -> Result<ProjectTree> {
    let root_path: Cow<'_, Path> = if root.is_dir() {
        Cow::Owned(root.join(crate::descriptor::DESCRIPTOR_FILE_NAME))
    } else {
        Cow::Borrowed(root)
    };
    let root = pass.load(&root_path)?;

    let mut visited: HashSet<PathBuf> = HashSet::new();
    visited.insert(root.path.clone());
    let mut modules = Vec::new();
    let hierarchy = visit(pass, Arc::clone(&root), &mut visited, &mut modules);

    let mut unprocessed_parents = Vec::new();
    let members: Vec<Arc<Descriptor>> = std::iter::once(Arc::clone(&root))
        .chain(modules.iter().cloned())
        .collect();
    for member in members {
        if let Some(parent) = pass.local_parent(&member) {
            if visited.insert(parent.path.clone()) {
                debug!(
                    "{}: local parent {} is outside the module tree",
                    member.path.display(),
                    parent.path.display()
                );
                unprocessed_parents.push(parent);
            }
        }
    }

    Ok(ProjectTree {
        root,
        modules,
        unprocessed_parents,
        hierarchy,
    })
}

fn visit(
    pass: &mut ResolutionPass<'_>,
    descriptor: Arc<Descriptor>,
    visited: &mut HashSet<PathBuf>,
    modules: &mut Vec<Arc<Descriptor>>,
) -> ModuleNode {
    let mut node = ModuleNode::new(Arc::clone(&descriptor));

    for module in descriptor.all_modules() {
        let path = descriptor.module_path(&module);
        let child = match pass.load(&path) {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    "{}: skipping module '{}': {}",
                    descriptor.path.display(),
                    module,
                    e
                );
                continue;
            }
        };
        if !visited.insert(child.path.clone()) {
            debug!("{}: already discovered", child.path.display());
            continue;
        }
        modules.push(Arc::clone(&child));
        node.children.push(visit(pass, child, visited, modules));
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resolver::tests::MapResolver;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn module_pom(artifact: &str, modules: &str) -> String {
        format!(
            "<project><parent><groupId>g</groupId><artifactId>root</artifactId><version>1</version></parent><artifactId>{}</artifactId>{}</project>",
            artifact, modules
        )
    }

    #[test]
    fn test_discover_profile_and_top_level_module_once() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pom.xml",
            r#"<project><groupId>g</groupId><artifactId>root</artifactId><version>1</version>
  <modules><module>module1</module></modules>
  <profiles><profile><id>all</id><modules><module>module1</module><module>module2</module></modules></profile></profiles>
</project>"#,
        );
        write(temp.path(), "module1/pom.xml", &module_pom("module1", ""));
        write(temp.path(), "module2/pom.xml", &module_pom("module2", ""));

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let tree = discover(&mut pass, temp.path()).unwrap();

        let names: Vec<&str> = tree.modules.iter().map(|d| d.artifact_id.as_str()).collect();
        assert_eq!(names, vec!["module1", "module2"]);
        assert_eq!(tree.hierarchy.count(), 3);
        assert!(tree.unprocessed_parents.is_empty());
    }

    #[test]
    fn test_discover_depth_first_and_skips_broken_modules() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pom.xml",
            "<project><groupId>g</groupId><artifactId>root</artifactId><version>1</version><modules><module>a</module><module>broken</module><module>missing</module><module>b</module></modules></project>",
        );
        write(
            temp.path(),
            "a/pom.xml",
            &module_pom("a", "<modules><module>nested</module></modules>"),
        );
        write(
            temp.path(),
            "a/nested/pom.xml",
            "<project><artifactId>nested</artifactId></project>",
        );
        write(temp.path(), "broken/pom.xml", "<project><artifactId>oops</project>");
        write(temp.path(), "b/pom.xml", &module_pom("b", ""));

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let tree = discover(&mut pass, &temp.path().join("pom.xml")).unwrap();

        let names: Vec<&str> = tree.all().map(|d| d.artifact_id.as_str()).collect();
        assert_eq!(names, vec!["root", "a", "nested", "b"]);
        assert_eq!(tree.hierarchy.children[0].children[0].descriptor.artifact_id, "nested");
    }

    #[test]
    fn test_discover_records_unprocessed_parent() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pom.xml",
            "<project><groupId>g</groupId><artifactId>aggregator</artifactId><version>1</version></project>",
        );
        write(
            temp.path(),
            "app/pom.xml",
            "<project><parent><groupId>g</groupId><artifactId>aggregator</artifactId><version>1</version></parent><artifactId>app</artifactId></project>",
        );

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let tree = discover(&mut pass, &temp.path().join("app")).unwrap();

        assert!(tree.modules.is_empty());
        assert_eq!(tree.unprocessed_parents.len(), 1);
        assert_eq!(tree.unprocessed_parents[0].artifact_id, "aggregator");
        assert!(tree.find("aggregator").is_some());
    }

    #[test]
    fn test_discover_module_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "pom.xml",
            "<project><artifactId>root</artifactId><modules><module>a</module></modules></project>",
        );
        write(
            temp.path(),
            "a/pom.xml",
            "<project><artifactId>a</artifactId><modules><module>..</module></modules></project>",
        );

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        let tree = discover(&mut pass, temp.path()).unwrap();
        assert_eq!(tree.modules.len(), 1);
    }

    #[test]
    fn test_discover_root_parse_failure_is_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "pom.xml", "<project>");

        let resolver = MapResolver::default();
        let mut pass = ResolutionPass::new(&resolver);
        assert!(matches!(
            discover(&mut pass, temp.path()),
            Err(Error::DescriptorParse { .. })
        ));
    }
}

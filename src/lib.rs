//! # pom-tree Library
//!
//! This library computes the *effective* model of a tree of `pom.xml`
//! descriptors (what the build tool itself would see after inheritance,
//! property substitution and dependency/plugin management) and writes edited
//! descriptors back without disturbing their formatting. It is used by the
//! `pom-tree` command-line tool and is meant for project-transformation tools
//! that must read and rewrite large multi-module hierarchies.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::{Path, PathBuf};
//! use pom_tree::descriptor::Descriptor;
//! use pom_tree::resolution::ResolutionPass;
//! use pom_tree::resolver::LocalRepository;
//!
//! let descriptor = Descriptor::parse(
//!     Path::new("/work/app/pom.xml"),
//!     r#"<project>
//!   <artifactId>app</artifactId>
//!   <properties><aether.version>1.0.2.v20150114</aether.version></properties>
//!   <dependencyManagement><dependencies><dependency>
//!     <groupId>org.eclipse.aether</groupId>
//!     <artifactId>aether-api</artifactId>
//!     <version>${aether.version}</version>
//!   </dependency></dependencies></dependencyManagement>
//!   <dependencies><dependency>
//!     <groupId>org.eclipse.aether</groupId>
//!     <artifactId>aether-api</artifactId>
//!   </dependency></dependencies>
//! </project>"#,
//! )
//! .unwrap();
//!
//! let repository = LocalRepository::new(PathBuf::from("/nonexistent"));
//! let mut pass = ResolutionPass::new(&repository);
//! let descriptor = pass.register(descriptor);
//!
//! let dependencies = pass.resolved_dependencies(&descriptor);
//! assert_eq!(dependencies[0].version.as_deref(), Some("1.0.2.v20150114"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Descriptors (`descriptor`, `model`)**: one parsed `pom.xml` and the
//!   value types it is made of (parent reference, dependency, plugin).
//! - **Resolution (`resolution`, `properties`, `management`)**: a
//!   `ResolutionPass` memoizes parents, the property cascade and the merged
//!   dependency and plugin management per descriptor.
//! - **Discovery (`discovery`)**: follows module declarations from a root
//!   descriptor and returns a `ProjectTree`.
//! - **Persistence (`persist`, `escape`, `xml`)**: differential,
//!   format-preserving writes back to the source files.
//! - **Artifact resolution (`resolver`, `version`, `cache`, `config`)**: the
//!   `ArtifactResolver` seam and its local-repository implementation.
//!
//! ## Execution Flow
//!
//! 1.  **Discovery**: parse the root descriptor and visit its modules.
//! 2.  **Resolution**: compute effective views on demand, fetching remote
//!     parents and imported BOMs through the `ArtifactResolver`.
//! 3.  **Transformation**: the caller clones and edits descriptors.
//! 4.  **Persistence**: `persist::save` rewrites only what changed.

pub mod cache;
pub mod config;
pub mod coordinate;
pub mod defaults;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod escape;
pub mod management;
pub mod model;
pub mod persist;
pub mod properties;
pub mod resolution;
pub mod resolver;
pub mod version;
pub mod xml;

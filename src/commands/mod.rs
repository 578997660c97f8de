//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `pom-tree`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `pom_tree` library.
//!
//! Resolver settings shared by every command live in [`ResolverArgs`].

pub mod effective;
pub mod set_property;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use pom_tree::config::ResolverConfig;
use pom_tree::discovery::{self, ProjectTree};
use pom_tree::resolution::ResolutionPass;
use pom_tree::resolver::LocalRepository;

/// Where remote parents and imported BOMs are looked up.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolverArgs {
    /// Resolver configuration file (YAML).
    #[arg(long, value_name = "FILE", env = "POM_TREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the local artifact repository.
    ///
    /// Defaults to `~/.m2/repository`.
    #[arg(long, value_name = "DIR", env = "POM_TREE_LOCAL_REPOSITORY")]
    pub local_repository: Option<PathBuf>,

    /// File used to cache version-range and transitive resolution results.
    ///
    /// Defaults to the system cache directory (`~/.cache/pom-tree` on Linux).
    #[arg(long, value_name = "FILE", env = "POM_TREE_CACHE")]
    pub cache_file: Option<PathBuf>,
}

impl ResolverArgs {
    /// Configuration file values with flags and environment layered on top.
    pub fn config(&self) -> Result<ResolverConfig> {
        let base = match &self.config {
            Some(path) => ResolverConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ResolverConfig::default(),
        };
        Ok(base.with_overrides(self.local_repository.clone(), self.cache_file.clone()))
    }

    pub fn repository(&self) -> Result<LocalRepository> {
        Ok(LocalRepository::from_config(&self.config()?))
    }
}

/// Discover the project at `project` with a fresh resolution pass.
pub fn discover(pass: &mut ResolutionPass<'_>, project: &Path) -> Result<ProjectTree> {
    discovery::discover(pass, project)
        .with_context(|| format!("Failed to discover project at {}", project.display()))
}

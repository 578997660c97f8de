//! # Effective Command Implementation
//!
//! This module implements the `effective` subcommand, which prints what the
//! build tool would see for one descriptor after inheritance, property
//! substitution and dependency/plugin management.
//!
//! ## Functionality
//!
//! - **Module Selection**: the root descriptor by default, or any tree member
//!   chosen with `--module <artifactId>`
//! - **Ancestors**: the resolved parent chain, local or from the repository
//! - **Effective Views**: properties, managed dependencies, dependencies,
//!   managed plugins and plugins
//! - **JSON Output**: `--json` prints the same data as a JSON document
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use pom_tree::descriptor::Descriptor;
use pom_tree::model::{Dependency, Plugin};
use pom_tree::properties::Properties;
use pom_tree::resolution::ResolutionPass;

use super::ResolverArgs;

/// Print the effective model of a descriptor
#[derive(Args, Debug)]
pub struct EffectiveArgs {
    /// Root descriptor, or a directory containing pom.xml.
    #[arg(value_name = "PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// artifactId of the tree member to show instead of the root.
    #[arg(short, long, value_name = "ARTIFACT_ID")]
    pub module: Option<String>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub resolver: ResolverArgs,
}

/// Everything the command reports for one descriptor.
#[derive(Debug, Serialize)]
struct EffectiveModel {
    descriptor: String,
    path: PathBuf,
    ancestors: Vec<String>,
    properties: Properties,
    managed_dependencies: Vec<Dependency>,
    dependencies: Vec<Dependency>,
    managed_plugins: Vec<Plugin>,
    plugins: Vec<Plugin>,
}

impl EffectiveModel {
    fn compute(pass: &mut ResolutionPass<'_>, descriptor: &Descriptor) -> Self {
        Self {
            descriptor: descriptor.display_name(),
            path: descriptor.path.clone(),
            ancestors: pass
                .ancestors(descriptor)
                .iter()
                .map(|a| a.display_name())
                .collect(),
            properties: pass.properties(descriptor).as_ref().clone(),
            managed_dependencies: pass.managed_dependencies(descriptor).values().cloned().collect(),
            dependencies: pass.resolved_dependencies(descriptor),
            managed_plugins: pass.managed_plugins(descriptor).values().cloned().collect(),
            plugins: pass.resolved_plugins(descriptor),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "📦 {} ({})", self.descriptor, self.path.display());

        section(&mut out, "Ancestors", self.ancestors.iter().cloned());
        section(
            &mut out,
            "Properties",
            self.properties.iter().map(|(k, v)| format!("{} = {}", k, v)),
        );
        section(
            &mut out,
            "Managed dependencies",
            self.managed_dependencies.iter().map(dependency_line),
        );
        section(&mut out, "Dependencies", self.dependencies.iter().map(dependency_line));
        section(
            &mut out,
            "Managed plugins",
            self.managed_plugins.iter().map(plugin_line),
        );
        section(&mut out, "Plugins", self.plugins.iter().map(plugin_line));
        out
    }
}

fn section<I: Iterator<Item = String>>(out: &mut String, title: &str, lines: I) {
    let lines: Vec<String> = lines.collect();
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}:", title);
    for line in lines {
        let _ = writeln!(out, "  {}", line);
    }
}

fn dependency_line(dependency: &Dependency) -> String {
    let mut line = format!(
        "{} -> {}",
        dependency.management_key(),
        dependency.version.as_deref().unwrap_or("?")
    );
    if let Some(scope) = &dependency.scope {
        let _ = write!(line, " ({})", scope);
    }
    if dependency.is_optional() {
        line.push_str(" optional");
    }
    line
}

fn plugin_line(plugin: &Plugin) -> String {
    format!("{} -> {}", plugin.key(), plugin.version.as_deref().unwrap_or("?"))
}

/// Execute the `effective` command.
pub fn execute(args: EffectiveArgs) -> Result<()> {
    let repository = args.resolver.repository()?;
    let mut pass = ResolutionPass::new(&repository);
    let project_tree = super::discover(&mut pass, &args.project)?;

    let descriptor: Arc<Descriptor> = match &args.module {
        Some(artifact_id) => project_tree
            .find(artifact_id)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "No module with artifactId '{}' in {}",
                    artifact_id,
                    args.project.display()
                )
            })?,
        None => Arc::clone(&project_tree.root),
    };

    let model = EffectiveModel::compute(&mut pass, &descriptor);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        print!("{}", model.to_text());
    }
    Ok(())
}

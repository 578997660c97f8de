//! # Set-Property Command Implementation
//!
//! This module implements the `set-property` subcommand, which sets (or,
//! with `--unset`, removes) one `<properties>` entry of a descriptor and
//! saves the file in place through the round-trip persister. Everything else
//! in the file keeps its formatting.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use pom_tree::persist;
use pom_tree::resolution::ResolutionPass;
use pom_tree::xml::is_element_name;

use super::ResolverArgs;

/// Set a property in a descriptor and save it in place
#[derive(Args, Debug)]
pub struct SetPropertyArgs {
    /// Property name, e.g. `aether.version`.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// New value. Required unless `--unset` is given.
    #[arg(value_name = "VALUE", required_unless_present = "unset")]
    pub value: Option<String>,

    /// Remove the property instead of setting it.
    #[arg(long, conflicts_with = "value")]
    pub unset: bool,

    /// Root descriptor, or a directory containing pom.xml.
    #[arg(short, long, value_name = "PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// artifactId of the tree member to edit instead of the root.
    #[arg(short, long, value_name = "ARTIFACT_ID")]
    pub module: Option<String>,

    #[command(flatten)]
    pub resolver: ResolverArgs,
}

/// Execute the `set-property` command.
pub fn execute(args: SetPropertyArgs) -> Result<()> {
    if !is_element_name(&args.name) {
        bail!(
            "'{}' is not a valid property name: use letters, digits, '_', '-' or '.', starting with a letter or '_'",
            args.name
        );
    }

    let repository = args.resolver.repository()?;
    let mut pass = ResolutionPass::new(&repository);
    let project_tree = super::discover(&mut pass, &args.project)?;

    let target = match &args.module {
        Some(artifact_id) => project_tree
            .find(artifact_id)
            .ok_or_else(|| {
                anyhow!(
                    "No module with artifactId '{}' in {}",
                    artifact_id,
                    args.project.display()
                )
            })?,
        None => &project_tree.root,
    };

    let mut edited = target.as_ref().clone();
    match (&args.value, args.unset) {
        (_, true) => {
            if edited.properties.remove(&args.name).is_none() {
                println!(
                    "Property '{}' is not set in {}",
                    args.name,
                    edited.path.display()
                );
                return Ok(());
            }
        }
        (Some(value), false) => {
            edited.properties.insert(args.name.clone(), value.clone());
        }
        (None, false) => bail!("A value is required unless --unset is given"),
    }

    persist::save(&edited)
        .with_context(|| format!("Failed to save {}", edited.path.display()))?;
    println!("✅ Updated {} in {}", args.name, edited.path.display());
    Ok(())
}

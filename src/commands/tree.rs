//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays the module
//! hierarchy of a project in a tree format.
//!
//! ## Functionality
//!
//! - **Module Tree Visualization**: Displays every discovered module under the
//!   descriptor that declares it
//! - **Depth Control**: Supports `--depth` flag to limit tree depth
//! - **Outside Parents**: Lists local parents that no module declaration reaches
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::path::PathBuf;

use pom_tree::discovery::{ModuleNode, ProjectTree};
use pom_tree::resolution::ResolutionPass;

use super::ResolverArgs;

/// Display the module tree of a project
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Root descriptor, or a directory containing pom.xml.
    #[arg(value_name = "PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree.
    /// Use 0 to show only the root, 1 to show its direct modules, etc.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,

    #[command(flatten)]
    pub resolver: ResolverArgs,
}

/// Execute the `tree` command.
///
/// Discovers the project and prints its module hierarchy, followed by any
/// local parents found outside of it.
pub fn execute(args: TreeArgs) -> Result<()> {
    println!("🌳 Module tree for: {}", args.project.display());

    let repository = args.resolver.repository()?;
    let mut pass = ResolutionPass::new(&repository);
    let project_tree = super::discover(&mut pass, &args.project)?;

    let tree_root = build_tree_node(&project_tree.hierarchy, args.depth.unwrap_or(usize::MAX), 0);
    print_tree(&tree_root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;

    for line in outside_parent_lines(&project_tree) {
        println!("{}", line);
    }
    Ok(())
}

/// Build a tree node from a module node
fn build_tree_node(module: &ModuleNode, max_depth: usize, current_depth: usize) -> TreeNode {
    let descriptor = &module.descriptor;
    let label = match descriptor.packaging.as_deref() {
        Some(packaging) => format!("{} [{}]", descriptor.display_name(), packaging),
        None => descriptor.display_name(),
    };

    let children = if current_depth >= max_depth {
        vec![]
    } else {
        module
            .children
            .iter()
            .map(|child| build_tree_node(child, max_depth, current_depth + 1))
            .collect()
    };
    TreeNode { label, children }
}

fn outside_parent_lines(project_tree: &ProjectTree) -> Vec<String> {
    if project_tree.unprocessed_parents.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Parents outside the module tree:".to_string()];
    lines.extend(project_tree.unprocessed_parents.iter().map(|parent| {
        format!("  {} ({})", parent.display_name(), parent.path.display())
    }));
    lines
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}

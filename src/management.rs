//! # Management Merge Engine
//!
//! Pure merge steps for dependency and plugin management. Each function takes
//! the parent's already-computed map by reference and returns a new map; the
//! recursion over parents and imports, and the memoization of results, live
//! in [`crate::resolution::ResolutionPass`].
//!
//! ## Precedence
//!
//! - Own `<dependencyManagement>` entries override the parent's for the same
//!   [`ManagementKey`].
//! - Imported BOM entries only fill keys that are still empty. They never
//!   override local or inherited entries, and a later import never overrides
//!   an earlier one.
//! - Own `<pluginManagement>` entries override the parent's for the same
//!   [`PluginKey`]; an own entry without a version inherits the parent's.
//! - Declared dependencies and plugins keep every field they set and take
//!   unset fields from the managed entry.

use std::collections::BTreeMap;

use crate::model::{Dependency, ManagementKey, Plugin, PluginKey};
use crate::properties::Properties;

/// Effective `<dependencyManagement>` of a descriptor.
pub type ManagedDependencies = BTreeMap<ManagementKey, Dependency>;

/// Effective `<pluginManagement>` of a descriptor.
pub type ManagedPlugins = BTreeMap<PluginKey, Plugin>;

/// Overlay own managed dependencies on the parent's map.
pub fn overlay_managed_dependencies(
    parent: Option<&ManagedDependencies>,
    own: &[Dependency],
    properties: &Properties,
) -> ManagedDependencies {
    let mut managed = parent.cloned().unwrap_or_default();
    for dependency in own {
        let dependency = dependency.interpolate(properties);
        managed.insert(dependency.management_key(), dependency);
    }
    managed
}

/// Import-scope entries of `managed`, in processing order.
///
/// Entries the descriptor declares itself come first, in declaration order;
/// inherited imports follow in key order.
pub fn import_entries(
    managed: &ManagedDependencies,
    own: &[Dependency],
    properties: &Properties,
) -> Vec<Dependency> {
    let mut ordered: Vec<ManagementKey> = Vec::new();
    for dependency in own {
        let key = dependency.interpolate(properties).management_key();
        if !ordered.contains(&key) {
            ordered.push(key);
        }
    }
    for key in managed.keys() {
        if !ordered.contains(key) {
            ordered.push(key.clone());
        }
    }

    ordered
        .iter()
        .filter_map(|key| managed.get(key))
        .filter(|dependency| dependency.is_import())
        .cloned()
        .collect()
}

/// Splice an imported map beneath `managed`: only empty keys are filled.
pub fn splice_import(managed: &mut ManagedDependencies, imported: &ManagedDependencies) {
    for (key, dependency) in imported {
        managed
            .entry(key.clone())
            .or_insert_with(|| dependency.clone());
    }
}

/// Apply dependency management to declared dependencies.
pub fn resolve_dependencies(
    declared: &[Dependency],
    managed: &ManagedDependencies,
    properties: &Properties,
) -> Vec<Dependency> {
    declared
        .iter()
        .map(|dependency| {
            let dependency = dependency.interpolate(properties);
            match managed.get(&dependency.management_key()) {
                Some(entry) => dependency.with_management(entry),
                None => dependency,
            }
        })
        .collect()
}

/// Overlay own managed plugins on the parent's map.
///
/// An own entry without a version takes the version of the parent's entry
/// with the same key, when there is one.
pub fn overlay_managed_plugins(
    parent: Option<&ManagedPlugins>,
    own: &[Plugin],
    properties: &Properties,
) -> ManagedPlugins {
    let mut managed = parent.cloned().unwrap_or_default();
    for plugin in own {
        let mut plugin = plugin.interpolate(properties);
        let key = plugin.key();
        if plugin.version.is_none() {
            plugin.version = parent
                .and_then(|p| p.get(&key))
                .and_then(|inherited| inherited.version.clone());
        }
        managed.insert(key, plugin);
    }
    managed
}

/// Apply plugin management to declared build plugins.
pub fn resolve_plugins(
    declared: &[Plugin],
    managed: &ManagedPlugins,
    properties: &Properties,
) -> Vec<Plugin> {
    declared
        .iter()
        .map(|plugin| {
            let plugin = plugin.interpolate(properties);
            match managed.get(&plugin.key()) {
                Some(entry) => plugin.with_management(entry),
                None => plugin,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(artifact_id: &str, version: Option<&str>) -> Dependency {
        Dependency::new("org.example", artifact_id, version)
    }

    fn bom(artifact_id: &str, version: &str) -> Dependency {
        let mut d = dep(artifact_id, Some(version));
        d.scope = Some("import".to_string());
        d.r#type = Some("pom".to_string());
        d
    }

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_overlay_keeps_parent_keys_and_own_wins() {
        let parent = overlay_managed_dependencies(
            None,
            &[dep("a", Some("1")), dep("b", Some("1"))],
            &Properties::new(),
        );
        let child = overlay_managed_dependencies(
            Some(&parent),
            &[dep("b", Some("2")), dep("c", Some("2"))],
            &Properties::new(),
        );

        for (key, value) in &parent {
            assert!(child.contains_key(key));
            if key.artifact_id != "b" {
                assert_eq!(&child[key], value);
            }
        }
        assert_eq!(child[&dep("b", None).management_key()].version.as_deref(), Some("2"));
        assert_eq!(child.len(), 3);
    }

    #[test]
    fn test_overlay_substitutes_properties_before_keying() {
        let mut managed = dep("${artifact}", Some("${aether.version}"));
        managed.group_id = "org.eclipse.aether".to_string();
        let properties = props(&[
            ("aether.version", "1.0.2.v20150114"),
            ("artifact", "aether-api"),
        ]);

        let result = overlay_managed_dependencies(None, &[managed], &properties);
        let entry = result.values().next().unwrap();
        assert_eq!(entry.artifact_id, "aether-api");
        assert_eq!(entry.version.as_deref(), Some("1.0.2.v20150114"));
    }

    #[test]
    fn test_splice_import_never_overrides() {
        let mut managed =
            overlay_managed_dependencies(None, &[dep("a", Some("local"))], &Properties::new());
        let first =
            overlay_managed_dependencies(
                None,
                &[dep("a", Some("bom1")), dep("b", Some("bom1"))],
                &Properties::new(),
            );
        let second =
            overlay_managed_dependencies(
                None,
                &[dep("b", Some("bom2")), dep("c", Some("bom2"))],
                &Properties::new(),
            );

        splice_import(&mut managed, &first);
        splice_import(&mut managed, &second);

        let version = |a: &str| managed[&dep(a, None).management_key()].version.clone();
        assert_eq!(version("a").as_deref(), Some("local"));
        assert_eq!(version("b").as_deref(), Some("bom1"));
        assert_eq!(version("c").as_deref(), Some("bom2"));
    }

    #[test]
    fn test_import_entries_own_declaration_order_first() {
        let own = vec![bom("zeta-bom", "1"), bom("alpha-bom", "1")];
        let parent =
            overlay_managed_dependencies(None, &[bom("inherited-bom", "1")], &Properties::new());
        let managed = overlay_managed_dependencies(Some(&parent), &own, &Properties::new());

        let order: Vec<String> = import_entries(&managed, &own, &Properties::new())
            .into_iter()
            .map(|d| d.artifact_id)
            .collect();
        assert_eq!(order, vec!["zeta-bom", "alpha-bom", "inherited-bom"]);
    }

    #[test]
    fn test_declared_dependency_inherits_managed_scope() {
        let mut managed_entry = dep("a", Some("1.0"));
        managed_entry.scope = Some("test".to_string());
        let managed = overlay_managed_dependencies(None, &[managed_entry], &Properties::new());

        let resolved = resolve_dependencies(&[dep("a", None)], &managed, &Properties::new());
        assert_eq!(resolved[0].scope.as_deref(), Some("test"));
        assert_eq!(resolved[0].version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_unmanaged_dependency_is_unchanged() {
        let resolved =
            resolve_dependencies(
                &[dep("lonely", Some("3"))],
                &ManagedDependencies::new(),
                &Properties::new(),
            );
        assert_eq!(resolved, vec![dep("lonely", Some("3"))]);
    }

    #[test]
    fn test_managed_plugin_inherits_parent_version() {
        let parent = overlay_managed_plugins(
            None,
            &[Plugin::new(None, "maven-surefire-plugin", Some("3.2.5"))],
            &Properties::new(),
        );
        let child = overlay_managed_plugins(
            Some(&parent),
            &[Plugin::new(None, "maven-surefire-plugin", None)],
            &Properties::new(),
        );
        let key = Plugin::new(None, "maven-surefire-plugin", None).key();
        assert_eq!(child[&key].version.as_deref(), Some("3.2.5"));
    }

    #[test]
    fn test_resolve_plugins_fills_version() {
        let managed = overlay_managed_plugins(
            None,
            &[Plugin::new(Some("org.codehaus.mojo"), "exec-maven-plugin", Some("${exec.version}"))],
            &props(&[("exec.version", "3.1.0")]),
        );
        let resolved = resolve_plugins(
            &[
                Plugin::new(Some("org.codehaus.mojo"), "exec-maven-plugin", None),
                Plugin::new(None, "maven-jar-plugin", Some("3.3.0")),
            ],
            &managed,
            &Properties::new(),
        );
        assert_eq!(resolved[0].version.as_deref(), Some("3.1.0"));
        assert_eq!(resolved[1].version.as_deref(), Some("3.3.0"));
    }
}

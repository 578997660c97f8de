//! # Property Resolution Engine
//!
//! Computes the cascaded property map of a descriptor. The recursion over the
//! parent chain and its memoization live in
//! [`ResolutionPass::properties`](crate::resolution::ResolutionPass::properties);
//! this module holds the per-level step and the substitution rules.
//!
//! ## Cascade
//!
//! 1. Start from the parent's resolved map (empty at a root ancestor).
//! 2. Overlay the descriptor's own `<properties>`; own values win.
//! 3. Inject `project.version`, `project.groupId` and `project.artifactId`.
//! 4. Run exactly one substitution pass: a value that is exactly `${name}`
//!    is replaced by the value bound to `name`, if any.
//!
//! The single pass is intentional. A property whose value becomes another
//! `${...}` reference after one substitution is left as that reference.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::descriptor::Descriptor;

/// Resolved property name to value mapping.
pub type Properties = BTreeMap<String, String>;

pub const PROJECT_VERSION: &str = "project.version";
pub const PROJECT_GROUP_ID: &str = "project.groupId";
pub const PROJECT_ARTIFACT_ID: &str = "project.artifactId";

static WHOLE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{([^}]+)\}$").expect("valid regex"));

static ANY_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

/// Compute one level of the cascade.
///
/// `parent` is the parent's already-resolved map, or `None` at a root
/// ancestor. When the descriptor omits its version or groupId, the parent's
/// resolved value is used, then the `<parent>` reference's own value.
pub fn cascade(descriptor: &Descriptor, parent: Option<&Properties>) -> Properties {
    let mut properties = parent.cloned().unwrap_or_default();

    for (key, value) in &descriptor.properties {
        properties.insert(key.clone(), value.clone());
    }

    let inherited = |key: &str| parent.and_then(|p| p.get(key)).cloned();
    let reference = descriptor.parent.as_ref();

    let version = descriptor
        .version
        .clone()
        .or_else(|| inherited(PROJECT_VERSION))
        .or_else(|| reference.map(|p| p.version.clone()));
    let group_id = descriptor
        .group_id
        .clone()
        .or_else(|| inherited(PROJECT_GROUP_ID))
        .or_else(|| reference.map(|p| p.group_id.clone()));

    if let Some(version) = version {
        properties.insert(PROJECT_VERSION.to_string(), version);
    }
    if let Some(group_id) = group_id {
        properties.insert(PROJECT_GROUP_ID.to_string(), group_id);
    }
    properties.insert(
        PROJECT_ARTIFACT_ID.to_string(),
        descriptor.artifact_id.clone(),
    );

    substitute_once(properties)
}

/// Replace whole-value `${name}` references with their bindings, one pass.
///
/// Lookups read the map as it was before the pass, so the result does not
/// depend on iteration order.
pub fn substitute_once(properties: Properties) -> Properties {
    let snapshot = properties.clone();
    properties
        .into_iter()
        .map(|(key, value)| {
            let replaced = WHOLE_REFERENCE
                .captures(&value)
                .and_then(|caps| snapshot.get(&caps[1]).cloned());
            (key, replaced.unwrap_or(value))
        })
        .collect()
}

/// Substitute every `${name}` occurrence in `value` that has a binding.
///
/// Unknown references are left verbatim.
pub fn interpolate(value: &str, properties: &Properties) -> String {
    if !value.contains("${") {
        return value.to_string();
    }
    ANY_REFERENCE
        .replace_all(value, |caps: &Captures| match properties.get(&caps[1]) {
            Some(bound) => bound.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

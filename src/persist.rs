//! # Round-Trip Persister
//!
//! Writes a (possibly edited) [`Descriptor`] back to its source file while
//! keeping everything that was not edited as it was: comments, blank lines,
//! indentation, attribute order and the text around the document element.
//!
//! ## How it works
//!
//! 1. The current file text is decoded with its declared encoding and the
//!    colons inside `<configuration>` tag names are escaped.
//! 2. Only the document element is parsed with `xot`. The prolog and epilog
//!    are spliced back verbatim.
//! 3. The model is applied differentially: a node is touched only when its
//!    value differs from the model. New elements copy the indentation of
//!    their siblings; removed elements take their leading whitespace along.
//! 4. The output is spliced from the source: an element whose subtree was
//!    not touched is copied from its byte span, and an element whose children
//!    changed keeps its original start and end tags. Only new nodes are
//!    serialized. Line endings are restored if the file used CRLF, the
//!    escaping is reversed and the original encoding (and BOM) is reapplied.
//!
//! A descriptor equal to what its file already parses to is written back
//! unchanged, byte for byte. After an edit, everything outside the edited
//! elements (CDATA sections, entity references, attribute quoting, empty
//! `<a></a>` pairs) is still byte for byte the same.
//!
//! ## Matching
//!
//! Dependencies are matched to existing `<dependency>` elements by
//! management key first, then by position; plugins the same way by plugin
//! key. Matched elements are then moved so the file follows the model's
//! order. Profiles are matched by id, falling back to position. Profiles that
//! exist only in the model are not created.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::Range;
use std::path::Path;

use log::debug;
use xot::{NameId, NamespaceId, Node, Xot};

use crate::descriptor::{read_dependency, read_plugin, Descriptor};
use crate::error::{Error, Result};
use crate::escape::{escape_configuration_colons, unescape_configuration_colons};
use crate::model::{Dependency, Exclusion, ParentReference, Plugin};
use crate::properties::Properties;
use crate::xml::{
    child_element, child_elements, child_text, descend, document_element_span, element_children,
    element_spans, is_element_name, local_name, text_of, uses_crlf, ElementSpan, SourceText,
};

/// Conventional order of `<project>` children, used to place new elements.
const PROJECT_ORDER: &[&str] = &[
    "modelVersion",
    "parent",
    "groupId",
    "artifactId",
    "version",
    "packaging",
    "name",
    "description",
    "url",
    "modules",
    "properties",
    "dependencyManagement",
    "dependencies",
    "build",
    "profiles",
];

const BUILD_ORDER: &[&str] = &["pluginManagement", "plugins"];

const DEPENDENCY_FIELDS: &[&str] = &[
    "groupId",
    "artifactId",
    "version",
    "type",
    "classifier",
    "scope",
    "optional",
];

const DEFAULT_INDENT_UNIT: &str = "  ";

/// Write `descriptor` back to `descriptor.path`.
///
/// The file is rewritten only when the rendered text differs from what is
/// on disk.
pub fn save(descriptor: &Descriptor) -> Result<()> {
    let path = descriptor.path.as_path();
    let raw = fs::read(path)?;
    let source = SourceText::decode(path, &raw)?;
    let rendered = render(descriptor, &source.text)?;
    if rendered == source.text {
        debug!("{}: no changes to write", path.display());
        return Ok(());
    }
    fs::write(path, source.encode(path, &rendered)?)?;
    debug!("{}: saved", path.display());
    Ok(())
}

/// Apply `descriptor` onto `original` and return the new file text.
pub fn render(descriptor: &Descriptor, original: &str) -> Result<String> {
    let path = descriptor.path.as_path();
    let current = Descriptor::parse(path, original)?;
    if current == *descriptor {
        return Ok(original.to_string());
    }
    if let Some(name) = descriptor.properties.keys().find(|k| !is_element_name(k)) {
        return Err(Error::Persist {
            path: path.to_path_buf(),
            message: format!("'{}' is not a valid property name", name),
        });
    }

    let crlf = uses_crlf(original);
    let escaped = escape_configuration_colons(original);
    let (start, end) = document_element_span(&escaped).ok_or_else(|| Error::Persist {
        path: path.to_path_buf(),
        message: "no document element found".to_string(),
    })?;
    let element = if crlf {
        escaped[start..end].replace("\r\n", "\n")
    } else {
        escaped[start..end].to_string()
    };

    let mut xot = Xot::new();
    let serialized = apply(&mut xot, &element, descriptor).map_err(|message| Error::Persist {
        path: path.to_path_buf(),
        message,
    })?;
    let serialized = if crlf {
        serialized.replace('\n', "\r\n")
    } else {
        serialized
    };

    let text = format!("{}{}{}", &escaped[..start], serialized, &escaped[end..]);
    Ok(unescape_configuration_colons(&text).into_owned())
}

fn apply(
    xot: &mut Xot,
    element: &str,
    descriptor: &Descriptor,
) -> std::result::Result<String, String> {
    let spans = element_spans(element).ok_or_else(|| "unbalanced tags".to_string())?;
    let doc = xot.parse(element).map_err(|e| e.to_string())?;
    let project = xot.document_element(doc).map_err(|e| e.to_string())?;
    let original = Original::index(xot, project, element, &spans)?;

    let mut editor = Editor::new(xot, project);
    editor
        .write_project(descriptor)
        .map_err(|e| e.to_string())?;
    let dirty = editor.dirty;

    Splicer::new(xot, &original, dirty)
        .element(project)
        .map_err(|e| e.to_string())
}

/// Where each element of the parsed document sits in the source text.
struct Original<'t> {
    text: &'t str,
    elements: HashMap<Node, Located>,
    /// Text of every parsed text node.
    texts: HashMap<Node, String>,
    /// Prefix of the document element, given to new elements.
    prefix: Option<&'t str>,
}

struct Located {
    span: ElementSpan,
    gaps: Vec<Range<usize>>,
    /// Non-element children as parsed, grouped by the gap they fill.
    runs: Vec<Vec<Node>>,
}

impl<'t> Original<'t> {
    fn index(
        xot: &Xot,
        project: Node,
        text: &'t str,
        spans: &[ElementSpan],
    ) -> std::result::Result<Self, String> {
        let nodes: Vec<Node> = xot
            .descendants(project)
            .filter(|&node| xot.element(node).is_some())
            .collect();
        if nodes.len() != spans.len() {
            return Err(format!(
                "scanned {} elements but parsed {}",
                spans.len(),
                nodes.len()
            ));
        }

        let mut elements = HashMap::new();
        let mut texts = HashMap::new();
        for (&node, span) in nodes.iter().zip(spans) {
            let mut runs = vec![Vec::new()];
            for child in xot.children(node) {
                if xot.element(child).is_some() {
                    runs.push(Vec::new());
                    continue;
                }
                if let Some(value) = xot.text_str(child) {
                    texts.insert(child, value.to_string());
                }
                if let Some(run) = runs.last_mut() {
                    run.push(child);
                }
            }
            let located = Located {
                span: span.clone(),
                gaps: span.gaps(spans),
                runs,
            };
            elements.insert(node, located);
        }

        let prefix = spans
            .first()
            .and_then(|root| text[root.name.clone()].split_once(':'))
            .map(|(prefix, _)| prefix);
        Ok(Self {
            text,
            elements,
            texts,
            prefix,
        })
    }
}

/// Writes the edited document using source text wherever it still applies.
struct Splicer<'a, 't> {
    xot: &'a Xot,
    original: &'a Original<'t>,
    /// Elements whose child list or text changed.
    dirty: HashSet<Node>,
    /// Dirty elements and all their ancestors.
    touched: HashSet<Node>,
}

impl<'a, 't> Splicer<'a, 't> {
    fn new(xot: &'a Xot, original: &'a Original<'t>, dirty: HashSet<Node>) -> Self {
        let mut touched = HashSet::new();
        for &node in &dirty {
            let mut current = Some(node);
            while let Some(node) = current {
                if !touched.insert(node) {
                    break;
                }
                current = xot.parent(node);
            }
        }
        Self {
            xot,
            original,
            dirty,
            touched,
        }
    }

    fn element(&self, node: Node) -> EditResult<String> {
        let Some(located) = self.original.elements.get(&node) else {
            return self.fresh(node);
        };
        let text = self.original.text;
        let span = &located.span;
        if !self.touched.contains(&node) {
            return Ok(text[span.outer.clone()].to_string());
        }

        if !self.dirty.contains(&node) {
            // Same children as parsed: copy the source, re-rendering only
            // the child elements that were touched below.
            let mut out = String::new();
            let mut at = span.outer.start;
            for child in element_children(self.xot, node) {
                let Some(inner) = self.original.elements.get(&child) else {
                    continue;
                };
                out.push_str(&text[at..inner.span.outer.start]);
                out.push_str(&self.element(child)?);
                at = inner.span.outer.end;
            }
            out.push_str(&text[at..span.outer.end]);
            return Ok(out);
        }

        let children: Vec<Node> = self.xot.children(node).collect();
        if span.self_closing && children.is_empty() {
            return Ok(text[span.outer.clone()].to_string());
        }
        let (open, close) = if span.self_closing {
            let tag = text[span.outer.start..span.outer.end - 2].trim_end();
            (format!("{}>", tag), format!("</{}>", &text[span.name.clone()]))
        } else {
            (
                text[span.outer.start..span.inner.start].to_string(),
                text[span.inner.end..span.outer.end].to_string(),
            )
        };

        let mut out = open;
        let mut i = 0;
        while i < children.len() {
            if self.xot.element(children[i]).is_some() {
                out.push_str(&self.element(children[i])?);
                i += 1;
                continue;
            }
            let end = children[i..]
                .iter()
                .position(|&child| self.xot.element(child).is_some())
                .map_or(children.len(), |offset| i + offset);
            out.push_str(&self.run(located, &children[i..end])?);
            i = end;
        }
        out.push_str(&close);
        Ok(out)
    }

    /// Non-element siblings between two elements. A run that is still
    /// exactly one of the parsed runs is copied from the source.
    fn run(&self, located: &Located, run: &[Node]) -> EditResult<String> {
        let gap = located
            .runs
            .iter()
            .position(|parsed| parsed.as_slice() == run)
            .filter(|_| {
                run.iter().all(|&node| {
                    self.original.texts.get(&node).map(String::as_str) == self.xot.text_str(node)
                })
            })
            .and_then(|index| located.gaps.get(index));
        if let Some(gap) = gap {
            return Ok(self.original.text[gap.clone()].to_string());
        }

        let mut out = String::new();
        for &node in run {
            out.push_str(&self.fresh(node)?);
        }
        Ok(out)
    }

    /// Serialize a node that has no source text.
    fn fresh(&self, node: Node) -> EditResult<String> {
        if let Some(text) = self.xot.text_str(node) {
            return Ok(escape_text(text));
        }
        let Some(local) = local_name(self.xot, node) else {
            return self.xot.to_string(node);
        };
        let name = match self.original.prefix {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        };

        let children: Vec<Node> = self.xot.children(node).collect();
        if children.is_empty() {
            return Ok(format!("<{}/>", name));
        }
        let mut out = format!("<{}>", name);
        for child in children {
            if self.xot.element(child).is_some() {
                out.push_str(&self.element(child)?);
            } else {
                out.push_str(&self.fresh(child)?);
            }
        }
        out.push_str(&format!("</{}>", name));
        Ok(out)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// For each wanted key, the index of the existing entry it updates.
///
/// Keys are matched exactly first; a wanted entry left unmatched then takes
/// the existing entry at the same position if that one is still free.
fn pair_up<K: PartialEq>(existing: &[K], wanted: &[K]) -> Vec<Option<usize>> {
    let mut taken = vec![false; existing.len()];
    let mut pairs: Vec<Option<usize>> = wanted
        .iter()
        .map(|key| {
            let found = existing
                .iter()
                .enumerate()
                .position(|(i, candidate)| !taken[i] && candidate == key);
            if let Some(i) = found {
                taken[i] = true;
            }
            found
        })
        .collect();

    for (i, pair) in pairs.iter_mut().enumerate() {
        if pair.is_none() && i < existing.len() && !taken[i] {
            taken[i] = true;
            *pair = Some(i);
        }
    }
    pairs
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn preceding<'a>(order: &'a [&'a str], name: &str) -> &'a [&'a str] {
    let at = order.iter().position(|n| *n == name).unwrap_or(order.len());
    &order[..at]
}

/// A subtree to be created.
struct Fragment {
    name: String,
    body: Body,
}

enum Body {
    Text(String),
    Children(Vec<Fragment>),
}

impl Fragment {
    fn leaf(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            body: Body::Text(text.to_string()),
        }
    }

    fn branch(name: &str, children: Vec<Fragment>) -> Self {
        Self {
            name: name.to_string(),
            body: Body::Children(children),
        }
    }

    fn exclusions(exclusions: &[Exclusion]) -> Self {
        Self::branch(
            "exclusions",
            exclusions.iter().map(Self::exclusion).collect(),
        )
    }

    fn exclusion(exclusion: &Exclusion) -> Self {
        Self::branch(
            "exclusion",
            vec![
                Self::leaf("groupId", &exclusion.group_id),
                Self::leaf("artifactId", &exclusion.artifact_id),
            ],
        )
    }

    fn dependency(dependency: &Dependency) -> Self {
        let mut children: Vec<Fragment> = dependency_fields(dependency)
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| Self::leaf(name, &v)))
            .collect();
        if !dependency.exclusions.is_empty() {
            children.push(Self::exclusions(&dependency.exclusions));
        }
        Self::branch("dependency", children)
    }

    fn plugin(plugin: &Plugin) -> Self {
        Self::branch(
            "plugin",
            plugin_fields(plugin)
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| Self::leaf(name, &v)))
                .collect(),
        )
    }
}

fn dependency_fields(dependency: &Dependency) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("groupId", non_empty(&dependency.group_id)),
        ("artifactId", non_empty(&dependency.artifact_id)),
        ("version", dependency.version.clone()),
        ("type", dependency.r#type.clone()),
        ("classifier", dependency.classifier.clone()),
        ("scope", dependency.scope.clone()),
        ("optional", dependency.optional.map(|o| o.to_string())),
    ]
}

fn plugin_fields(plugin: &Plugin) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("groupId", plugin.group_id.clone()),
        ("artifactId", non_empty(&plugin.artifact_id)),
        ("version", plugin.version.clone()),
    ]
}

enum Fallback {
    Start,
    End,
}

type EditResult<T> = std::result::Result<T, xot::Error>;

/// Differential writer over one parsed document element.
struct Editor<'x> {
    xot: &'x mut Xot,
    project: Node,
    namespace: Option<NamespaceId>,
    unit: String,
    dirty: HashSet<Node>,
}

impl<'x> Editor<'x> {
    fn new(xot: &'x mut Xot, project: Node) -> Self {
        let view: &Xot = &*xot;
        let namespace = view
            .element(project)
            .map(|element| view.namespace_for_name(element.name()));
        let first = element_children(view, project).into_iter().next();
        let unit = first
            .and_then(|node| indent_of(view, node))
            .filter(|indent| !indent.is_empty())
            .unwrap_or_else(|| DEFAULT_INDENT_UNIT.to_string());
        Self {
            xot,
            project,
            namespace,
            unit,
            dirty: HashSet::new(),
        }
    }

    fn write_project(&mut self, descriptor: &Descriptor) -> EditResult<()> {
        let project = self.project;
        self.write_parent(descriptor.parent.as_ref())?;
        self.set_child_text(
            project,
            "groupId",
            descriptor.group_id.as_deref(),
            preceding(PROJECT_ORDER, "groupId"),
            Fallback::Start,
        )?;
        self.set_child_text(
            project,
            "artifactId",
            Some(descriptor.artifact_id.as_str()).filter(|a| !a.is_empty()),
            preceding(PROJECT_ORDER, "artifactId"),
            Fallback::Start,
        )?;
        self.set_child_text(
            project,
            "version",
            descriptor.version.as_deref(),
            preceding(PROJECT_ORDER, "version"),
            Fallback::Start,
        )?;
        self.set_child_text(
            project,
            "packaging",
            descriptor.packaging.as_deref(),
            preceding(PROJECT_ORDER, "packaging"),
            Fallback::Start,
        )?;

        self.write_properties(&descriptor.properties)?;
        self.write_dependencies(
            &["dependencyManagement", "dependencies"],
            &descriptor.dependency_management,
        )?;
        self.write_dependencies(&["dependencies"], &descriptor.dependencies)?;
        self.write_plugins(
            &["build", "pluginManagement", "plugins"],
            &descriptor.plugin_management,
        )?;
        self.write_plugins(&["build", "plugins"], &descriptor.plugins)?;
        self.write_modules(project, &descriptor.modules)?;
        self.write_profiles(descriptor)
    }

    fn write_parent(&mut self, parent: Option<&ParentReference>) -> EditResult<()> {
        let project = self.project;
        let existing = child_element(self.xot, project, "parent");
        let (node, wanted) = match (existing, parent) {
            (None, None) => return Ok(()),
            (Some(node), None) => return self.remove(node),
            (None, Some(wanted)) => {
                let node = self.insert_child(
                    project,
                    &Fragment::branch("parent", Vec::new()),
                    preceding(PROJECT_ORDER, "parent"),
                    Fallback::Start,
                )?;
                (node, wanted)
            }
            (Some(node), Some(wanted)) => (node, wanted),
        };

        let fields = [
            ("groupId", non_empty(&wanted.group_id)),
            ("artifactId", non_empty(&wanted.artifact_id)),
            ("version", non_empty(&wanted.version)),
            ("relativePath", wanted.relative_path.clone()),
        ];
        self.set_fields(node, &fields)
    }

    fn write_properties(&mut self, wanted: &Properties) -> EditResult<()> {
        let project = self.project;
        let container = match child_element(self.xot, project, "properties") {
            Some(container) => container,
            None if wanted.is_empty() => return Ok(()),
            None => self.insert_child(
                project,
                &Fragment::branch("properties", Vec::new()),
                preceding(PROJECT_ORDER, "properties"),
                Fallback::End,
            )?,
        };

        let mut present = Vec::new();
        for node in element_children(self.xot, container) {
            let Some(name) = local_name(self.xot, node).map(str::to_string) else {
                continue;
            };
            match wanted.get(&name) {
                None => self.remove(node)?,
                Some(value) => {
                    if text_of(self.xot, node) != *value {
                        self.set_text(node, value)?;
                    }
                    present.push(name);
                }
            }
        }
        for (name, value) in wanted {
            if !present.contains(name) {
                self.insert_child(
                    container,
                    &Fragment::leaf(name, value),
                    &[],
                    Fallback::End,
                )?;
            }
        }
        Ok(())
    }

    fn write_dependencies(&mut self, path: &[&str], wanted: &[Dependency]) -> EditResult<()> {
        let container = match descend(self.xot, self.project, path) {
            Some(container) => container,
            None if wanted.is_empty() => return Ok(()),
            None => self.ensure_path(path)?,
        };

        let nodes: Vec<Node> = child_elements(self.xot, container, "dependency").collect();
        let existing: Vec<Dependency> = nodes
            .iter()
            .map(|&n| read_dependency(self.xot, n))
            .collect();
        let keys: Vec<_> = existing.iter().map(Dependency::management_key).collect();
        let wanted_keys: Vec<_> = wanted.iter().map(Dependency::management_key).collect();
        let pairs = pair_up(&keys, &wanted_keys);

        for (i, node) in nodes.iter().enumerate() {
            if !pairs.contains(&Some(i)) {
                self.remove(*node)?;
            }
        }
        let mut placed = Vec::with_capacity(wanted.len());
        for (dependency, pair) in wanted.iter().zip(pairs) {
            let node = match pair {
                Some(i) if existing[i] == *dependency => nodes[i],
                Some(i) => {
                    self.set_fields(nodes[i], &dependency_fields(dependency))?;
                    self.write_exclusions(
                        nodes[i],
                        &existing[i].exclusions,
                        &dependency.exclusions,
                    )?;
                    nodes[i]
                }
                None => self.insert_child(
                    container,
                    &Fragment::dependency(dependency),
                    &[],
                    Fallback::End,
                )?,
            };
            placed.push(node);
        }
        self.reorder(container, "dependency", &placed)
    }

    fn write_exclusions(
        &mut self,
        dependency: Node,
        existing: &[Exclusion],
        wanted: &[Exclusion],
    ) -> EditResult<()> {
        if existing == wanted {
            return Ok(());
        }
        let container = child_element(self.xot, dependency, "exclusions");
        let container = match container {
            Some(container) if wanted.is_empty() => return self.remove(container),
            Some(container) => container,
            None => {
                self.insert_child(
                    dependency,
                    &Fragment::exclusions(wanted),
                    DEPENDENCY_FIELDS,
                    Fallback::End,
                )?;
                return Ok(());
            }
        };

        let nodes: Vec<Node> = child_elements(self.xot, container, "exclusion").collect();
        for (node, exclusion) in nodes.iter().zip(existing) {
            if !wanted.contains(exclusion) {
                self.remove(*node)?;
            }
        }
        for exclusion in wanted.iter().filter(|e| !existing.contains(e)) {
            self.insert_child(
                container,
                &Fragment::exclusion(exclusion),
                &[],
                Fallback::End,
            )?;
        }
        Ok(())
    }

    fn write_plugins(&mut self, path: &[&str], wanted: &[Plugin]) -> EditResult<()> {
        let container = match descend(self.xot, self.project, path) {
            Some(container) => container,
            None if wanted.is_empty() => return Ok(()),
            None => self.ensure_path(path)?,
        };

        let nodes: Vec<Node> = child_elements(self.xot, container, "plugin").collect();
        let existing: Vec<Plugin> = nodes.iter().map(|&n| read_plugin(self.xot, n)).collect();
        let keys: Vec<_> = existing.iter().map(Plugin::key).collect();
        let wanted_keys: Vec<_> = wanted.iter().map(Plugin::key).collect();
        let pairs = pair_up(&keys, &wanted_keys);

        for (i, node) in nodes.iter().enumerate() {
            if !pairs.contains(&Some(i)) {
                self.remove(*node)?;
            }
        }
        let mut placed = Vec::with_capacity(wanted.len());
        for (plugin, pair) in wanted.iter().zip(pairs) {
            let node = match pair {
                Some(i) if existing[i] == *plugin => nodes[i],
                Some(i) => {
                    self.set_fields(nodes[i], &plugin_fields(plugin))?;
                    nodes[i]
                }
                None => {
                    self.insert_child(container, &Fragment::plugin(plugin), &[], Fallback::End)?
                }
            };
            placed.push(node);
        }
        self.reorder(container, "plugin", &placed)
    }

    fn write_modules(&mut self, owner: Node, wanted: &[String]) -> EditResult<()> {
        let container = match child_element(self.xot, owner, "modules") {
            Some(container) => container,
            None if wanted.is_empty() => return Ok(()),
            None => {
                let anchors: &[&str] = if owner == self.project {
                    preceding(PROJECT_ORDER, "modules")
                } else {
                    &["id"]
                };
                self.insert_child(
                    owner,
                    &Fragment::branch("modules", Vec::new()),
                    anchors,
                    Fallback::End,
                )?
            }
        };

        let nodes: Vec<Node> = child_elements(self.xot, container, "module").collect();
        let mut present = Vec::new();
        for node in nodes {
            let name = text_of(self.xot, node);
            if wanted.contains(&name) && !present.contains(&name) {
                present.push(name);
            } else {
                self.remove(node)?;
            }
        }
        for module in wanted.iter().filter(|m| !present.contains(m)) {
            self.insert_child(
                container,
                &Fragment::leaf("module", module),
                &[],
                Fallback::End,
            )?;
        }

        let nodes: Vec<Node> = child_elements(self.xot, container, "module").collect();
        let mut ordered: Vec<Node> = Vec::with_capacity(nodes.len());
        for module in wanted {
            let found = nodes
                .iter()
                .copied()
                .find(|&node| text_of(self.xot, node) == *module);
            if let Some(node) = found.filter(|node| !ordered.contains(node)) {
                ordered.push(node);
            }
        }
        self.reorder(container, "module", &ordered)
    }

    fn write_profiles(&mut self, descriptor: &Descriptor) -> EditResult<()> {
        let Some(container) = child_element(self.xot, self.project, "profiles") else {
            return Ok(());
        };
        let nodes: Vec<Node> = child_elements(self.xot, container, "profile").collect();
        let ids: Vec<Option<String>> = nodes
            .iter()
            .map(|&n| child_text(self.xot, n, "id"))
            .collect();
        let wanted_ids: Vec<Option<String>> =
            descriptor.profiles.iter().map(|p| p.id.clone()).collect();

        for (profile, pair) in descriptor.profiles.iter().zip(pair_up(&ids, &wanted_ids)) {
            match pair {
                Some(i) => self.write_modules(nodes[i], &profile.modules)?,
                None => debug!("profile {:?} has no element to update", profile.id),
            }
        }
        Ok(())
    }

    /// Create missing elements along `path` below the project.
    fn ensure_path(&mut self, path: &[&str]) -> EditResult<Node> {
        let mut current = self.project;
        for (depth, name) in path.iter().enumerate() {
            current = match child_element(self.xot, current, name) {
                Some(node) => node,
                None => {
                    let anchors: &[&str] = match depth {
                        0 => preceding(PROJECT_ORDER, name),
                        1 if path[0] == "build" => preceding(BUILD_ORDER, name),
                        _ => &[],
                    };
                    self.insert_child(
                        current,
                        &Fragment::branch(name, Vec::new()),
                        anchors,
                        Fallback::End,
                    )?
                }
            };
        }
        Ok(current)
    }

    /// Bring simple child fields in line, in order; `None` removes a field.
    fn set_fields(&mut self, node: Node, fields: &[(&str, Option<String>)]) -> EditResult<()> {
        for (i, (name, value)) in fields.iter().enumerate() {
            let anchors: Vec<&str> = fields[..i].iter().map(|(n, _)| *n).collect();
            self.set_child_text(node, name, value.as_deref(), &anchors, Fallback::Start)?;
        }
        Ok(())
    }

    fn set_child_text(
        &mut self,
        parent: Node,
        name: &str,
        value: Option<&str>,
        anchors: &[&str],
        fallback: Fallback,
    ) -> EditResult<()> {
        let existing = child_element(self.xot, parent, name);
        match (existing, value) {
            (None, None) => Ok(()),
            (Some(node), None) => self.remove(node),
            (Some(node), Some(value)) => {
                if text_of(self.xot, node) != value {
                    self.set_text(node, value)?;
                }
                Ok(())
            }
            (None, Some(value)) => {
                self.insert_child(parent, &Fragment::leaf(name, value), anchors, fallback)?;
                Ok(())
            }
        }
    }

    fn set_text(&mut self, node: Node, value: &str) -> EditResult<()> {
        self.dirty.insert(node);
        let children: Vec<Node> = self.xot.children(node).collect();
        for child in children {
            self.xot.remove(child)?;
        }
        if !value.is_empty() {
            let text = self.xot.new_text(value);
            self.xot.append(node, text)?;
        }
        Ok(())
    }

    /// Remove an element together with the whitespace that indents it.
    fn remove(&mut self, node: Node) -> EditResult<()> {
        if let Some(parent) = self.xot.parent(node) {
            self.dirty.insert(parent);
        }
        if let Some(previous) = self.xot.previous_sibling(node) {
            if is_whitespace(self.xot, previous) {
                self.xot.remove(previous)?;
            }
        }
        self.xot.remove(node)
    }

    /// Insert a new subtree below `parent`, indented like its siblings.
    ///
    /// The new element goes after the last existing child named in
    /// `anchors`; without one it goes first or last as `fallback` says.
    fn insert_child(
        &mut self,
        parent: Node,
        fragment: &Fragment,
        anchors: &[&str],
        fallback: Fallback,
    ) -> EditResult<Node> {
        self.dirty.insert(parent);
        let children = element_children(self.xot, parent);
        let indent = match children.last() {
            Some(&last) => indent_of(self.xot, last),
            None => indent_of(self.xot, parent).map(|i| format!("{}{}", i, self.unit)),
        };
        let node = self.build(fragment, indent.as_deref())?;

        let anchor = children
            .iter()
            .rev()
            .find(|&&child| local_name(self.xot, child).is_some_and(|n| anchors.contains(&n)))
            .copied();

        let after = match fallback {
            Fallback::End => anchor.or(children.last().copied()),
            Fallback::Start => anchor,
        };

        if let Some(after) = after {
            self.xot.insert_after(after, node)?;
            if let Some(indent) = &indent {
                let text = self.xot.new_text(&format!("\n{}", indent));
                self.xot.insert_before(node, text)?;
            }
        } else if let Some(&first) = children.first() {
            self.xot.insert_before(first, node)?;
            if let Some(indent) = &indent {
                let text = self.xot.new_text(&format!("\n{}", indent));
                self.xot.insert_before(first, text)?;
            }
        } else {
            let outer = indent_of(self.xot, parent);
            let blank = self
                .xot
                .children(parent)
                .all(|child| is_whitespace(self.xot, child));
            if blank {
                let stale: Vec<Node> = self.xot.children(parent).collect();
                for child in stale {
                    self.xot.remove(child)?;
                }
            }
            if let Some(indent) = &indent {
                let text = self.xot.new_text(&format!("\n{}", indent));
                self.xot.append(parent, text)?;
            }
            self.xot.append(parent, node)?;
            if let (Some(outer), true) = (outer, blank) {
                let text = self.xot.new_text(&format!("\n{}", outer));
                self.xot.append(parent, text)?;
            }
        }
        Ok(node)
    }

    /// Put the `name` children of `container` in the order of `ordered`.
    ///
    /// Elements move between the existing slots; the whitespace and comments
    /// between slots stay where they are.
    fn reorder(&mut self, container: Node, name: &str, ordered: &[Node]) -> EditResult<()> {
        let current: Vec<Node> = child_elements(self.xot, container, name).collect();
        if current == ordered || current.len() != ordered.len() {
            return Ok(());
        }
        self.dirty.insert(container);

        // Markers keep each slot between its whitespace while the elements
        // are detached, so neighbouring text nodes never touch.
        let slot = self.xot.add_name("slot");
        let mut markers = Vec::with_capacity(current.len());
        for &node in &current {
            let marker = self.xot.new_element(slot);
            self.xot.insert_before(node, marker)?;
            markers.push(marker);
        }
        for &node in &current {
            self.xot.detach(node)?;
        }
        for (&marker, &node) in markers.iter().zip(ordered) {
            self.xot.insert_after(marker, node)?;
            self.xot.remove(marker)?;
        }
        Ok(())
    }

    fn build(&mut self, fragment: &Fragment, indent: Option<&str>) -> EditResult<Node> {
        let name = self.name(&fragment.name);
        let node = self.xot.new_element(name);
        match &fragment.body {
            Body::Text(text) => {
                if !text.is_empty() {
                    let text = self.xot.new_text(text);
                    self.xot.append(node, text)?;
                }
            }
            Body::Children(children) => {
                let inner = indent.map(|i| format!("{}{}", i, self.unit));
                for child in children {
                    if let Some(inner) = &inner {
                        let text = self.xot.new_text(&format!("\n{}", inner));
                        self.xot.append(node, text)?;
                    }
                    let built = self.build(child, inner.as_deref())?;
                    self.xot.append(node, built)?;
                }
                if let (Some(indent), false) = (indent, children.is_empty()) {
                    let text = self.xot.new_text(&format!("\n{}", indent));
                    self.xot.append(node, text)?;
                }
            }
        }
        Ok(node)
    }

    fn name(&mut self, local: &str) -> NameId {
        match self.namespace {
            Some(namespace) => self.xot.add_name_ns(local, namespace),
            None => self.xot.add_name(local),
        }
    }
}

fn is_whitespace(xot: &Xot, node: Node) -> bool {
    xot.text_str(node)
        .is_some_and(|text| text.chars().all(char::is_whitespace))
}

/// Indentation in front of `node`: the text after the last newline of the
/// whitespace preceding it. `None` when no such whitespace exists.
fn indent_of(xot: &Xot, node: Node) -> Option<String> {
    let previous = xot.previous_sibling(node)?;
    let text = xot.text_str(previous)?;
    let (_, indent) = text.rsplit_once('\n')?;
    indent
        .chars()
        .all(char::is_whitespace)
        .then(|| indent.to_string())
}

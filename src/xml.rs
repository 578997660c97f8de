//! Shared XML plumbing: source decoding, document-element location and
//! small `xot` navigation helpers, plus a lexical tag scanner that reports
//! byte spans of the source text.
//!
//! Only the document element is ever handed to `xot`. The prolog (XML
//! declaration, leading comments) and anything after the closing root tag are
//! kept as raw text so the persister can splice them back unchanged.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use xot::{Node, Xot};

use crate::error::{Error, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

static DECLARED_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*\bencoding\s*=\s*["']([A-Za-z0-9._-]+)["']"#)
        .expect("valid regex")
});

/// Text encodings a descriptor can be read and written back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Decoded file contents plus what is needed to encode them back.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    pub encoding: TextEncoding,
    pub bom: bool,
}

impl SourceText {
    /// Decode raw bytes using the encoding named in the XML declaration.
    ///
    /// UTF-8 is the default. ISO-8859-1 and its aliases are mapped byte for
    /// byte; anything else is rejected rather than silently mangled.
    pub fn decode(path: &Path, raw: &[u8]) -> Result<Self> {
        let (bom, body) = match raw.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let head = String::from_utf8_lossy(&body[..body.len().min(200)]);
        let declared = DECLARED_ENCODING
            .captures(&head)
            .map(|caps| caps[1].to_ascii_uppercase());

        let encoding = match declared.as_deref() {
            None | Some("UTF-8") | Some("UTF8") | Some("US-ASCII") | Some("ASCII") => {
                TextEncoding::Utf8
            }
            Some("ISO-8859-1") | Some("ISO8859-1") | Some("LATIN1") | Some("LATIN-1") => {
                TextEncoding::Latin1
            }
            Some(other) => {
                return Err(Error::UnsupportedEncoding {
                    path: path.to_path_buf(),
                    encoding: other.to_string(),
                })
            }
        };

        let text = match encoding {
            TextEncoding::Utf8 => {
                String::from_utf8(body.to_vec()).map_err(|e| Error::DescriptorParse {
                    path: path.to_path_buf(),
                    message: format!("invalid UTF-8: {}", e),
                })?
            }
            TextEncoding::Latin1 => body.iter().map(|&b| b as char).collect(),
        };

        Ok(Self {
            text,
            encoding,
            bom,
        })
    }

    /// Encode `text` the way this source was encoded.
    pub fn encode(&self, path: &Path, text: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len() + 3);
        if self.bom {
            out.extend_from_slice(UTF8_BOM);
        }
        match self.encoding {
            TextEncoding::Utf8 => out.extend_from_slice(text.as_bytes()),
            TextEncoding::Latin1 => {
                for ch in text.chars() {
                    let code = u32::from(ch);
                    if code > 0xFF {
                        return Err(Error::Persist {
                            path: path.to_path_buf(),
                            message: format!(
                                "character {:?} is not representable in ISO-8859-1",
                                ch
                            ),
                        });
                    }
                    out.push(code as u8);
                }
            }
        }
        Ok(out)
    }
}

/// Line-ending convention of a file, detected from its raw text.
pub fn uses_crlf(text: &str) -> bool {
    text.contains("\r\n")
}

/// Byte range of the document element within `text`.
///
/// Skips the XML declaration, processing instructions, comments and a
/// DOCTYPE before the root tag. The end is the byte after the matching
/// closing tag (or after `/>` for an empty root).
pub fn document_element_span(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    let start = loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let rest = &text[i..];
        if rest.starts_with("<?") {
            i += rest.find("?>")? + 2;
        } else if rest.starts_with("<!--") {
            i += rest.find("-->")? + 3;
        } else if rest.starts_with("<!") {
            i += rest.find('>')? + 1;
        } else if rest.starts_with('<') {
            break i;
        } else {
            return None;
        }
    };

    let name_len = text[start + 1..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
    let name = &text[start + 1..start + 1 + name_len];

    let close_tag = format!("</{}", name);
    if let Some(close) = text.rfind(&close_tag).filter(|&c| c > start) {
        let end = close + text[close..].find('>')? + 1;
        return Some((start, end));
    }

    let open_end = start + text[start..].find('>')?;
    if text[..open_end].ends_with('/') {
        Some((start, open_end + 1))
    } else {
        None
    }
}

/// Byte offset just past the first tag in `text`, honoring quoted
/// attribute values.
pub(crate) fn start_tag_end(text: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Start,
    Empty,
    End,
}

/// One start, empty-element or end tag found by [`tags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag {
    pub kind: TagKind,
    /// Byte range of the whole tag, `<` through `>`.
    pub span: Range<usize>,
    /// Byte range of the qualified name.
    pub name: Range<usize>,
}

/// Iterator over the tags of `text`. Comments, CDATA sections, processing
/// instructions and declarations are skipped. Stops at the first
/// unterminated construct.
pub(crate) fn tags(text: &str) -> Tags<'_> {
    Tags { text, at: 0 }
}

pub(crate) struct Tags<'t> {
    text: &'t str,
    at: usize,
}

impl Iterator for Tags<'_> {
    type Item = Tag;

    fn next(&mut self) -> Option<Tag> {
        loop {
            let start = self.at + self.text[self.at..].find('<')?;
            let rest = &self.text[start..];
            let skip_to = |terminator: &str| {
                rest.find(terminator)
                    .map(|i| start + i + terminator.len())
            };
            if rest.starts_with("<!--") {
                self.at = skip_to("-->")?;
            } else if rest.starts_with("<![CDATA[") {
                self.at = skip_to("]]>")?;
            } else if rest.starts_with("<?") {
                self.at = skip_to("?>")?;
            } else if rest.starts_with("<!") {
                self.at = skip_to(">")?;
            } else {
                let end = start + start_tag_end(rest)?;
                self.at = end;
                let (kind, name_start) = if rest.starts_with("</") {
                    (TagKind::End, start + 2)
                } else if self.text[..end - 1].ends_with('/') {
                    (TagKind::Empty, start + 1)
                } else {
                    (TagKind::Start, start + 1)
                };
                let name_len = self.text[name_start..end]
                    .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
                    .unwrap_or(0);
                return Some(Tag {
                    kind,
                    span: start..end,
                    name: name_start..name_start + name_len,
                });
            }
        }
    }
}

/// Source location of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementSpan {
    /// The whole element, start tag through end tag.
    pub outer: Range<usize>,
    /// Between the start and end tags; empty and at `outer.end` for an
    /// empty-element tag.
    pub inner: Range<usize>,
    pub name: Range<usize>,
    pub self_closing: bool,
    /// Indexes of child elements in the returned vector.
    pub children: Vec<usize>,
}

impl ElementSpan {
    /// Raw text between consecutive child elements, one range more than
    /// there are children. Empty for an empty-element tag.
    pub fn gaps(&self, spans: &[ElementSpan]) -> Vec<Range<usize>> {
        if self.self_closing {
            return Vec::new();
        }
        let mut gaps = Vec::with_capacity(self.children.len() + 1);
        let mut at = self.inner.start;
        for &child in &self.children {
            gaps.push(at..spans[child].outer.start);
            at = spans[child].outer.end;
        }
        gaps.push(at..self.inner.end);
        gaps
    }
}

/// Spans of every element in `text`, in document order (the order a
/// pre-order walk of the parsed tree visits them). `None` when the tags do
/// not balance.
pub(crate) fn element_spans(text: &str) -> Option<Vec<ElementSpan>> {
    let mut spans: Vec<ElementSpan> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    for tag in tags(text) {
        match tag.kind {
            TagKind::Start | TagKind::Empty => {
                let index = spans.len();
                if let Some(&parent) = open.last() {
                    spans[parent].children.push(index);
                }
                let self_closing = tag.kind == TagKind::Empty;
                spans.push(ElementSpan {
                    outer: tag.span.clone(),
                    inner: tag.span.end..tag.span.end,
                    name: tag.name,
                    self_closing,
                    children: Vec::new(),
                });
                if !self_closing {
                    open.push(index);
                }
            }
            TagKind::End => {
                let index = open.pop()?;
                let span = &mut spans[index];
                if text[span.name.clone()] != text[tag.name.clone()] {
                    return None;
                }
                span.inner.end = tag.span.start;
                span.outer.end = tag.span.end;
            }
        }
    }
    open.is_empty().then_some(spans)
}

/// Whether `name` can be written as an unprefixed element name.
pub fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Local (namespace-free) name of an element node.
pub(crate) fn local_name(xot: &Xot, node: Node) -> Option<&str> {
    xot.element(node).map(|element| xot.local_name_str(element.name()))
}

/// Direct element children of `parent` with the given local name.
pub(crate) fn child_elements<'a>(
    xot: &'a Xot,
    parent: Node,
    name: &'a str,
) -> impl Iterator<Item = Node> + 'a {
    xot.children(parent)
        .filter(move |&child| local_name(xot, child) == Some(name))
}

pub(crate) fn child_element(xot: &Xot, parent: Node, name: &str) -> Option<Node> {
    child_elements(xot, parent, name).next()
}

/// Follow a chain of child element names, e.g. `["build", "plugins"]`.
pub(crate) fn descend(xot: &Xot, from: Node, path: &[&str]) -> Option<Node> {
    path.iter()
        .try_fold(from, |node, name| child_element(xot, node, name))
}

/// Concatenated direct text of an element, trimmed.
pub(crate) fn text_of(xot: &Xot, node: Node) -> String {
    let mut text = String::new();
    for child in xot.children(node) {
        if let Some(chunk) = xot.text_str(child) {
            text.push_str(chunk);
        }
    }
    text.trim().to_string()
}

/// Trimmed text of the first child named `name`, if that child exists.
pub(crate) fn child_text(xot: &Xot, parent: Node, name: &str) -> Option<String> {
    child_element(xot, parent, name).map(|child| text_of(xot, child))
}

/// Element children of `parent`, in document order.
pub(crate) fn element_children(xot: &Xot, parent: Node) -> Vec<Node> {
    xot.children(parent)
        .filter(|&child| xot.element(child).is_some())
        .collect()
}

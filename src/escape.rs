//! Colon escaping for tag-like fragments inside `<configuration>` blocks.
//!
//! Plugin configuration sometimes carries tool arguments written as
//! elements, e.g. `<compilerArguments><Xlint:-path/></compilerArguments>`.
//! A namespace-aware parser reads `Xlint` as an undeclared prefix and rejects
//! the whole document. Before parsing, every colon inside the *name* of such
//! a tag is swapped for [`COLON_PLACEHOLDER`]; after writing, the swap is
//! reversed. Both directions only look inside configuration blocks, so
//! namespace declarations, `xsi:schemaLocation`, URLs and comments elsewhere
//! are never touched.

use std::borrow::Cow;

use crate::xml::{tags, TagKind};

/// Stand-in for `:` in escaped tag names. Valid inside an XML name.
pub const COLON_PLACEHOLDER: &str = "__pomtree_colon__";

const CONFIGURATION: &str = "configuration";

/// Replace colons in tag names inside configuration blocks.
///
/// Idempotent: escaped names contain no colons, so a second call is a no-op.
pub fn escape_configuration_colons(text: &str) -> Cow<'_, str> {
    rewrite_tag_names(text, |name| {
        name.contains(':')
            .then(|| name.replace(':', COLON_PLACEHOLDER))
    })
}

/// Undo [`escape_configuration_colons`].
pub fn unescape_configuration_colons(text: &str) -> Cow<'_, str> {
    rewrite_tag_names(text, |name| {
        name.contains(COLON_PLACEHOLDER)
            .then(|| name.replace(COLON_PLACEHOLDER, ":"))
    })
}

/// Apply `rewrite` to the name of every tag nested inside a
/// `<configuration>` element, at any depth. Configuration elements may nest.
fn rewrite_tag_names<F>(text: &str, rewrite: F) -> Cow<'_, str>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::new();
    let mut copied = 0;
    let mut depth = 0usize;

    for tag in tags(text) {
        let name = &text[tag.name.clone()];
        if name == CONFIGURATION {
            match tag.kind {
                TagKind::Start => depth += 1,
                TagKind::End => depth = depth.saturating_sub(1),
                TagKind::Empty => {}
            }
            continue;
        }
        if depth == 0 {
            continue;
        }
        if let Some(replacement) = rewrite(name) {
            out.push_str(&text[copied..tag.name.start]);
            out.push_str(&replacement);
            copied = tag.name.end;
        }
    }

    if copied == 0 {
        Cow::Borrowed(text)
    } else {
        out.push_str(&text[copied..]);
        Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPILER: &str = r#"<plugin>
  <artifactId>maven-compiler-plugin</artifactId>
  <configuration>
    <compilerArguments>
      <Xlint:-path/>
      <Xmaxerrs>100</Xmaxerrs>
    </compilerArguments>
  </configuration>
</plugin>"#;

    #[test]
    fn test_escapes_colon_tag_in_configuration() {
        let escaped = escape_configuration_colons(COMPILER);
        assert!(escaped.contains("<Xlint__pomtree_colon__-path/>"));
        assert!(!escaped.contains("<Xlint:-path/>"));
        assert!(escaped.contains("<Xmaxerrs>100</Xmaxerrs>"));
    }

    #[test]
    fn test_escapes_closing_tags() {
        let text = "<configuration><a:b>x</a:b></configuration>";
        let escaped = escape_configuration_colons(text);
        assert_eq!(
            escaped,
            "<configuration><a__pomtree_colon__b>x</a__pomtree_colon__b></configuration>"
        );
    }

    #[test]
    fn test_leaves_colons_outside_configuration() {
        let text = r#"<project xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0">
  <url>http://example.com</url>
  <xsi:thing/>
</project>"#;
        let escaped = escape_configuration_colons(text);
        assert!(matches!(escaped, Cow::Borrowed(_)));
    }

    #[test]
    fn test_leaves_text_and_comments_inside_configuration() {
        let text = "<configuration><!-- a:b --><url>http://x:8080/</url><arg>-Xlint:all</arg></configuration>";
        assert_eq!(escape_configuration_colons(text), text);
    }

    #[test]
    fn test_roundtrip_and_idempotence() {
        let once = escape_configuration_colons(COMPILER).into_owned();
        let twice = escape_configuration_colons(&once).into_owned();
        assert_eq!(once, twice);
        assert_eq!(unescape_configuration_colons(&once), COMPILER);
    }

    #[test]
    fn test_nested_configuration_keeps_outer_block_open() {
        let text = "<configuration><pluginConfig><configuration>x</configuration></pluginConfig><Xlint:-path/></configuration><a:b/>";
        assert_eq!(
            escape_configuration_colons(text),
            "<configuration><pluginConfig><configuration>x</configuration></pluginConfig><Xlint__pomtree_colon__-path/></configuration><a:b/>"
        );
    }

    #[test]
    fn test_configuration_with_slash_in_attribute() {
        let text = r#"<configuration xmlns:x="http://x/"><Xlint:-path/></configuration>"#;
        let escaped = escape_configuration_colons(text);
        assert_eq!(
            escaped,
            r#"<configuration xmlns:x="http://x/"><Xlint__pomtree_colon__-path/></configuration>"#
        );
        assert_eq!(unescape_configuration_colons(&escaped), text);
    }

    #[test]
    fn test_self_closing_configuration_does_not_swallow_next_block() {
        let text = "<configuration/><x:y/><configuration><a:b/></configuration>";
        let escaped = escape_configuration_colons(text);
        assert!(escaped.contains("<x:y/>"));
        assert!(escaped.contains("<a__pomtree_colon__b/>"));
    }

    mod proptest_tests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: escaping twice equals escaping once
            #[test]
            fn escape_is_idempotent(prefix in "[A-Za-z]{1,6}", rest in "[-A-Za-z0-9]{0,8}") {
                let text = format!("<configuration><{}:{}/></configuration>", prefix, rest);
                let once = escape_configuration_colons(&text).into_owned();
                let twice = escape_configuration_colons(&once).into_owned();
                prop_assert_eq!(&once, &twice);
                prop_assert_eq!(unescape_configuration_colons(&once), text);
            }

            /// Property: text without configuration blocks is never changed
            #[test]
            fn escape_ignores_text_outside_blocks(body in "[<>/:a-z ]{0,40}") {
                prop_assume!(!body.contains("configuration"));
                prop_assert_eq!(escape_configuration_colons(&body), body.as_str());
            }
        }
    }
}

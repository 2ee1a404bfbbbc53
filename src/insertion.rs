use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::InsertionStrategy;
use crate::edit::Edit;
use crate::error::{Result, TransformError};
use crate::grammar::MarkupGrammar;
use crate::node::{MarkupNode, Position};

// Same shape the runtime reader splits attribute values with.
static PAYLOAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+):(\d+):(\d+)$").expect("valid regex"));

/// `file:line:column` value of the location attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPayload {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl LocationPayload {
    pub fn new(file: impl Into<String>, at: Position) -> Self {
        Self {
            file: file.into(),
            line: at.line,
            column: at.column,
        }
    }

    /// Read a payload back from an attribute value as written by
    /// [`LocationPayload::attribute`].
    pub fn parse(value: &str) -> Option<Self> {
        let value = unescape(value);
        let caps = PAYLOAD_RE.captures(&value)?;
        Some(Self {
            file: caps[1].to_string(),
            line: caps[2].parse().ok()?,
            column: caps[3].parse().ok()?,
        })
    }

    /// The exact text spliced into an opening tag: ` key="file:line:column"`.
    /// Identical for both grammars.
    pub fn attribute(&self, key: &str) -> String {
        format!(" {key}=\"{}\"", escape(&self.to_string()))
    }
}

impl fmt::Display for LocationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

fn escape(value: &str) -> Cow<'_, str> {
    if value.contains(['&', '"']) {
        Cow::Owned(value.replace('&', "&amp;").replace('"', "&quot;"))
    } else {
        Cow::Borrowed(value)
    }
}

fn unescape(value: &str) -> Cow<'_, str> {
    if value.contains('&') {
        Cow::Owned(value.replace("&quot;", "\"").replace("&amp;", "&"))
    } else {
        Cow::Borrowed(value)
    }
}

fn check_ranges(node: &MarkupNode) -> Result<()> {
    let start = node.start.offset;
    if node.end < start {
        return Err(TransformError::inconsistent(
            start,
            format!("<{}> ends at {} before it starts", node.name, node.end),
        ));
    }
    if node.open_end < start || node.open_end > node.end {
        return Err(TransformError::inconsistent(
            start,
            format!("<{}> opening tag ends at {} outside the element", node.name, node.open_end),
        ));
    }
    for attr in &node.attributes {
        if attr.start < start || attr.end < attr.start || attr.end > node.open_end {
            return Err(TransformError::inconsistent(
                attr.start,
                format!("attribute of <{}> spans {}..{} outside its opening tag", node.name, attr.start, attr.end),
            ));
        }
    }
    Ok(())
}

/// Offset where the location attribute goes.
///
/// `name_anchor` is the grammar's answer for nodes without attributes.
pub fn insertion_offset(node: &MarkupNode, strategy: InsertionStrategy, name_anchor: usize) -> Result<usize> {
    check_ranges(node)?;

    let offset = match strategy {
        InsertionStrategy::AfterAttributes => node.attributes_end().unwrap_or(name_anchor),
        InsertionStrategy::BeforeClose => {
            let close_len = if node.self_closing { 2 } else { 1 };
            node.open_end.checked_sub(close_len).ok_or_else(|| {
                TransformError::inconsistent(node.open_end, format!("<{}> opening tag is too short", node.name))
            })?
        }
    };

    if offset <= node.start.offset || offset > node.open_end {
        return Err(TransformError::inconsistent(
            offset,
            format!("insertion point for <{}> falls outside its opening tag", node.name),
        ));
    }
    Ok(offset)
}

/// Build the edit that tags `node`.
pub fn compute_insertion(
    grammar: &dyn MarkupGrammar,
    node: &MarkupNode,
    strategy: InsertionStrategy,
    file: &str,
    key: &str,
) -> Result<Edit> {
    let offset = grammar.locate_insertion(node, strategy)?;
    let payload = LocationPayload::new(file, node.start);
    Ok(Edit::new(offset, payload.attribute(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Attribute, NodeKind};
    use rstest::rstest;

    fn tag(src: &str, name: &str, attrs: &[(&str, usize, usize)], self_closing: bool) -> MarkupNode {
        let open_end = src.find('>').unwrap() + 1;
        MarkupNode {
            kind: NodeKind::Element,
            name: name.to_string(),
            start: Position {
                offset: 0,
                line: 1,
                column: 1,
            },
            end: src.len(),
            name_end: name.len() + 1,
            open_end,
            self_closing,
            attributes: attrs
                .iter()
                .map(|(n, s, e)| Attribute::named(*n, *s, *e))
                .collect(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_payload_format() {
        let p = LocationPayload::new("src/App.tpl", Position { offset: 0, line: 1, column: 1 });
        assert_eq!(p.to_string(), "src/App.tpl:1:1");
        assert_eq!(p.attribute("data-v-inspector"), " data-v-inspector=\"src/App.tpl:1:1\"");
    }

    #[test]
    fn test_payload_escaping_round_trips() {
        let p = LocationPayload {
            file: "src/a\"b&c.tsx".to_string(),
            line: 3,
            column: 5,
        };
        let attr = p.attribute("k");
        assert_eq!(attr, " k=\"src/a&quot;b&amp;c.tsx:3:5\"");
        let value = attr.trim_start_matches(" k=\"").trim_end_matches('"');
        assert_eq!(LocationPayload::parse(value), Some(p));
    }

    #[test]
    fn test_payload_parse_uses_last_two_numbers() {
        let p = LocationPayload::parse("C:/w/src/App.vue:12:7").unwrap();
        assert_eq!(p.file, "C:/w/src/App.vue");
        assert_eq!((p.line, p.column), (12, 7));
        assert!(LocationPayload::parse("src/App.vue:12").is_none());
    }

    #[rstest]
    #[case::no_attrs("<div>x</div>", "div", &[], false, InsertionStrategy::AfterAttributes, 4)]
    #[case::after_max_attr("<a x=\"1\" yy=\"2\">", "a", &[("yy", 9, 15), ("x", 3, 8)], false, InsertionStrategy::AfterAttributes, 15)]
    #[case::before_gt("<div x=\"1\">", "div", &[("x", 5, 10)], false, InsertionStrategy::BeforeClose, 10)]
    #[case::before_slash_gt("<br />", "br", &[], true, InsertionStrategy::BeforeClose, 4)]
    fn test_insertion_offset(
        #[case] src: &str,
        #[case] name: &str,
        #[case] attrs: &[(&str, usize, usize)],
        #[case] self_closing: bool,
        #[case] strategy: InsertionStrategy,
        #[case] expected: usize,
    ) {
        let node = tag(src, name, attrs, self_closing);
        assert_eq!(insertion_offset(&node, strategy, node.name_end).unwrap(), expected);
    }

    #[test]
    fn test_inconsistent_ranges_are_fatal() {
        let mut node = tag("<div x>", "div", &[("x", 5, 40)], false);
        let err = insertion_offset(&node, InsertionStrategy::AfterAttributes, 4).unwrap_err();
        assert!(matches!(err, TransformError::InconsistentRange { .. }));

        node.attributes.clear();
        node.end = 0;
        node.start.offset = 3;
        let err = insertion_offset(&node, InsertionStrategy::AfterAttributes, 4).unwrap_err();
        assert!(matches!(err, TransformError::InconsistentRange { .. }));
    }
}

//! Parser adapter for template-tag markup (`.vue` single file components,
//! plain HTML templates).
//!
//! This is a scanner, not a full HTML parser: it only needs element
//! boundaries, tag names and attribute extents. It mirrors the template
//! compiler's rules closely enough that anything the compiler accepts
//! produces the same element tree, and anything it rejects (unclosed
//! elements, stray end tags) is rejected here too.

use crate::error::{Result, TransformError};
use crate::grammar::{GrammarKind, MarkupGrammar};
use crate::node::{Attribute, LineIndex, MarkupNode, NodeKind};

const EXCLUDED_TAGS: &[&str] = &["template", "script", "style"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "textarea", "title", "iframe", "xmp", "noembed", "noframes", "noscript",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGrammar;

impl MarkupGrammar for TemplateGrammar {
    fn kind(&self) -> GrammarKind {
        GrammarKind::Template
    }

    fn parse(&self, source: &str, file: &str) -> Result<Vec<MarkupNode>> {
        TemplateParser::new(source, file).parse()
    }

    fn excluded_tags(&self) -> &'static [&'static str] {
        EXCLUDED_TAGS
    }

    fn carries_key(&self, attr_name: &str, key: &str) -> bool {
        // `:key` and `v-bind:key` render the same DOM attribute
        attr_name == key
            || attr_name.strip_prefix(':') == Some(key)
            || attr_name.strip_prefix("v-bind:") == Some(key)
    }

    /// `<` plus the tag name.
    fn name_anchor(&self, node: &MarkupNode) -> usize {
        node.start.offset + node.name.len() + 1
    }
}

fn classify(name: &str) -> NodeKind {
    match name {
        "slot" => NodeKind::Slot,
        "template" => NodeKind::Template,
        "component" => NodeKind::Component,
        _ if name.starts_with(|c: char| c.is_ascii_uppercase()) => NodeKind::Component,
        _ if name.contains(['-', '.']) => NodeKind::Component,
        _ => NodeKind::Element,
    }
}

struct TemplateParser<'a> {
    source: &'a str,
    file: &'a str,
    index: LineIndex<'a>,
    pos: usize,
    // names and start offsets of currently open elements
    open: Vec<(String, usize)>,
}

impl<'a> TemplateParser<'a> {
    fn new(source: &'a str, file: &'a str) -> Self {
        Self {
            source,
            file,
            index: LineIndex::new(source),
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<MarkupNode>> {
        self.parse_children()
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> TransformError {
        let at = self.index.position(offset);
        TransformError::parse(self.file, at.line, at.column, message)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_whitespace()).len();
    }

    /// Parse siblings until EOF or the end tag of the innermost open element,
    /// which is consumed.
    fn parse_children(&mut self) -> Result<Vec<MarkupNode>> {
        let mut nodes = Vec::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                if let Some((name, start)) = self.open.last() {
                    return Err(self.error(*start, format!("element <{name}> is missing its end tag")));
                }
                return Ok(nodes);
            }

            if rest.starts_with("{{") {
                nodes.push(self.parse_interpolation()?);
            } else if rest.starts_with("<!--") {
                nodes.push(self.parse_delimited("<!--", "-->", "comment")?);
            } else if rest.starts_with("<![CDATA[") {
                nodes.push(self.parse_delimited("<![CDATA[", "]]>", "CDATA section")?);
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                nodes.push(self.parse_delimited("<", ">", "declaration")?);
            } else if let Some(after) = rest.strip_prefix("</") {
                if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    self.parse_end_tag(after)?;
                    return Ok(nodes);
                }
                if after.starts_with('>') {
                    return Err(self.error(self.pos, "end tag is missing its name"));
                }
                nodes.push(self.parse_delimited("</", ">", "end tag")?);
            } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                nodes.push(self.parse_element()?);
            } else {
                nodes.push(self.parse_text());
            }
        }
    }

    fn parse_text(&mut self) -> MarkupNode {
        let start = self.pos;
        let rest = self.rest();
        let first = rest.chars().next().map_or(1, char::len_utf8);
        let tail = &rest[first..];
        let len = [tail.find('<'), tail.find("{{")]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(tail.len());
        self.pos = start + first + len;
        MarkupNode::leaf(NodeKind::Text, self.index.position(start), self.pos)
    }

    fn parse_interpolation(&mut self) -> Result<MarkupNode> {
        let start = self.pos;
        let close = self.source[start + 2..]
            .find("}}")
            .ok_or_else(|| self.error(start, "interpolation is missing its closing `}}`"))?;
        self.pos = start + 2 + close + 2;
        Ok(MarkupNode::leaf(NodeKind::Text, self.index.position(start), self.pos))
    }

    fn parse_delimited(&mut self, open: &str, close: &str, what: &str) -> Result<MarkupNode> {
        let start = self.pos;
        let body = start + open.len();
        let len = self.source[body..]
            .find(close)
            .ok_or_else(|| self.error(start, format!("unterminated {what}")))?;
        self.pos = body + len + close.len();
        Ok(MarkupNode::leaf(NodeKind::Comment, self.index.position(start), self.pos))
    }

    fn parse_end_tag(&mut self, after: &str) -> Result<()> {
        let start = self.pos;
        let name_len = after
            .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
            .unwrap_or(after.len());
        let name = &after[..name_len];

        match self.open.last() {
            Some((open, _)) if open.eq_ignore_ascii_case(name) => {
                let close = after
                    .find('>')
                    .ok_or_else(|| self.error(start, format!("unterminated end tag </{name}>")))?;
                self.pos = start + 2 + close + 1;
                Ok(())
            }
            Some((open, open_start)) if self.open.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) => {
                Err(self.error(*open_start, format!("element <{open}> is missing its end tag")))
            }
            _ => Err(self.error(start, format!("unexpected end tag </{name}>"))),
        }
    }

    fn parse_element(&mut self) -> Result<MarkupNode> {
        let start = self.pos;
        let name_start = start + 1;
        let name_len = self.source[name_start..]
            .find(|c: char| c.is_ascii_whitespace() || matches!(c, '/' | '>' | '<'))
            .unwrap_or(self.source.len() - name_start);
        let name = self.source[name_start..name_start + name_len].to_string();
        self.pos = name_start + name_len;

        let mut attributes = Vec::new();
        let (open_end, self_closing) = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(start, format!("unexpected end of file inside <{name}>")));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break (self.pos, true);
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break (self.pos, false);
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            if rest.starts_with('<') {
                return Err(self.error(start, format!("unexpected `<` inside <{name}>")));
            }
            attributes.push(self.parse_attribute(start, &name)?);
        };

        let mut node = MarkupNode {
            kind: classify(&name),
            name,
            start: self.index.position(start),
            end: open_end,
            name_end: name_start + name_len,
            open_end,
            self_closing,
            attributes,
            children: Vec::new(),
        };

        if self_closing || VOID_TAGS.contains(&node.name.as_str()) {
            return Ok(node);
        }

        if RAW_TEXT_TAGS.iter().any(|t| t.eq_ignore_ascii_case(&node.name)) {
            let (content_end, end) = self.skip_raw_text(start, &node.name)?;
            if content_end > open_end {
                node.children
                    .push(MarkupNode::leaf(NodeKind::Text, self.index.position(open_end), content_end));
            }
            node.end = end;
            return Ok(node);
        }

        self.open.push((node.name.clone(), start));
        node.children = self.parse_children()?;
        self.open.pop();
        node.end = self.pos;
        Ok(node)
    }

    fn parse_attribute(&mut self, tag_start: usize, tag: &str) -> Result<Attribute> {
        let bytes = self.source.as_bytes();
        let attr_start = self.pos;
        let mut i = attr_start;
        while i < bytes.len() {
            let b = bytes[i];
            if i == attr_start && b == b'=' {
                i += 1;
                continue;
            }
            if b.is_ascii_whitespace() || b == b'>' || b == b'=' || b == b'/' {
                break;
            }
            if b == b'[' {
                // dynamic directive argument, e.g. `:[key]` or `v-on:[event]`
                let close = self.source[i..]
                    .find(']')
                    .ok_or_else(|| self.error(i, format!("unterminated dynamic argument in <{tag}>")))?;
                i += close + 1;
                continue;
            }
            i += 1;
        }

        let name = self.source[attr_start..i].to_string();
        self.pos = i;
        let mut end = i;

        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            self.pos = end;
            return Ok(Attribute::named(name, attr_start, end));
        }
        self.pos += 1;
        self.skip_whitespace();

        let rest = self.rest();
        match rest.as_bytes().first() {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let close = rest[1..].find(quote as char).ok_or_else(|| {
                    self.error(tag_start, format!("unterminated value for attribute `{name}` in <{tag}>"))
                })?;
                end = self.pos + 1 + close + 1;
            }
            Some(_) => {
                let len = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                end = self.pos + len;
            }
            None => {
                return Err(self.error(tag_start, format!("unexpected end of file inside <{tag}>")));
            }
        }
        self.pos = end;
        Ok(Attribute::named(name, attr_start, end))
    }

    /// Skip the body of a raw text element. Returns (end of content, end of
    /// the closing tag).
    fn skip_raw_text(&mut self, start: usize, name: &str) -> Result<(usize, usize)> {
        let haystack = self.rest().to_ascii_lowercase();
        let needle = format!("</{}", name.to_ascii_lowercase());
        let mut from = 0;
        while let Some(found) = haystack[from..].find(&needle) {
            let close_start = from + found;
            let after = close_start + needle.len();
            let terminated = haystack[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_whitespace() || c == '/' || c == '>');
            if terminated {
                if let Some(gt) = haystack[after..].find('>') {
                    let content_end = self.pos + close_start;
                    self.pos += after + gt + 1;
                    return Ok((content_end, self.pos));
                }
                break;
            }
            from = after;
        }
        Err(self.error(start, format!("element <{name}> is missing its end tag")))
    }
}

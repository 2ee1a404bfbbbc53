//! Parser adapter for markup embedded in script expressions (JSX / TSX).
//!
//! swc parses the whole module; a `Visit` pass then lowers every
//! `JSXElement` and `JSXFragment` into the shared node tree, keeping the
//! nesting so traversal order matches the other grammar. Positions come
//! from the swc `SourceMap` the module was parsed from.

use swc_core::{
    common::{sync::Lrc, BytePos, FileName, Globals, SourceFile, SourceMap, Spanned, GLOBALS},
    ecma::{
        ast::*,
        parser::{error::Error as ParserError, EsSyntax, Parser, StringInput, Syntax, TsSyntax},
        visit::{Visit, VisitWith},
    },
};

use crate::error::{Result, TransformError};
use crate::grammar::{GrammarKind, MarkupGrammar};
use crate::node::{Attribute, MarkupNode, NodeKind, Position};

const EXCLUDED_TAGS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, Copy)]
pub struct ExpressionGrammar {
    syntax: Syntax,
}

impl ExpressionGrammar {
    pub fn new(syntax: Syntax) -> Self {
        Self { syntax }
    }

    /// Pick the script flavour from the file extension. Unknown extensions
    /// get the most permissive flavour (TSX with decorators).
    pub fn for_filename(filename: &str) -> Self {
        let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let syntax = match ext {
            "js" | "jsx" | "mjs" | "cjs" => Syntax::Es(EsSyntax {
                jsx: true,
                decorators: true,
                import_attributes: true,
                ..Default::default()
            }),
            "ts" | "mts" | "cts" => Syntax::Typescript(TsSyntax {
                decorators: true,
                ..Default::default()
            }),
            _ => Syntax::Typescript(TsSyntax {
                tsx: true,
                decorators: true,
                ..Default::default()
            }),
        };
        Self::new(syntax)
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    fn parse_module(&self, fm: &SourceFile) -> std::result::Result<Module, ParserError> {
        GLOBALS.set(&Globals::new(), || {
            let mut parser = Parser::new(self.syntax, StringInput::from(fm), None);
            let module = parser.parse_module()?;
            // recovered errors still mean the file is malformed
            match parser.take_errors().into_iter().next() {
                Some(err) => Err(err),
                None => Ok(module),
            }
        })
    }
}

impl MarkupGrammar for ExpressionGrammar {
    fn kind(&self) -> GrammarKind {
        GrammarKind::Expression
    }

    fn parse(&self, source: &str, file: &str) -> Result<Vec<MarkupNode>> {
        let text = SourceText::new(source, file);
        let module = self.parse_module(&text.fm).map_err(|err| {
            let (line, column) = text
                .line_col(err.span().lo)
                .map(|at| (at.line, at.column))
                .unwrap_or((1, 1));
            TransformError::parse(file, line, column, err.kind().msg())
        })?;

        let mut collector = JsxCollector {
            text: &text,
            stack: Vec::new(),
            roots: Vec::new(),
            error: None,
        };
        module.visit_with(&mut collector);
        collector.finish()
    }

    fn excluded_tags(&self) -> &'static [&'static str] {
        EXCLUDED_TAGS
    }
}

/// The source registered in an swc `SourceMap`, with helpers mapping
/// `BytePos` back to offsets into the caller's text.
struct SourceText<'a> {
    source: &'a str,
    cm: Lrc<SourceMap>,
    fm: Lrc<SourceFile>,
    // swc drops a leading BOM; offsets into `source` are shifted by its length
    bom: usize,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str, file: &str) -> Self {
        let body = source.strip_prefix('\u{feff}').unwrap_or(source);
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(Lrc::new(FileName::Custom(file.to_string())), body.to_string());
        Self {
            source,
            cm,
            fm,
            bom: source.len() - body.len(),
        }
    }

    fn offset(&self, pos: BytePos) -> Result<usize> {
        pos.0
            .checked_sub(self.fm.start_pos.0)
            .map(|o| o as usize + self.bom)
            .filter(|o| *o <= self.source.len())
            .ok_or_else(|| TransformError::inconsistent(pos.0 as usize, "span lies outside the source text"))
    }

    /// 1-based line and character column of `pos`.
    fn line_col(&self, pos: BytePos) -> Result<Position> {
        let offset = self.offset(pos)?;
        let loc = self
            .cm
            .try_lookup_char_pos(pos)
            .map_err(|_| TransformError::inconsistent(offset, "position is not in the parsed file"))?;
        Ok(Position {
            offset,
            line: loc.line,
            column: loc.col.0 + 1,
        })
    }

    fn slice(&self, start: usize, end: usize) -> Result<&'a str> {
        self.source
            .get(start..end)
            .ok_or_else(|| TransformError::inconsistent(start, "range is not valid text"))
    }
}

/// Skip whitespace and comments forward from `from`; the offset of the next
/// significant byte.
fn skip_trivia(source: &str, mut from: usize) -> usize {
    loop {
        let rest = &source[from..];
        let trimmed = rest.trim_start();
        from += rest.len() - trimmed.len();
        if let Some(body) = trimmed.strip_prefix("/*") {
            match body.find("*/") {
                Some(end) => from += 2 + end + 2,
                None => return source.len(),
            }
        } else if let Some(body) = trimmed.strip_prefix("//") {
            match body.find('\n') {
                Some(end) => from += 2 + end + 1,
                None => return source.len(),
            }
        } else {
            return from;
        }
    }
}

/// Skip whitespace and block comments backward from `to`; the offset just
/// past the previous significant byte.
fn skip_trivia_back(source: &str, mut to: usize) -> usize {
    loop {
        let before = &source[..to];
        let trimmed = before.trim_end();
        to = trimmed.len();
        match trimmed.strip_suffix("*/").and_then(|body| body.rfind("/*")) {
            Some(open) => to = open,
            None => return to,
        }
    }
}

fn element_kind(name: &JSXElementName) -> NodeKind {
    match name {
        JSXElementName::Ident(ident) => {
            if ident.sym.chars().next().is_some_and(|c| c.is_lowercase()) {
                NodeKind::Element
            } else {
                NodeKind::Component
            }
        }
        JSXElementName::JSXMemberExpr(_) => NodeKind::Component,
        // <svg:rect>
        JSXElementName::JSXNamespacedName(_) => NodeKind::Element,
    }
}

struct JsxCollector<'a> {
    text: &'a SourceText<'a>,
    // elements whose children are still being visited
    stack: Vec<MarkupNode>,
    roots: Vec<MarkupNode>,
    error: Option<TransformError>,
}

impl JsxCollector<'_> {
    fn finish(self) -> Result<Vec<MarkupNode>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.roots),
        }
    }

    fn attach(&mut self, node: MarkupNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn element_node(&self, el: &JSXElement) -> Result<MarkupNode> {
        let text = self.text;
        let name_span = el.opening.name.span();
        let (name_start, mut name_end) = (text.offset(name_span.lo)?, text.offset(name_span.hi)?);
        let name = text.slice(name_start, name_end)?.to_string();
        // `<Foo<Bar>>`: attributes go after the type arguments
        if let Some(type_args) = &el.opening.type_args {
            name_end = name_end.max(text.offset(type_args.span.hi)?);
        }

        let attributes = el
            .opening
            .attrs
            .iter()
            .map(|attr| self.attribute(attr))
            .collect::<Result<Vec<_>>>()?;

        Ok(MarkupNode {
            kind: element_kind(&el.opening.name),
            name,
            start: text.line_col(el.span.lo)?,
            end: text.offset(el.span.hi)?,
            name_end,
            open_end: text.offset(el.opening.span.hi)?,
            self_closing: el.opening.self_closing,
            attributes,
            children: Vec::new(),
        })
    }

    fn attribute(&self, attr: &JSXAttrOrSpread) -> Result<Attribute> {
        let text = self.text;
        match attr {
            JSXAttrOrSpread::JSXAttr(attr) => {
                let name = match &attr.name {
                    JSXAttrName::Ident(ident) => ident.sym.to_string(),
                    JSXAttrName::JSXNamespacedName(ns) => format!("{}:{}", ns.ns.sym, ns.name.sym),
                };
                let mut end = text.offset(attr.span.hi)?;
                if let Some(value) = &attr.value {
                    end = end.max(text.offset(value.span().hi)?);
                }
                Ok(Attribute::named(name, text.offset(attr.span.lo)?, end))
            }
            JSXAttrOrSpread::SpreadElement(spread) => {
                // the spread span covers `...expr`; the braces sit outside it,
                // possibly with comments in between
                let dots = text.offset(spread.dot3_token.lo)?;
                let inner_end = text.offset(spread.expr.span().hi)?;
                let close = skip_trivia(text.source, inner_end);
                if !text.source[close..].starts_with('}') {
                    return Err(TransformError::inconsistent(
                        inner_end,
                        "spread attribute has no closing brace",
                    ));
                }
                let before = skip_trivia_back(text.source, dots);
                let open = if text.source[..before].ends_with('{') { before - 1 } else { dots };
                Ok(Attribute::spread(open, close + 1))
            }
        }
    }
}

impl Visit for JsxCollector<'_> {
    fn visit_jsx_element(&mut self, el: &JSXElement) {
        if self.error.is_some() {
            return;
        }
        match self.element_node(el) {
            Ok(node) => self.stack.push(node),
            Err(err) => {
                self.error = Some(err);
                return;
            }
        }
        el.visit_children_with(self);
        if let Some(node) = self.stack.pop() {
            self.attach(node);
        }
    }

    fn visit_jsx_fragment(&mut self, frag: &JSXFragment) {
        if self.error.is_some() {
            return;
        }
        let text = self.text;
        let range = text.line_col(frag.span.lo).and_then(|lo| Ok((lo, text.offset(frag.span.hi)?)));
        match range {
            Ok((lo, hi)) => self.stack.push(MarkupNode::leaf(NodeKind::Fragment, lo, hi)),
            Err(err) => {
                self.error = Some(err);
                return;
            }
        }
        frag.visit_children_with(self);
        if let Some(node) = self.stack.pop() {
            self.attach(node);
        }
    }
}

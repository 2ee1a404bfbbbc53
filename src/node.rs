//! Parser-neutral node tree.
//!
//! Both grammar adapters lower their native syntax trees into [`MarkupNode`]s
//! so that eligibility, insertion and traversal never need to know which
//! parser produced a node. All offsets are byte offsets into the original
//! source text.

/// A resolved source location. `line` and `column` are both 1-based; the
/// column counts Unicode scalar values from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Native element (`div`, `span`, ...).
    Element,
    /// Component reference (`MyButton`, `my-button`, `Foo.Bar`).
    Component,
    /// `<slot>` outlet in templates.
    Slot,
    /// `<template>` wrapper in templates.
    Template,
    /// `<>...</>` in expression markup.
    Fragment,
    Text,
    Comment,
}

impl NodeKind {
    pub fn is_element(self) -> bool {
        matches!(self, NodeKind::Element | NodeKind::Component)
    }
}

/// One entry of an opening tag's attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// `None` for spread attributes (`{...props}`), whose contents are unknown.
    pub name: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl Attribute {
    pub fn named(name: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            name: Some(name.into()),
            start,
            end,
        }
    }

    pub fn spread(start: usize, end: usize) -> Self {
        Self {
            name: None,
            start,
            end,
        }
    }

    pub fn is_spread(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupNode {
    pub kind: NodeKind,
    /// Tag name exactly as written; empty for text and comments.
    pub name: String,
    pub start: Position,
    /// End of the whole node, closing tag included.
    pub end: usize,
    /// End of the tag name (and of type arguments, where the grammar has them).
    pub name_end: usize,
    /// End of the opening tag, just past its `>` or `/>`.
    pub open_end: usize,
    pub self_closing: bool,
    pub attributes: Vec<Attribute>,
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    pub fn leaf(kind: NodeKind, start: Position, end: usize) -> Self {
        Self {
            kind,
            name: String::new(),
            start,
            end,
            name_end: start.offset,
            open_end: start.offset,
            self_closing: false,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Largest attribute end offset. Attributes are not guaranteed to be
    /// stored in source order, so this is a max rather than the last entry.
    pub fn attributes_end(&self) -> Option<usize> {
        self.attributes.iter().map(|a| a.end).max()
    }
}

/// Pre-order (parent before children, siblings in source order) walk over a forest.
pub fn pre_order(roots: &[MarkupNode]) -> PreOrder<'_> {
    PreOrder {
        stack: roots.iter().rev().collect(),
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a MarkupNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a MarkupNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Maps byte offsets to 1-based line/column pairs. Lines break on `\n` only.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self
            .source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        Position {
            offset,
            line,
            column: column + 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

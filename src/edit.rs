//! Non-destructive edit buffer.
//!
//! Edits are recorded against the original text and only materialized in a
//! single pass at the end, so no pending offset ever has to be shifted.

use sourcemap::{SourceMap, SourceMapBuilder};

use crate::error::{Result, TransformError};

/// Insert `text` immediately before the byte at `offset` of the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub text: String,
}

impl Edit {
    pub fn new(offset: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            text: text.into(),
        }
    }
}

fn check_offset(original: &str, offset: usize) -> Result<()> {
    if offset > original.len() {
        return Err(TransformError::inconsistent(
            offset,
            format!("edit offset is past the end of the text ({} bytes)", original.len()),
        ));
    }
    if !original.is_char_boundary(offset) {
        return Err(TransformError::inconsistent(offset, "edit offset splits a character"));
    }
    Ok(())
}

/// Stable sort by offset: edits sharing an offset keep insertion order.
fn sorted(edits: &[Edit]) -> Vec<&Edit> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by_key(|e| e.offset);
    ordered
}

fn splice(original: &str, edits: &[&Edit]) -> String {
    let extra: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut out = String::with_capacity(original.len() + extra);
    let mut cursor = 0;
    for edit in edits {
        out.push_str(&original[cursor..edit.offset]);
        out.push_str(&edit.text);
        cursor = edit.offset;
    }
    out.push_str(&original[cursor..]);
    out
}

/// Apply `edits` to `original` in one pass.
pub fn apply(original: &str, edits: &[Edit]) -> Result<String> {
    for edit in edits {
        check_offset(original, edit.offset)?;
    }
    Ok(splice(original, &sorted(edits)))
}

/// Pending insertions over one file's text.
#[derive(Debug, Clone)]
pub struct EditBuffer<'a> {
    original: &'a str,
    edits: Vec<Edit>,
}

impl<'a> EditBuffer<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            edits: Vec::new(),
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Queue an edit. Offsets are validated here so that [`EditBuffer::apply`]
    /// cannot fail.
    pub fn insert(&mut self, edit: Edit) -> Result<()> {
        check_offset(self.original, edit.offset)?;
        self.edits.push(edit);
        Ok(())
    }

    pub fn apply(&self) -> String {
        splice(self.original, &sorted(&self.edits))
    }

    /// Source map from the rewritten text back to the original.
    ///
    /// Every copied original segment gets a mapping at its start and at each
    /// line start inside it; inserted text is left unmapped.
    pub fn source_map(&self, file: &str) -> SourceMap {
        let mut builder = SourceMapBuilder::new(None);
        let source_id = builder.add_source(file);
        builder.set_source_contents(source_id, Some(self.original));

        let mut generated = LineCol::default();
        let mut original = LineCol::default();
        let mut cursor = 0;
        for edit in sorted(&self.edits) {
            let segment = &self.original[cursor..edit.offset];
            map_segment(&mut builder, source_id, &mut generated, &mut original, segment);
            edit.text.chars().for_each(|ch| generated.advance(ch));
            cursor = edit.offset;
        }
        let tail = &self.original[cursor..];
        map_segment(&mut builder, source_id, &mut generated, &mut original, tail);

        builder.into_sourcemap()
    }
}

fn map_segment(
    builder: &mut SourceMapBuilder,
    source_id: u32,
    generated: &mut LineCol,
    original: &mut LineCol,
    segment: &str,
) {
    let mut at_line_start = true;
    for ch in segment.chars() {
        if at_line_start {
            builder.add_raw(
                generated.line,
                generated.col,
                original.line,
                original.col,
                Some(source_id),
                None,
                false,
            );
        }
        generated.advance(ch);
        original.advance(ch);
        at_line_start = ch == '\n';
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LineCol {
    line: u32,
    col: u32,
}

impl LineCol {
    fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            // source map columns are UTF-16 code units
            self.col += ch.len_utf16() as u32;
        }
    }
}

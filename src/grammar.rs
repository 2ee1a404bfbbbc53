use std::fmt;
use std::str::FromStr;

use crate::config::{Framework, InsertionStrategy, ModuleRequest};
use crate::error::{Result, TransformError};
use crate::expression::ExpressionGrammar;
use crate::insertion;
use crate::node::MarkupNode;
use crate::template::TemplateGrammar;

/// Which markup dialect a file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    /// HTML-like template tags (`.vue`, `.html`).
    Template,
    /// Elements embedded in script expressions (`.jsx`, `.tsx`).
    Expression,
}

impl GrammarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GrammarKind::Template => "template",
            GrammarKind::Expression => "expression",
        }
    }

    pub fn default_framework(self) -> Framework {
        match self {
            GrammarKind::Template => Framework::Vue,
            GrammarKind::Expression => Framework::React,
        }
    }

    /// Decide whether a host module should be instrumented at all, and with
    /// which grammar. `None` means "leave this module alone".
    pub fn infer(request: &ModuleRequest, code: &str) -> Option<Self> {
        match request.extension()? {
            "vue" | "html" => match request.query_type() {
                None | Some("template") => Some(GrammarKind::Template),
                Some(_) => None,
            },
            "jsx" | "tsx" => Some(GrammarKind::Expression),
            "js" | "mjs" | "cjs" | "ts" | "mts" | "cts" if code.contains("jsx") => {
                Some(GrammarKind::Expression)
            }
            _ => None,
        }
    }

    /// Build the parser adapter for this grammar. `filename` picks the
    /// script flavour for expression markup.
    pub fn adapter(self, filename: &str) -> Box<dyn MarkupGrammar> {
        match self {
            GrammarKind::Template => Box::new(TemplateGrammar),
            GrammarKind::Expression => Box::new(ExpressionGrammar::for_filename(filename)),
        }
    }
}

impl FromStr for GrammarKind {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "template" => Ok(GrammarKind::Template),
            "expression" | "jsx" => Ok(GrammarKind::Expression),
            other => Err(TransformError::UnknownGrammarKind(other.to_string())),
        }
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability shared by both parser adapters.
pub trait MarkupGrammar {
    fn kind(&self) -> GrammarKind;

    /// Parse the whole file into a node forest. Fails on malformed input;
    /// there is no partial recovery.
    fn parse(&self, source: &str, file: &str) -> Result<Vec<MarkupNode>>;

    /// Tag names that are never instrumented.
    fn excluded_tags(&self) -> &'static [&'static str];

    /// Whether an existing attribute with this name already carries `key`.
    fn carries_key(&self, attr_name: &str, key: &str) -> bool {
        attr_name == key
    }

    /// Insertion offset for a node without attributes.
    fn name_anchor(&self, node: &MarkupNode) -> usize {
        node.name_end
    }

    fn locate_insertion(&self, node: &MarkupNode, strategy: InsertionStrategy) -> Result<usize> {
        insertion::insertion_offset(node, strategy, self.name_anchor(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_kind_from_str() {
        assert_eq!("template".parse::<GrammarKind>().unwrap(), GrammarKind::Template);
        assert_eq!("expression".parse::<GrammarKind>().unwrap(), GrammarKind::Expression);
        assert_eq!("jsx".parse::<GrammarKind>().unwrap(), GrammarKind::Expression);
        let err = "markdown".parse::<GrammarKind>().unwrap_err();
        assert!(matches!(err, TransformError::UnknownGrammarKind(ref k) if k == "markdown"));
    }

    #[test]
    fn test_infer_from_request() {
        let infer = |id: &str, code: &str| GrammarKind::infer(&ModuleRequest::parse(id), code);
        assert_eq!(infer("/src/App.vue", ""), Some(GrammarKind::Template));
        assert_eq!(infer("/src/App.vue?vue&type=template", ""), Some(GrammarKind::Template));
        assert_eq!(infer("/src/App.vue?vue&type=style&lang.css", ""), None);
        assert_eq!(infer("/src/App.tsx", ""), Some(GrammarKind::Expression));
        assert_eq!(infer("/src/util.ts", "export const a = 1"), None);
        assert_eq!(
            infer("/src/h.js", "import { jsx } from 'react/jsx-runtime'"),
            Some(GrammarKind::Expression)
        );
        assert_eq!(infer("/src/main.css", ""), None);
    }

    #[test]
    fn test_adapter_kinds() {
        assert_eq!(GrammarKind::Template.adapter("a.vue").kind(), GrammarKind::Template);
        assert_eq!(GrammarKind::Expression.adapter("a.tsx").kind(), GrammarKind::Expression);
        assert_eq!(GrammarKind::Template.default_framework(), Framework::Vue);
        assert_eq!(GrammarKind::Expression.to_string(), "expression");
    }
}

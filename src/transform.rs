use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::config::{relative_path, ModuleRequest, TransformOptions};
use crate::edit::EditBuffer;
use crate::eligibility::{is_eligible, is_tagged};
use crate::error::Result;
use crate::grammar::GrammarKind;
use crate::insertion::compute_insertion;
use crate::node::pre_order;

// -----------------------------------------------------------------------------
// Host-facing types
// -----------------------------------------------------------------------------

/// One file handed over by the host build pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub code: String,
    /// Absolute or root-relative path; a `?query` suffix is ignored.
    pub id: String,
    pub grammar_kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutput {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

impl TransformOutput {
    fn unchanged(code: &str) -> Self {
        Self {
            code: code.to_string(),
            map: None,
        }
    }

    /// `data:` URL for the source map, suitable for a `sourceMappingURL` comment.
    pub fn source_map_data_url(&self) -> Option<String> {
        self.map
            .as_ref()
            .map(|json| format!("data:application/json;charset=utf-8;base64,{}", STANDARD.encode(json)))
    }
}

// -----------------------------------------------------------------------------
// Orchestrator
// -----------------------------------------------------------------------------

/// Stateless per-file transformer. Holds only configuration, so one instance
/// can serve any number of files, from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    options: TransformOptions,
}

impl Transformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Handle a host request. The grammar kind is validated before any parsing.
    pub fn transform_request(&self, request: &TransformRequest) -> Result<TransformOutput> {
        let kind: GrammarKind = request.grammar_kind.parse()?;
        self.transform(&request.code, &request.id, kind)
    }

    /// Instrument a module only if its id looks like markup; `None` means the
    /// module is not ours to touch.
    pub fn transform_module(&self, code: &str, id: &str) -> Result<Option<TransformOutput>> {
        match GrammarKind::infer(&ModuleRequest::parse(id), code) {
            Some(kind) => self.transform(code, id, kind).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(level = "debug", skip_all, fields(id = %id, grammar = %kind))]
    pub fn transform(&self, code: &str, id: &str, kind: GrammarKind) -> Result<TransformOutput> {
        let request = ModuleRequest::parse(id);
        let file = relative_path(self.options.root.as_deref(), &request.filename);
        let key = self
            .options
            .framework
            .unwrap_or_else(|| kind.default_framework())
            .location_key();

        let grammar = kind.adapter(&request.filename);
        let tree = grammar.parse(code, &file)?;

        let mut buffer = EditBuffer::new(code);
        for node in pre_order(&tree) {
            if !is_eligible(grammar.as_ref(), node, key) {
                if node.kind.is_element() && is_tagged(grammar.as_ref(), node, key) {
                    trace!(tag = %node.name, line = node.start.line, "already tagged");
                }
                continue;
            }
            let edit = compute_insertion(grammar.as_ref(), node, self.options.insertion_strategy, &file, key)?;
            buffer.insert(edit)?;
        }

        debug!(file = %file, edits = buffer.len(), "location attributes computed");
        if buffer.is_empty() {
            return Ok(TransformOutput::unchanged(code));
        }

        let map = if self.options.source_map {
            let mut json = Vec::new();
            buffer.source_map(&file).to_writer(&mut json)?;
            Some(String::from_utf8_lossy(&json).into_owned())
        } else {
            None
        };

        Ok(TransformOutput {
            code: buffer.apply(),
            map,
        })
    }
}

/// One-shot helper around [`Transformer::transform`].
pub fn transform(code: &str, id: &str, kind: GrammarKind, options: &TransformOptions) -> Result<TransformOutput> {
    Transformer::new(options.clone()).transform(code, id, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Framework, InsertionStrategy};
    use crate::error::TransformError;

    #[test]
    fn test_template_scenario() {
        let out = transform("<div>hi</div>", "src/App.tpl", GrammarKind::Template, &TransformOptions::default()).unwrap();
        assert_eq!(out.code, "<div data-v-inspector=\"src/App.tpl:1:1\">hi</div>");
        assert!(out.map.is_none());
    }

    #[test]
    fn test_root_and_query_are_resolved() {
        let opts = TransformOptions::default().with_root("/repo");
        let out = transform("<p/>", "/repo/src/A.vue?vue&type=template", GrammarKind::Template, &opts).unwrap();
        assert_eq!(out.code, "<p data-v-inspector=\"src/A.vue:1:1\"/>");
    }

    #[test]
    fn test_framework_override_changes_key() {
        let opts = TransformOptions::default().with_framework(Framework::Vue);
        let out = transform("const a = <i />", "a.jsx", GrammarKind::Expression, &opts).unwrap();
        assert_eq!(out.code, "const a = <i data-v-inspector=\"a.jsx:1:11\" />");
    }

    #[test]
    fn test_before_close_strategy() {
        let opts = TransformOptions::default().with_insertion_strategy(InsertionStrategy::BeforeClose);
        let out = transform("const a = <i x=\"1\"/>", "a.jsx", GrammarKind::Expression, &opts).unwrap();
        assert_eq!(out.code, "const a = <i x=\"1\" data-react-inspector=\"a.jsx:1:11\"/>");
    }

    #[test]
    fn test_unknown_grammar_kind_is_rejected_before_parsing() {
        let request = TransformRequest {
            code: "<<< not parseable".to_string(),
            id: "a.md".to_string(),
            grammar_kind: "markdown".to_string(),
        };
        let err = Transformer::default().transform_request(&request).unwrap_err();
        assert!(matches!(err, TransformError::UnknownGrammarKind(_)));
    }

    #[test]
    fn test_request_from_json() {
        let request: TransformRequest =
            serde_json::from_str(r#"{"code":"<b></b>","id":"x.vue","grammarKind":"template"}"#).unwrap();
        let out = Transformer::default().transform_request(&request).unwrap();
        assert_eq!(out.code, "<b data-v-inspector=\"x.vue:1:1\"></b>");
    }

    #[test]
    fn test_transform_module_skips_foreign_files() {
        let t = Transformer::default();
        assert!(t.transform_module("body {}", "/src/a.css").unwrap().is_none());
        assert!(t.transform_module("<p></p>", "/src/a.vue?vue&type=style").unwrap().is_none());
        let out = t.transform_module("<p></p>", "/src/a.vue").unwrap().unwrap();
        assert!(out.code.contains("data-v-inspector"));
    }

    #[test]
    fn test_source_map_output() {
        let opts = TransformOptions::default().with_source_map(true);
        let out = transform("<div>\n<b/>\n</div>", "m.vue", GrammarKind::Template, &opts).unwrap();
        let map = out.map.as_deref().unwrap();
        assert!(map.contains("\"version\":3"));
        assert!(map.contains("m.vue"));
        let url = out.source_map_data_url().unwrap();
        assert!(url.starts_with("data:application/json;charset=utf-8;base64,"));
    }

    #[test]
    fn test_no_eligible_nodes_returns_input_unchanged() {
        let opts = TransformOptions::default().with_source_map(true);
        let out = transform("const x = 1;\n", "a.ts", GrammarKind::Expression, &opts).unwrap();
        assert_eq!(out.code, "const x = 1;\n");
        assert!(out.map.is_none());
    }
}

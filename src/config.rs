use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Result;

pub const KEY_DATA_VUE: &str = "data-v-inspector";
pub const KEY_DATA_REACT: &str = "data-react-inspector";

// -----------------------------------------------------------------------------
// Options
// -----------------------------------------------------------------------------

/// Markup dialect family; decides which location attribute key is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Vue,
    React,
}

impl Framework {
    pub fn location_key(self) -> &'static str {
        match self {
            Framework::Vue => KEY_DATA_VUE,
            Framework::React => KEY_DATA_REACT,
        }
    }

    /// Marker attribute the runtime reader uses to stop walking up the tree.
    /// Only ever read by the runtime; the rewriter leaves it untouched.
    pub fn ignore_key(self) -> &'static str {
        match self {
            Framework::Vue => "data-v-inspector-ignore",
            Framework::React => "data-react-inspector-ignore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertionStrategy {
    /// After the last attribute, or right after the tag name.
    #[default]
    AfterAttributes,
    /// Right before the opening tag's `>` or `/>`.
    BeforeClose,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Directory file identities are made relative to. When unset, ids are
    /// used as given (after normalization).
    pub root: Option<String>,
    /// Overrides the attribute key; otherwise it follows the grammar.
    pub framework: Option<Framework>,
    pub insertion_strategy: InsertionStrategy,
    pub source_map: bool,
}

impl TransformOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn with_insertion_strategy(mut self, strategy: InsertionStrategy) -> Self {
        self.insertion_strategy = strategy;
        self
    }

    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }
}

// -----------------------------------------------------------------------------
// Filename helpers
// -----------------------------------------------------------------------------

/// Normalize bundler style filenames: forward slashes, no `file://` scheme.
pub fn normalize_filename(filename: &str) -> String {
    let s = filename.replace('\\', "/");
    if let Some(rest) = s.strip_prefix("file:///") {
        // keep the leading slash on unix paths, drop it before a drive letter
        if has_drive_letter(rest) {
            return rest.to_string();
        }
        return format!("/{rest}");
    }
    if let Some(rest) = s.strip_prefix("file://") {
        return rest.to_string();
    }
    s
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || has_drive_letter(path)
}

/// Split into path segments, resolving `.` and `..` lexically.
fn segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(last) if *last != "..") {
                    out.pop();
                } else if !is_absolute(path) {
                    out.push("..");
                }
            }
            _ => out.push(seg),
        }
    }
    out
}

/// Express `file` relative to `root`, always with forward slashes.
///
/// Relative files are assumed to already be root-relative. Absolute files
/// outside the root get leading `..` segments.
pub fn relative_path(root: Option<&str>, file: &str) -> String {
    let file = normalize_filename(file);
    let root = match root {
        Some(root) if !root.is_empty() && is_absolute(&file) => normalize_filename(root),
        _ => {
            let joined = segments(&file).join("/");
            return if file.starts_with('/') { format!("/{joined}") } else { joined };
        }
    };

    let root_segs = segments(&root);
    let file_segs = segments(&file);
    let common = root_segs
        .iter()
        .zip(&file_segs)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; root_segs.len() - common];
    parts.extend(&file_segs[common..]);
    parts.join("/")
}

// -----------------------------------------------------------------------------
// Request ids
// -----------------------------------------------------------------------------

/// A host module id split into file name and query (`/src/App.vue?vue&type=style`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    pub filename: String,
    pub query: BTreeMap<String, String>,
}

impl ModuleRequest {
    pub fn parse(id: &str) -> Self {
        let (filename, raw_query) = match id.split_once('?') {
            Some((f, q)) => (f, q),
            None => (id, ""),
        };
        let query = raw_query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        Self {
            filename: filename.to_string(),
            query,
        }
    }

    pub fn query_type(&self) -> Option<&str> {
        self.query.get("type").map(String::as_str)
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.filename.rsplit(['/', '\\']).next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let opts = TransformOptions::from_json(
            r#"{"root":"/repo","framework":"vue","insertionStrategy":"beforeClose","sourceMap":true}"#,
        )
        .unwrap();
        assert_eq!(opts.root.as_deref(), Some("/repo"));
        assert_eq!(opts.framework, Some(Framework::Vue));
        assert_eq!(opts.insertion_strategy, InsertionStrategy::BeforeClose);
        assert!(opts.source_map);
    }

    #[test]
    fn test_options_defaults_and_errors() {
        let opts = TransformOptions::from_json("{}").unwrap();
        assert!(opts.root.is_none());
        assert_eq!(opts.insertion_strategy, InsertionStrategy::AfterAttributes);
        assert!(TransformOptions::from_json("{\"framework\":\"svelte\"}").is_err());
    }

    #[test]
    fn test_normalize_filename() {
        assert_eq!(normalize_filename(r"src\components\App.vue"), "src/components/App.vue");
        assert_eq!(normalize_filename("file:///home/me/a.tsx"), "/home/me/a.tsx");
        assert_eq!(normalize_filename("file:///C:/work/a.tsx"), "C:/work/a.tsx");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path(Some("/repo"), "/repo/src/App.tsx"), "src/App.tsx");
        assert_eq!(relative_path(Some("/repo/"), "/repo/./src/../src/App.tsx"), "src/App.tsx");
        assert_eq!(relative_path(Some("/repo/app"), "/repo/lib/x.vue"), "../lib/x.vue");
        assert_eq!(relative_path(Some(r"C:\repo"), r"C:\repo\src\App.tsx"), "src/App.tsx");
        assert_eq!(relative_path(Some("/repo"), "src/App.tsx"), "src/App.tsx");
        assert_eq!(relative_path(None, "./src/App.tpl"), "src/App.tpl");
    }

    #[test]
    fn test_module_request_parse() {
        let req = ModuleRequest::parse("/src/App.vue?vue&type=style&index=0");
        assert_eq!(req.filename, "/src/App.vue");
        assert_eq!(req.query_type(), Some("style"));
        assert_eq!(req.query.get("vue").map(String::as_str), Some(""));
        assert_eq!(req.extension(), Some("vue"));

        let plain = ModuleRequest::parse("src/.hidden");
        assert!(plain.query.is_empty());
        assert_eq!(plain.extension(), None);
    }

    #[test]
    fn test_framework_keys() {
        assert_eq!(Framework::Vue.location_key(), "data-v-inspector");
        assert_eq!(Framework::React.ignore_key(), "data-react-inspector-ignore");
    }
}

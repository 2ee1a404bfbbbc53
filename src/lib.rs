//! Build-time location tagging for markup sources.
//!
//! Every element and component in a template file (`.vue`, `.html`) or in
//! JSX/TSX gains one attribute whose value is its origin,
//! `path:line:column`, so a running page can be traced back to source:
//!
//! ```text
//! <div>hi</div>   ->   <div data-v-inspector="src/App.vue:1:1">hi</div>
//! ```
//!
//! The rewrite only inserts text. Everything else in the file is kept
//! byte-for-byte, already-tagged elements are skipped (so running twice is a
//! no-op), and `script`/`style` contents are never touched.
//!
//! Lines and columns are both 1-based in either grammar; columns count
//! Unicode scalar values.

pub mod config;
pub mod edit;
pub mod eligibility;
pub mod error;
pub mod expression;
pub mod grammar;
pub mod insertion;
pub mod node;
pub mod template;
pub mod transform;

pub use config::{Framework, InsertionStrategy, ModuleRequest, TransformOptions, KEY_DATA_REACT, KEY_DATA_VUE};
pub use edit::{apply, Edit, EditBuffer};
pub use eligibility::is_eligible;
pub use error::{Result, TransformError};
pub use grammar::{GrammarKind, MarkupGrammar};
pub use insertion::{compute_insertion, LocationPayload};
pub use node::{MarkupNode, NodeKind};
pub use transform::{transform, TransformOutput, TransformRequest, Transformer};

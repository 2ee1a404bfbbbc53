use thiserror::Error;

pub type Result<T, E = TransformError> = std::result::Result<T, E>;

/// Everything that can stop a single file from being instrumented.
///
/// There is no partial-success mode: any of these aborts the file and the
/// caller gets no rewritten text at all.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("inconsistent source range at offset {offset}: {message}")]
    InconsistentRange { offset: usize, message: String },

    #[error("unknown grammar kind `{0}` (expected `template` or `expression`)")]
    UnknownGrammarKind(String),

    #[error("invalid transform options: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to build source map: {0}")]
    SourceMap(#[from] sourcemap::Error),
}

impl TransformError {
    pub fn parse(file: impl Into<String>, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn inconsistent(offset: usize, message: impl Into<String>) -> Self {
        Self::InconsistentRange {
            offset,
            message: message.into(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

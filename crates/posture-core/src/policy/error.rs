//! Errors raised while loading a policy document.

use thiserror::Error;

/// Marker carried by clause-shape errors raised inside the YAML deserializer,
/// used to lift them into [`PolicyError::ClauseShape`].
pub(crate) const CLAUSE_SHAPE_MARKER: &str = "invalid clause";

/// A malformed policy document or a schema violation. Always fatal: the run
/// stops before any check is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("line {}: {message}", fmt_line(.line))]
    Syntax { line: Option<usize>, message: String },

    #[error("line {}: {detail}", fmt_line(.line))]
    ClauseShape { line: Option<usize>, detail: String },

    #[error("unsupported policy version: {0}")]
    UnsupportedVersion(i64),

    #[error("statement '{statement}': confidence list must not be empty")]
    EmptyConfidence { statement: String },

    #[error("duplicate statement name: {name}")]
    DuplicateStatement { name: String },

    #[error("read policy file {path}: {detail}")]
    Io { path: String, detail: String },
}

fn fmt_line(line: &Option<usize>) -> String {
    line.map_or_else(|| "?".to_string(), |l| l.to_string())
}

impl PolicyError {
    /// Source line the error points at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. } | Self::ClauseShape { line, .. } => *line,
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for PolicyError {
    fn from(err: serde_yaml::Error) -> Self {
        let line = err.location().map(|loc| loc.line());
        let message = err.to_string();
        match message.find(CLAUSE_SHAPE_MARKER) {
            Some(idx) => {
                let tail = &message[idx + CLAUSE_SHAPE_MARKER.len()..];
                let tail = tail.trim_start_matches(':').trim_start();
                let detail = match tail.find(" at line ") {
                    Some(end) => &tail[..end],
                    None => tail,
                };
                Self::ClauseShape {
                    line,
                    detail: detail.to_string(),
                }
            }
            None => Self::Syntax { line, message },
        }
    }
}

/// Result alias for policy loading.
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Severity level for diagnostics
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

impl Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A secondary location attached to a diagnostic, e.g. each member of a
/// dependency cycle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RelatedLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl RelatedLocation {
    pub fn new(file: String, line: usize, column: usize, message: String) -> Self {
        Self { file, line, column, message }
    }
}

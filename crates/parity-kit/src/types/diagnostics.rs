use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::helpers::location::Position;

// Re-export diagnostic types for use and convenience
pub use super::diagnostic_types::{DiagnosticLevel, RelatedLocation};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub code: Option<String>,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub context: Option<String>,
    pub related_locations: Vec<RelatedLocation>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: String) -> Diagnostic {
        Diagnostic {
            level,
            message,
            code: None,
            file: None,
            line: None,
            column: None,
            context: None,
            related_locations: Vec::new(),
        }
    }

    pub fn error_from_string(message: String) -> Diagnostic {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning_from_string(message: String) -> Diagnostic {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    // Builder methods
    pub fn error(message: impl Into<String>) -> Self {
        Self::error_from_string(message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::warning_from_string(message.into())
    }

    pub fn with_code(mut self, code: impl AsRef<str>) -> Self {
        self.code = Some(code.as_ref().to_string());
        self
    }

    pub fn with_file(mut self, file: impl AsRef<str>) -> Self {
        self.file = Some(file.as_ref().to_string());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_position(self, position: Option<Position>) -> Self {
        match position {
            Some(position) => self.with_line(position.line).with_column(position.column),
            None => self,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_related_location(mut self, related: RelatedLocation) -> Self {
        self.related_locations.push(related);
        self
    }

    /// Promotes a warning to an error, used when schema checks are strict.
    pub fn escalate(mut self) -> Self {
        self.level = DiagnosticLevel::Error;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.level, DiagnosticLevel::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.level, DiagnosticLevel::Warning)
    }

    /// `file:line:column` when known, empty otherwise.
    pub fn location_string(&self) -> String {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(column)) => format!("{}:{}:{}", file, line, column),
            (Some(file), Some(line), None) => format!("{}:{}", file, line),
            (Some(file), None, _) => file.clone(),
            (None, Some(line), Some(column)) => format!("{}:{}", line, column),
            _ => String::new(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = self.location_string();
        if !location.is_empty() {
            write!(f, "{}: ", location)?;
        }
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.level, code, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

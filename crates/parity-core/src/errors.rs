use kit::helpers::location::Position;
use kit::types::diagnostics::{Diagnostic, RelatedLocation};
use kit::ResourceId;
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Stable error category names, used as diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ErrorKind {
    ParseError,
    UnboundVariableError,
    TypeError,
    DuplicateResourceError,
    DuplicateKeyError,
    GraphFinalizedError,
    TooManyResourcesError,
    DeadlineExceededError,
    DanglingReferenceError,
    DuplicateDeclarationError,
    CyclicDependencyError,
    UnsupportedError,
    UnknownFunctionError,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("resource '{0}' is declared more than once")]
    DuplicateResource(ResourceId),
    #[error("output '{0}' is declared more than once")]
    DuplicateOutput(String),
    #[error("cannot add '{0}': the graph is finalized")]
    GraphFinalized(String),
    #[error("'{from}' references '{to}', which is not in the graph")]
    DanglingReference { from: String, to: ResourceId },
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::DuplicateResource(_) => ErrorKind::DuplicateResourceError,
            GraphError::DuplicateOutput(_) => ErrorKind::DuplicateDeclarationError,
            GraphError::GraphFinalized(_) => ErrorKind::GraphFinalizedError,
            GraphError::DanglingReference { .. } => ErrorKind::DanglingReferenceError,
        }
    }
}

/// Errors raised while turning a program into a resource graph. Evaluation
/// stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{message}")]
    Parse { message: String, position: Option<Position> },
    #[error("unbound variable '{name}'")]
    UnboundVariable { name: String, position: Option<Position> },
    #[error("{message}")]
    Type { message: String, position: Option<Position> },
    #[error("duplicate key '{key}' in for expression (use '...' to group values)")]
    DuplicateKey { key: String, position: Option<Position> },
    #[error("'{name}' is declared more than once")]
    DuplicateDeclaration { name: String, position: Option<Position> },
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency {
        cycle: Vec<String>,
        /// Declaration site of each cycle member
        members: Vec<(String, Position)>,
        position: Option<Position>,
    },
    #[error("unsupported: {message}")]
    Unsupported { message: String, position: Option<Position> },
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, position: Option<Position> },
    #[error("{error}")]
    Graph { error: GraphError, position: Option<Position> },
}

impl From<GraphError> for EvalError {
    fn from(error: GraphError) -> Self {
        EvalError::Graph { error, position: None }
    }
}

impl EvalError {
    pub fn parse(message: impl Into<String>, position: Option<Position>) -> Self {
        EvalError::Parse { message: message.into(), position }
    }

    pub fn unbound(name: impl Into<String>) -> Self {
        EvalError::UnboundVariable { name: name.into(), position: None }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type { message: message.into(), position: None }
    }

    pub fn duplicate_key(key: impl Into<String>) -> Self {
        EvalError::DuplicateKey { key: key.into(), position: None }
    }

    pub fn duplicate_declaration(name: impl Into<String>) -> Self {
        EvalError::DuplicateDeclaration { name: name.into(), position: None }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        EvalError::Unsupported { message: message.into(), position: None }
    }

    pub fn unknown_function(name: impl Into<String>) -> Self {
        EvalError::UnknownFunction { name: name.into(), position: None }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Parse { .. } => ErrorKind::ParseError,
            EvalError::UnboundVariable { .. } => ErrorKind::UnboundVariableError,
            EvalError::Type { .. } => ErrorKind::TypeError,
            EvalError::DuplicateKey { .. } => ErrorKind::DuplicateKeyError,
            EvalError::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclarationError,
            EvalError::CyclicDependency { .. } => ErrorKind::CyclicDependencyError,
            EvalError::Unsupported { .. } => ErrorKind::UnsupportedError,
            EvalError::UnknownFunction { .. } => ErrorKind::UnknownFunctionError,
            EvalError::Graph { error, .. } => error.kind(),
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            EvalError::Parse { position, .. }
            | EvalError::UnboundVariable { position, .. }
            | EvalError::Type { position, .. }
            | EvalError::DuplicateKey { position, .. }
            | EvalError::DuplicateDeclaration { position, .. }
            | EvalError::CyclicDependency { position, .. }
            | EvalError::Unsupported { position, .. }
            | EvalError::UnknownFunction { position, .. }
            | EvalError::Graph { position, .. } => *position,
        }
    }

    /// Attaches a position unless a more precise one is already set.
    pub fn or_position(mut self, fallback: Option<Position>) -> Self {
        let slot = match &mut self {
            EvalError::Parse { position, .. }
            | EvalError::UnboundVariable { position, .. }
            | EvalError::Type { position, .. }
            | EvalError::DuplicateKey { position, .. }
            | EvalError::DuplicateDeclaration { position, .. }
            | EvalError::CyclicDependency { position, .. }
            | EvalError::Unsupported { position, .. }
            | EvalError::UnknownFunction { position, .. }
            | EvalError::Graph { position, .. } => position,
        };
        if slot.is_none() {
            *slot = fallback;
        }
        self
    }

    pub fn to_diagnostic(&self, file: &str) -> Diagnostic {
        let mut diagnostic = Diagnostic::error(self.to_string())
            .with_code(self.kind())
            .with_file(file)
            .with_position(self.position());
        if let EvalError::CyclicDependency { members, .. } = self {
            for (name, position) in members.iter() {
                diagnostic = diagnostic.with_related_location(RelatedLocation::new(
                    file.to_string(),
                    position.line,
                    position.column,
                    format!("'{}' is part of the cycle", name),
                ));
            }
        }
        diagnostic
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("graphs hold {count} resources, above the limit of {limit}")]
    TooManyResources { count: usize, limit: usize },
    #[error("equivalence search exceeded its {0}")]
    DeadlineExceeded(String),
}

impl CheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckError::TooManyResources { .. } => ErrorKind::TooManyResourcesError,
            CheckError::DeadlineExceeded(_) => ErrorKind::DeadlineExceededError,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string()).with_code(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innermost_position_wins() {
        let inner = Some(Position::new(3, 7));
        let outer = Some(Position::new(1, 1));
        let err = EvalError::unbound("region").or_position(inner).or_position(outer);
        assert_eq!(err.position(), inner);
    }

    #[test]
    fn test_diagnostic_carries_code_and_location() {
        let err = EvalError::duplicate_key("a").or_position(Some(Position::new(4, 2)));
        let diag = err.to_diagnostic("main.tf");
        assert_eq!(diag.code.as_deref(), Some("DuplicateKeyError"));
        assert_eq!(diag.location_string(), "main.tf:4:2");
    }

    #[test]
    fn test_graph_error_kind_passes_through() {
        let err: EvalError = GraphError::DuplicateResource(ResourceId::new("a", "b")).into();
        assert_eq!(err.kind(), ErrorKind::DuplicateResourceError);
        assert_eq!(err.to_string(), "resource 'a.b' is declared more than once");
    }
}

use hcl_edit::visit::{visit_expr, Visit};
use hcl_edit::Span;

use crate::hcl::{
    expr::{Expression, TraversalOperator},
    structure::{Block, BlockLabel, Body},
};

#[derive(Debug)]
pub enum VisitorError {
    MissingLabel(String),
    MissingAttribute(String),
    TypeExpected(String),
}

impl std::fmt::Display for VisitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitorError::MissingLabel(name) => write!(f, "missing label '{}'", name),
            VisitorError::MissingAttribute(name) => write!(f, "missing attribute '{}'", name),
            VisitorError::TypeExpected(expected) => write!(f, "expected {}", expected),
        }
    }
}

pub fn label_as_str(label: &BlockLabel) -> &str {
    match label {
        BlockLabel::String(literal) => literal.value().as_str(),
        BlockLabel::Ident(ident) => ident.as_str(),
    }
}

pub fn visit_label(index: usize, name: &str, block: &Block) -> Result<String, VisitorError> {
    let label = block.labels.get(index).ok_or(VisitorError::MissingLabel(name.to_string()))?;
    Ok(label_as_str(label).to_string())
}

/// Name bound by a bare identifier expression, e.g. the `iterator = rule`
/// argument of a dynamic block.
pub fn expression_as_ident(expr: &Expression) -> Result<String, VisitorError> {
    match expr {
        Expression::Variable(var) => Ok(var.as_str().to_string()),
        _ => Err(VisitorError::TypeExpected("identifier".into())),
    }
}

/// A variable root followed by the attribute names accessed directly on it:
/// `aws_instance.web[0].id` yields root `aws_instance` and attrs `[web]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalRoot {
    pub root: String,
    pub attrs: Vec<String>,
    pub span: Option<std::ops::Range<usize>>,
}

impl TraversalRoot {
    pub fn first_attr(&self) -> Option<&str> {
        self.attrs.first().map(|a| a.as_str())
    }
}

#[derive(Default)]
struct ReferenceCollector {
    roots: Vec<TraversalRoot>,
}

impl Visit for ReferenceCollector {
    fn visit_expr(&mut self, expr: &Expression) {
        match expr {
            Expression::Traversal(traversal) => {
                if let Expression::Variable(var) = &traversal.expr {
                    let attrs = traversal
                        .operators
                        .iter()
                        .map_while(|op| match op.value() {
                            TraversalOperator::GetAttr(ident) => Some(ident.as_str().to_string()),
                            _ => None,
                        })
                        .collect();
                    self.roots.push(TraversalRoot {
                        root: var.as_str().to_string(),
                        attrs,
                        span: expr.span(),
                    });
                }
            }
            Expression::Variable(var) => {
                self.roots.push(TraversalRoot {
                    root: var.as_str().to_string(),
                    attrs: vec![],
                    span: expr.span(),
                });
            }
            _ => {}
        }
        visit_expr(self, expr);
    }
}

/// Collects every variable traversal found in an expression.
pub fn collect_expression_roots(expr: &Expression) -> Vec<TraversalRoot> {
    let mut collector = ReferenceCollector::default();
    collector.visit_expr(expr);
    collector.roots
}

/// Collects every variable traversal found in a block body, nested blocks
/// included.
pub fn collect_body_roots(body: &Body) -> Vec<TraversalRoot> {
    let mut collector = ReferenceCollector::default();
    collector.visit_body(body);
    collector.roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl_edit::parser::parse_body;

    fn first_attribute_expr(source: &str) -> Expression {
        let body = parse_body(source).unwrap();
        let expr = body.attributes().next().unwrap().value.clone();
        expr
    }

    #[test]
    fn test_collect_resource_and_local_roots() {
        let expr = first_attribute_expr(
            "value = \"${aws_instance.web[0].id}-${local.suffix}\"\n",
        );
        let roots = collect_expression_roots(&expr);
        let named: Vec<(String, Option<String>)> = roots
            .iter()
            .map(|r| (r.root.clone(), r.first_attr().map(|a| a.to_string())))
            .collect();
        assert!(named.contains(&("aws_instance".to_string(), Some("web".to_string()))));
        assert!(named.contains(&("local".to_string(), Some("suffix".to_string()))));
    }

    #[test]
    fn test_collect_body_roots_includes_nested_blocks() {
        let body = parse_body(
            r#"
resource "aws_security_group" "sg" {
  ingress {
    cidr_blocks = var.cidrs
  }
}
"#,
        )
        .unwrap();
        let roots = collect_body_roots(&body);
        assert!(roots.iter().any(|r| r.root == "var" && r.first_attr() == Some("cidrs")));
    }

    #[test]
    fn test_visit_label_accepts_ident_and_string() {
        let body = parse_body("resource aws_instance \"web\" {}\n").unwrap();
        let block = body.blocks().next().unwrap();
        assert_eq!(visit_label(0, "type", block).unwrap(), "aws_instance");
        assert_eq!(visit_label(1, "name", block).unwrap(), "web");
        assert!(visit_label(2, "extra", block).is_err());
    }
}

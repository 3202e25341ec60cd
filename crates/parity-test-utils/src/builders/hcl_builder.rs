use parity_core::bindings::BindingContext;
use parity_core::errors::EvalError;
use parity_core::graph::ResourceGraph;
use parity_core::provider::ProviderSchema;
use parity_core::{evaluate, Language};

/// A resource block being assembled.
#[derive(Clone, Debug)]
struct OpenResource {
    resource_type: String,
    name: String,
    lines: Vec<String>,
}

/// Builder for HCL test programs
///
/// Expressions are passed through verbatim, so string literals need their
/// quotes:
///
/// ```rust
/// use parity_test_utils::HclBuilder;
///
/// let source = HclBuilder::new()
///     .variable("env")
///     .resource("aws_s3_bucket", "site")
///         .attr("bucket", r#""site-${var.env}""#)
///     .output("bucket", "aws_s3_bucket.site.bucket")
///     .build();
///
/// assert!(source.contains(r#"resource "aws_s3_bucket" "site" {"#));
/// ```
#[derive(Clone, Debug, Default)]
pub struct HclBuilder {
    blocks: Vec<String>,
    current: Option<OpenResource>,
}

impl HclBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw HCL after the blocks built so far
    pub fn with_content(mut self, content: &str) -> Self {
        self.close();
        self.blocks.push(content.trim_end().to_string());
        self
    }

    /// Declare `variable "<name>" {}`
    pub fn variable(mut self, name: &str) -> Self {
        self.close();
        self.blocks.push(format!("variable \"{}\" {{}}", name));
        self
    }

    /// Declare a variable with a default expression
    pub fn variable_with_default(mut self, name: &str, default: &str) -> Self {
        self.close();
        self.blocks.push(format!("variable \"{}\" {{\n  default = {}\n}}", name, default));
        self
    }

    /// Add a `locals` block
    pub fn locals(mut self, entries: Vec<(&str, &str)>) -> Self {
        self.close();
        let body = entries.iter().map(|(k, v)| format!("  {} = {}", k, v)).collect::<Vec<_>>().join("\n");
        self.blocks.push(format!("locals {{\n{}\n}}", body));
        self
    }

    /// Open a resource block; following `attr`/`block`/`dynamic` calls fill it
    pub fn resource(mut self, resource_type: &str, name: &str) -> Self {
        self.close();
        self.current = Some(OpenResource {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            lines: vec![],
        });
        self
    }

    pub fn attr(mut self, key: &str, expression: &str) -> Self {
        self.push_line(format!("{} = {}", key, expression));
        self
    }

    pub fn count(self, expression: &str) -> Self {
        self.attr("count", expression)
    }

    pub fn for_each(self, expression: &str) -> Self {
        self.attr("for_each", expression)
    }

    pub fn depends_on(self, ids: Vec<&str>) -> Self {
        let list = format!("[{}]", ids.join(", "));
        self.attr("depends_on", &list)
    }

    /// Nested block with flat attributes
    pub fn block(mut self, name: &str, attributes: Vec<(&str, &str)>) -> Self {
        let body = attributes.iter().map(|(k, v)| format!("    {} = {}", k, v)).collect::<Vec<_>>().join("\n");
        self.push_line(format!("{} {{\n{}\n  }}", name, body));
        self
    }

    /// `dynamic "<name>"` block iterating `for_each`
    pub fn dynamic(mut self, name: &str, for_each: &str, content: Vec<(&str, &str)>) -> Self {
        let body = content.iter().map(|(k, v)| format!("      {} = {}", k, v)).collect::<Vec<_>>().join("\n");
        self.push_line(format!(
            "dynamic \"{}\" {{\n    for_each = {}\n    content {{\n{}\n    }}\n  }}",
            name, for_each, body
        ));
        self
    }

    pub fn output(mut self, name: &str, expression: &str) -> Self {
        self.close();
        self.blocks.push(format!("output \"{}\" {{\n  value = {}\n}}", name, expression));
        self
    }

    pub fn build(mut self) -> String {
        self.close();
        let mut source = self.blocks.join("\n\n");
        source.push('\n');
        source
    }

    pub fn evaluate(self, bindings: &BindingContext, schema: &ProviderSchema) -> Result<ResourceGraph, EvalError> {
        evaluate(Language::Hcl, &self.build(), bindings, schema)
    }

    fn push_line(&mut self, line: String) {
        match self.current.as_mut() {
            Some(resource) => resource.lines.push(line),
            None => panic!("'{}' must follow a call to resource()", line),
        }
    }

    fn close(&mut self) {
        if let Some(resource) = self.current.take() {
            let body = resource.lines.iter().map(|l| format!("  {}", l)).collect::<Vec<_>>().join("\n");
            self.blocks.push(format!(
                "resource \"{}\" \"{}\" {{\n{}\n}}",
                resource.resource_type, resource.name, body
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_are_rendered_in_call_order() {
        let source = HclBuilder::new()
            .variable("ports")
            .resource("aws_security_group", "web")
            .attr("name", "\"web\"")
            .dynamic("ingress", "var.ports", vec![("from_port", "ingress.value")])
            .block("egress", vec![("from_port", "0")])
            .output("sg", "aws_security_group.web.id")
            .build();
        let variable = source.find("variable \"ports\"").unwrap();
        let resource = source.find("resource \"aws_security_group\" \"web\"").unwrap();
        let output = source.find("output \"sg\"").unwrap();
        assert!(variable < resource && resource < output);
        assert!(source.contains("dynamic \"ingress\" {\n    for_each = var.ports"));
        assert!(source.contains("  egress {\n    from_port = 0\n  }"));
    }

    #[test]
    fn test_built_program_evaluates() {
        let graph = HclBuilder::new()
            .resource("aws_s3_bucket", "logs")
            .attr("bucket", "\"logs\"")
            .resource("aws_s3_bucket", "site")
            .attr("bucket", "\"site\"")
            .depends_on(vec!["aws_s3_bucket.logs"])
            .evaluate(&BindingContext::new(), &ProviderSchema::builtin().unwrap())
            .unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    #[should_panic(expected = "must follow a call to resource()")]
    fn test_attr_outside_resource_panics() {
        HclBuilder::new().variable("x").attr("a", "1");
    }
}

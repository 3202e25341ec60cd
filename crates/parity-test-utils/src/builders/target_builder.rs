use parity_core::bindings::BindingContext;
use parity_core::errors::EvalError;
use parity_core::graph::ResourceGraph;
use parity_core::provider::ProviderSchema;
use parity_core::{evaluate, Language};

#[derive(Clone, Debug)]
struct OpenResource {
    binding: Option<String>,
    constructor: String,
    name: String,
    args: Vec<String>,
    depends_on: Vec<String>,
}

impl OpenResource {
    fn render(&self) -> String {
        let args = if self.args.is_empty() {
            "{}".to_string()
        } else {
            format!("{{\n{}\n}}", self.args.iter().map(|a| format!("    {},", a)).collect::<Vec<_>>().join("\n"))
        };
        let opts = if self.depends_on.is_empty() {
            String::new()
        } else {
            format!(", {{ dependsOn: [{}] }}", self.depends_on.join(", "))
        };
        let call = format!("new {}({}, {}{});", self.constructor, self.name, args, opts);
        match &self.binding {
            Some(binding) => format!("const {} = {}", binding, call),
            None => call,
        }
    }
}

/// Builder for TypeScript test programs
///
/// The `@pulumi/aws` import is always emitted. Resource names and argument
/// values are expressions, as in [`HclBuilder`](super::HclBuilder).
///
/// ```rust
/// use parity_test_utils::TargetBuilder;
///
/// let source = TargetBuilder::new()
///     .require("env")
///     .resource("site", "aws.s3.Bucket", "\"site\"")
///         .arg("bucket", "`site-${env}`")
///     .export("bucket", "site.bucket")
///     .build();
///
/// assert!(source.contains("const site = new aws.s3.Bucket(\"site\""));
/// ```
#[derive(Clone, Debug)]
pub struct TargetBuilder {
    imports: Vec<String>,
    statements: Vec<String>,
    current: Option<OpenResource>,
}

impl Default for TargetBuilder {
    fn default() -> Self {
        TargetBuilder {
            imports: vec!["import * as aws from \"@pulumi/aws\";".to_string()],
            statements: vec![],
            current: None,
        }
    }
}

impl TargetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `import * as <alias> from "@pulumi/<alias>";`
    pub fn import(mut self, alias: &str) -> Self {
        self.imports.push(format!("import * as {} from \"@pulumi/{}\";", alias, alias));
        self
    }

    /// Append a raw statement
    pub fn statement(mut self, statement: &str) -> Self {
        self.close();
        self.statements.push(statement.trim_end().to_string());
        self
    }

    /// `const <name> = config.require("<name>");`
    pub fn require(self, name: &str) -> Self {
        let statement = format!("const {} = config.require(\"{}\");", name, name);
        self.statement(&statement)
    }

    /// `const <name> = config.requireObject("<name>");`
    pub fn require_object(self, name: &str) -> Self {
        let statement = format!("const {} = config.requireObject(\"{}\");", name, name);
        self.statement(&statement)
    }

    pub fn constant(self, name: &str, expression: &str) -> Self {
        let statement = format!("const {} = {};", name, expression);
        self.statement(&statement)
    }

    /// Open a `const <binding> = new <constructor>(<name>, {...})` statement
    pub fn resource(mut self, binding: &str, constructor: &str, name: &str) -> Self {
        self.close();
        self.current = Some(OpenResource {
            binding: Some(binding.to_string()),
            constructor: constructor.to_string(),
            name: name.to_string(),
            args: vec![],
            depends_on: vec![],
        });
        self
    }

    /// Like [`resource`](Self::resource), without keeping the instance
    pub fn anonymous_resource(mut self, constructor: &str, name: &str) -> Self {
        self = self.resource("_", constructor, name);
        if let Some(resource) = self.current.as_mut() {
            resource.binding = None;
        }
        self
    }

    pub fn arg(mut self, key: &str, expression: &str) -> Self {
        let line = format!("{}: {}", key, expression);
        self.open().args.push(line);
        self
    }

    pub fn depends_on(mut self, bindings: Vec<&str>) -> Self {
        self.open().depends_on.extend(bindings.iter().map(|b| b.to_string()));
        self
    }

    /// `export const <name> = <expression>;`
    pub fn export(self, name: &str, expression: &str) -> Self {
        let statement = format!("export const {} = {};", name, expression);
        self.statement(&statement)
    }

    pub fn build(mut self) -> String {
        self.close();
        let mut source = self.imports.join("\n");
        source.push_str("\n\n");
        source.push_str(&self.statements.join("\n"));
        source.push('\n');
        source
    }

    pub fn evaluate(self, bindings: &BindingContext, schema: &ProviderSchema) -> Result<ResourceGraph, EvalError> {
        evaluate(Language::TypeScript, &self.build(), bindings, schema)
    }

    fn open(&mut self) -> &mut OpenResource {
        match self.current.as_mut() {
            Some(resource) => resource,
            None => panic!("arguments must follow a call to resource()"),
        }
    }

    fn close(&mut self) {
        if let Some(resource) = self.current.take() {
            self.statements.push(resource.render());
        }
    }
}

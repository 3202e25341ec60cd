use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parity_core::bindings::BindingContext;
use parity_core::checker::{compare_with, CheckerConfig};
use parity_core::errors::EvalError;
use parity_core::graph::ResourceGraph;
use parity_core::kit::types::diagnostics::Diagnostic;
use parity_core::provider::ProviderSchema;
use parity_core::{evaluate, Language};

use super::formatter::CheckReport;
use super::{BindingArgs, CheckPrograms, Context, GraphFormat, PrintGraph};

/// A program read from disk, ready to evaluate.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub language: Language,
    pub content: String,
}

impl SourceFile {
    pub fn read(path: &str, language: Option<Language>) -> Result<SourceFile, Diagnostic> {
        let language = match language.or_else(|| Language::from_path(Path::new(path))) {
            Some(language) => language,
            None => {
                return Err(Diagnostic::error(format!(
                    "unable to detect the language of '{}' (use --lang hcl|ts)",
                    path
                ))
                .with_file(path))
            }
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(format!("unable to read '{}': {}", path, e)).with_file(path)
        })?;
        Ok(SourceFile { path: path.to_string(), language, content })
    }

    pub fn evaluate(
        &self,
        bindings: &BindingContext,
        schema: &ProviderSchema,
    ) -> Result<ResourceGraph, Diagnostic> {
        evaluate(self.language, &self.content, bindings, schema)
            .map_err(|e: EvalError| e.to_diagnostic(&self.path))
    }
}

/// Resolves bindings (environment, then file, then `--var`) and the
/// provider schema shared by both evaluations.
pub fn load_inputs(args: &BindingArgs) -> Result<(BindingContext, ProviderSchema), Diagnostic> {
    let bindings = BindingContext::load(
        BindingContext::from_env(),
        args.bindings.as_deref().map(Path::new),
        &args.vars,
    )
    .map_err(|e| {
        let diagnostic = Diagnostic::error(e.to_string()).with_code("BindingError");
        match &args.bindings {
            Some(file) => diagnostic.with_file(file),
            None => diagnostic,
        }
    })?;
    let schema = match &args.schema {
        Some(file) => ProviderSchema::from_file(Path::new(file))
            .map_err(|e| Diagnostic::error(e.to_string()).with_code("SchemaError").with_file(file))?,
        None => ProviderSchema::builtin().map_err(|e| Diagnostic::error(e.to_string()).with_code("SchemaError"))?,
    };
    Ok((bindings, schema))
}

type Evaluation = JoinHandle<Result<ResourceGraph, Diagnostic>>;

fn spawn_evaluation(
    name: &str,
    source: SourceFile,
    bindings: Arc<BindingContext>,
    schema: Arc<ProviderSchema>,
) -> Result<Evaluation, Diagnostic> {
    hiro_system_kit::thread_named(name)
        .spawn(move || {
            tracing::debug!(file = %source.path, language = %source.language, "evaluating program");
            source.evaluate(&bindings, &schema)
        })
        .map_err(|e| Diagnostic::error(format!("unable to start the {} thread: {}", name, e)))
}

fn join_evaluation(handle: Evaluation, path: &str, ctx: &Context) -> Result<ResourceGraph, Diagnostic> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => {
            ctx.try_log(|logger| error!(logger, "evaluation of {} panicked", path));
            Err(Diagnostic::error(format!("evaluation of '{}' aborted unexpectedly", path)).with_file(path))
        }
    }
}

/// Evaluates both programs on their own threads. Errors from both sides
/// are reported together.
pub fn evaluate_pair(
    hcl: SourceFile,
    target: SourceFile,
    bindings: BindingContext,
    schema: ProviderSchema,
    ctx: &Context,
) -> Result<(ResourceGraph, ResourceGraph), Vec<Diagnostic>> {
    let bindings = Arc::new(bindings);
    let schema = Arc::new(schema);
    let (hcl_path, target_path) = (hcl.path.clone(), target.path.clone());

    let left = spawn_evaluation("HCL evaluation", hcl, bindings.clone(), schema.clone()).map_err(|d| vec![d])?;
    let right = spawn_evaluation("TypeScript evaluation", target, bindings, schema).map_err(|d| vec![d])?;

    match (join_evaluation(left, &hcl_path, ctx), join_evaluation(right, &target_path, ctx)) {
        (Ok(left), Ok(right)) => Ok((left, right)),
        (left, right) => Err(left.err().into_iter().chain(right.err()).collect()),
    }
}

fn schema_findings(schema: &ProviderSchema, graph: &ResourceGraph, file: &str) -> Vec<Diagnostic> {
    schema.validate(graph).into_iter().map(|d| d.with_file(file)).collect()
}

pub fn checker_config(cmd: &CheckPrograms) -> CheckerConfig {
    let mut config = CheckerConfig::new();
    if let Some(max_resources) = cmd.max_resources {
        config = config.with_max_resources(max_resources);
    }
    if let Some(step_budget) = cmd.step_budget {
        config = config.with_step_budget(step_budget);
    }
    if let Some(timeout_ms) = cmd.timeout_ms {
        config = config.with_deadline(Duration::from_millis(timeout_ms));
    }
    config
}

pub fn handle_check_command(cmd: &CheckPrograms, ctx: &Context) -> Result<CheckReport, Vec<Diagnostic>> {
    let (bindings, schema) = load_inputs(&cmd.inputs).map_err(|d| vec![d])?;
    let hcl = SourceFile::read(&cmd.hcl_file, Some(Language::Hcl));
    let target = SourceFile::read(&cmd.target_file, Some(Language::TypeScript));
    let (hcl, target) = match (hcl, target) {
        (Ok(hcl), Ok(target)) => (hcl, target),
        (hcl, target) => return Err(hcl.err().into_iter().chain(target.err()).collect()),
    };

    let validator = schema.clone();
    let (left, right) = evaluate_pair(hcl, target, bindings, schema, ctx)?;

    let mut warnings = schema_findings(&validator, &left, &cmd.hcl_file);
    warnings.extend(schema_findings(&validator, &right, &cmd.target_file));
    if cmd.strict_schema && !warnings.is_empty() {
        return Err(warnings.into_iter().map(Diagnostic::escalate).collect());
    }

    let result = compare_with(&left, &right, &checker_config(cmd)).map_err(|e| vec![e.to_diagnostic()])?;
    Ok(CheckReport {
        hcl_file: cmd.hcl_file.clone(),
        target_file: cmd.target_file.clone(),
        resources: left.len().max(right.len()),
        result,
        warnings,
    })
}

pub fn handle_graph_command(cmd: &PrintGraph, _ctx: &Context) -> Result<String, Vec<Diagnostic>> {
    let (bindings, schema) = load_inputs(&cmd.inputs).map_err(|d| vec![d])?;
    let source = SourceFile::read(&cmd.file, cmd.language).map_err(|d| vec![d])?;
    let graph = source.evaluate(&bindings, &schema).map_err(|d| vec![d])?;
    let rendered = match cmd.format {
        GraphFormat::Json => serde_json::to_string_pretty(&graph.to_json())
            .map_err(|e| vec![Diagnostic::error(format!("unable to render graph: {}", e))])?,
        GraphFormat::Dot => graph.to_dot(),
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::formatter::Format;
    use indoc::indoc;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    fn check_programs(hcl_file: String, target_file: String) -> CheckPrograms {
        CheckPrograms {
            hcl_file,
            target_file,
            inputs: BindingArgs { bindings: None, vars: vec![], schema: None },
            strict_schema: false,
            max_resources: None,
            step_budget: None,
            timeout_ms: None,
            format: Format::Compact,
        }
    }

    #[test]
    fn test_errors_from_both_programs_are_collected() {
        let dir = TempDir::new().unwrap();
        let hcl = write(&dir, "main.tf", "resource \"aws_s3_bucket\" \"b\" {\n  bucket = var.missing\n}\n");
        let ts = write(&dir, "index.ts", "const x = ;\n");
        let diagnostics = handle_check_command(&check_programs(hcl.clone(), ts.clone()), &Context::empty()).unwrap_err();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].file.as_deref(), Some(hcl.as_str()));
        assert_eq!(diagnostics[0].code.as_deref(), Some("UnboundVariableError"));
        assert_eq!(diagnostics[0].line, Some(2));
        assert_eq!(diagnostics[1].file.as_deref(), Some(ts.as_str()));
        assert_eq!(diagnostics[1].code.as_deref(), Some("ParseError"));
    }

    #[test]
    fn test_var_overrides_bindings_file() {
        let dir = TempDir::new().unwrap();
        let bindings = write(&dir, "vars.yml", "region: eu-west-1\nzones: 2\n");
        let args = BindingArgs { bindings: Some(bindings), vars: vec!["zones=3".into()], schema: None };
        let (context, _) = load_inputs(&args).unwrap();
        assert_eq!(context.get("region").unwrap().to_string(), "\"eu-west-1\"");
        assert_eq!(context.get("zones").unwrap().to_string(), "3");
    }

    #[test]
    fn test_missing_file_is_reported_with_its_path() {
        let diagnostic = SourceFile::read("does/not/exist.tf", None).unwrap_err();
        assert_eq!(diagnostic.file.as_deref(), Some("does/not/exist.tf"));
        let diagnostic = SourceFile::read("program.txt", None).unwrap_err();
        assert!(diagnostic.message.contains("--lang"));
    }

    #[test]
    fn test_checker_flags_reach_the_config() {
        let dir = TempDir::new().unwrap();
        let mut cmd = check_programs(write(&dir, "a.tf", ""), write(&dir, "b.ts", ""));
        cmd.max_resources = Some(4);
        cmd.step_budget = Some(10);
        cmd.timeout_ms = Some(250);
        let config = checker_config(&cmd);
        assert_eq!(config.max_resources, 4);
        assert_eq!(config.step_budget, Some(10));
        assert_eq!(config.deadline, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_graph_renders_dot() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "main.tf",
            indoc! {r#"
                resource "aws_vpc" "main" {
                  cidr_block = "10.0.0.0/16"
                }

                resource "aws_subnet" "a" {
                  vpc_id     = aws_vpc.main.id
                  cidr_block = "10.0.1.0/24"
                }
            "#},
        );
        let cmd = PrintGraph {
            file,
            language: None,
            inputs: BindingArgs { bindings: None, vars: vec![], schema: None },
            format: GraphFormat::Dot,
        };
        let rendered = handle_graph_command(&cmd, &Context::empty()).unwrap();
        assert!(rendered.starts_with("digraph"), "{}", rendered);
        assert!(rendered.contains("aws_subnet.a"));
    }
}

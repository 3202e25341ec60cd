//! Output formatting for check reports and diagnostics

use clap::ValueEnum;
use parity_core::checker::{AttributeDiff, EquivalenceResult, ResourceDiff};
use parity_core::kit::types::diagnostics::Diagnostic;
use parity_core::kit::Value;
use serde_json::json;

/// Everything `parity check` learned about a pair of programs.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub hcl_file: String,
    pub target_file: String,
    pub resources: usize,
    pub result: EquivalenceResult,
    /// Schema findings that did not stop the check.
    pub warnings: Vec<Diagnostic>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Stylish,
    Compact,
    Json,
}

pub trait OutputFormatter {
    fn format_report(&self, report: &CheckReport) -> String;
    fn format_diagnostics(&self, diagnostics: &[Diagnostic]) -> String;
}

pub fn get_formatter(format: Format) -> Box<dyn OutputFormatter> {
    match format {
        Format::Stylish => Box::new(StylishFormatter),
        Format::Compact => Box::new(CompactFormatter),
        Format::Json => Box::new(JsonFormatter),
    }
}

fn render_side(value: &Option<Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "(absent)".to_string(),
    }
}

fn join_ids<T: ToString>(ids: &[T]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

struct StylishFormatter;

impl StylishFormatter {
    fn render_changed(&self, changed: &ResourceDiff, lines: &mut Vec<String>) {
        let header = if changed.left == changed.right {
            changed.left.to_string()
        } else {
            format!("{} ↔ {}", changed.left, changed.right)
        };
        lines.push(format!("  {} {}", yellow!("~"), header));
        for AttributeDiff { path, left, right } in changed.attributes.iter() {
            lines.push(format!(
                "      {}: {} {} {}",
                path,
                render_side(left),
                black!("→"),
                render_side(right)
            ));
        }
        if let Some(dependencies) = &changed.dependencies {
            if !dependencies.only_left.is_empty() {
                lines.push(format!("      depends only on the left: {}", join_ids(&dependencies.only_left)));
            }
            if !dependencies.only_right.is_empty() {
                lines.push(format!("      depends only on the right: {}", join_ids(&dependencies.only_right)));
            }
        }
    }
}

impl OutputFormatter for StylishFormatter {
    fn format_report(&self, report: &CheckReport) -> String {
        let mut lines = vec![];
        let result = &report.result;
        if result.equivalent {
            lines.push(format!(
                "{} {} and {} are equivalent ({}, {} pairing)",
                green!("✓"),
                report.hcl_file,
                report.target_file,
                pluralize!(report.resources, "resource"),
                result.strategy
            ));
            if result.pairing.iter().any(|(left, right)| left != right) {
                for (left, right) in result.pairing.iter() {
                    lines.push(format!("  {}", black!("{} ↔ {}", left, right)));
                }
            }
        } else {
            lines.push(format!(
                "{} {} and {} differ ({}):",
                red!("✗"),
                report.hcl_file,
                report.target_file,
                pluralize!(result.diff.len(), "difference")
            ));
            for id in result.diff.removed.iter() {
                lines.push(format!("  {} {} only in {}", red!("-"), id, report.hcl_file));
            }
            for id in result.diff.added.iter() {
                lines.push(format!("  {} {} only in {}", green!("+"), id, report.target_file));
            }
            for changed in result.diff.changed.iter() {
                self.render_changed(changed, &mut lines);
            }
            for output in result.diff.outputs.iter() {
                lines.push(format!(
                    "  {} output {}: {} {} {}",
                    yellow!("~"),
                    output.name,
                    render_side(&output.left),
                    black!("→"),
                    render_side(&output.right)
                ));
            }
        }
        for warning in report.warnings.iter() {
            lines.push(format_warn!("{} {}", warning.message, black!("{}", warning.location_string())));
        }
        lines.join("\n")
    }

    fn format_diagnostics(&self, diagnostics: &[Diagnostic]) -> String {
        let mut lines = vec![red!("Found {}:", pluralize!(diagnostics.len(), "error"))];
        for diagnostic in diagnostics.iter() {
            let location = diagnostic.location_string();
            let mut line = format!("  {}", format_err!("{}", diagnostic.message));
            if !location.is_empty() {
                line = format!("{} {}", line, black!("{}", location));
            }
            lines.push(line);
            if let Some(context) = &diagnostic.context {
                lines.push(format!("    {}", black!("{}", context)));
            }
            for related in diagnostic.related_locations.iter() {
                lines.push(format!(
                    "    {} {} {}",
                    blue!("note:"),
                    related.message,
                    black!("{}:{}:{}", related.file, related.line, related.column)
                ));
            }
        }
        lines.join("\n")
    }
}

struct CompactFormatter;

impl OutputFormatter for CompactFormatter {
    fn format_report(&self, report: &CheckReport) -> String {
        let result = &report.result;
        let mut lines = vec![];
        if result.equivalent {
            lines.push(format!(
                "{}: {}: equivalent ({})",
                report.hcl_file, report.target_file, result.strategy
            ));
        }
        for id in result.diff.removed.iter() {
            lines.push(format!("{}: removed {}", report.hcl_file, id));
        }
        for id in result.diff.added.iter() {
            lines.push(format!("{}: added {}", report.target_file, id));
        }
        for changed in result.diff.changed.iter() {
            for attribute in changed.attributes.iter() {
                lines.push(format!(
                    "{}: changed {} {}: {} != {}",
                    report.target_file,
                    changed.right,
                    attribute.path,
                    render_side(&attribute.left),
                    render_side(&attribute.right)
                ));
            }
            if let Some(dependencies) = &changed.dependencies {
                lines.push(format!(
                    "{}: changed {} depends_on: [{}] != [{}]",
                    report.target_file,
                    changed.right,
                    join_ids(&dependencies.only_left),
                    join_ids(&dependencies.only_right)
                ));
            }
        }
        for output in result.diff.outputs.iter() {
            lines.push(format!(
                "{}: output {}: {} != {}",
                report.target_file,
                output.name,
                render_side(&output.left),
                render_side(&output.right)
            ));
        }
        for warning in report.warnings.iter() {
            lines.push(warning.to_string());
        }
        lines.join("\n")
    }

    fn format_diagnostics(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
    }
}

struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &CheckReport) -> String {
        let result = &report.result;
        let output = json!({
            "hcl_file": report.hcl_file,
            "target_file": report.target_file,
            "equivalent": result.equivalent,
            "strategy": result.strategy.to_string(),
            "steps": result.steps,
            "pairing": result.pairing.iter().map(|(left, right)| json!([left.to_string(), right.to_string()])).collect::<Vec<_>>(),
            "diff": result.diff.to_json(),
            "warnings": report.warnings.iter().map(|w| serde_json::to_value(w).unwrap_or_default()).collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_diagnostics(&self, diagnostics: &[Diagnostic]) -> String {
        let output = json!({
            "errors": diagnostics.iter().map(|d| serde_json::to_value(d).unwrap_or_default()).collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use parity_core::bindings::BindingContext;
    use parity_core::checker::compare;
    use parity_core::kit::helpers::location::Position;
    use parity_core::kit::types::diagnostics::RelatedLocation;
    use parity_core::provider::ProviderSchema;
    use parity_core::{evaluate, Language};

    fn report(hcl: &str, ts: &str) -> CheckReport {
        let schema = ProviderSchema::builtin().unwrap();
        let bindings = BindingContext::new();
        let left = evaluate(Language::Hcl, hcl, &bindings, &schema).unwrap();
        let right = evaluate(Language::TypeScript, ts, &bindings, &schema).unwrap();
        CheckReport {
            hcl_file: "main.tf".into(),
            target_file: "index.ts".into(),
            resources: left.len(),
            result: compare(&left, &right).unwrap(),
            warnings: vec![],
        }
    }

    fn mismatch() -> CheckReport {
        report(
            indoc! {r#"
                resource "aws_s3_bucket" "b" {
                  bucket = "b"
                  tags = {
                    Name = "left"
                  }
                }
            "#},
            indoc! {r#"
                import * as aws from "@pulumi/aws";
                new aws.s3.Bucket("b", { bucket: "b", tags: { Name: "right" } });
                new aws.s3.Bucket("extra", { bucket: "extra" });
            "#},
        )
    }

    #[test]
    fn test_stylish_mismatch_lists_every_difference() {
        let rendered = get_formatter(Format::Stylish).format_report(&mismatch());
        assert!(rendered.contains("main.tf and index.ts differ (2 differences)"), "{}", rendered);
        assert!(rendered.contains("aws_s3_bucket.extra only in index.ts"));
        assert!(rendered.contains("tags.Name: \"left\""));
    }

    #[test]
    fn test_compact_lines_are_prefixed_by_file() {
        let rendered = get_formatter(Format::Compact).format_report(&mismatch());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "index.ts: added aws_s3_bucket.extra");
        assert_eq!(lines[1], "index.ts: changed aws_s3_bucket.b tags.Name: \"left\" != \"right\"");
    }

    #[test]
    fn test_json_report_is_machine_readable() {
        let rendered = get_formatter(Format::Json).format_report(&mismatch());
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["equivalent"], json!(false));
        assert_eq!(parsed["diff"]["added"], json!(["aws_s3_bucket.extra"]));
    }

    #[test]
    fn test_equivalent_report() {
        let report = report(
            r#"resource "aws_s3_bucket" "b" { bucket = "b" }"#,
            "import * as aws from \"@pulumi/aws\";\nnew aws.s3.Bucket(\"b\", { bucket: \"b\" });",
        );
        let rendered = get_formatter(Format::Compact).format_report(&report);
        assert_eq!(rendered, "main.tf: index.ts: equivalent (same-name)");
        let rendered = get_formatter(Format::Stylish).format_report(&report);
        assert!(rendered.contains("are equivalent (1 resource, same-name pairing)"));
    }

    #[test]
    fn test_diagnostics_carry_locations() {
        let diagnostics = vec![Diagnostic::error("unbound variable 'region'")
            .with_code("UnboundVariableError")
            .with_file("main.tf")
            .with_line(3)
            .with_column(12)];
        assert_eq!(
            get_formatter(Format::Compact).format_diagnostics(&diagnostics),
            "main.tf:3:12: error[UnboundVariableError]: unbound variable 'region'"
        );
        let rendered = get_formatter(Format::Json).format_diagnostics(&diagnostics);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["errors"][0]["line"], json!(3));
        assert!(get_formatter(Format::Stylish).format_diagnostics(&diagnostics).contains("main.tf:3:12"));
    }

    #[test]
    fn test_stylish_diagnostics_list_related_locations() {
        let diagnostic = Diagnostic::error("cyclic dependency: local.a -> local.b -> local.a")
            .with_file("main.tf")
            .with_position(Some(Position::new(2, 3)))
            .with_related_location(RelatedLocation::new(
                "main.tf".to_string(),
                3,
                3,
                "'local.b' is part of the cycle".to_string(),
            ));
        let rendered = get_formatter(Format::Stylish).format_diagnostics(&[diagnostic]);
        assert!(rendered.contains("note:"), "{}", rendered);
        assert!(rendered.contains("'local.b' is part of the cycle"), "{}", rendered);
        assert!(rendered.contains("main.tf:3:3"), "{}", rendered);
    }
}

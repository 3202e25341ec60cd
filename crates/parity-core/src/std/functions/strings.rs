use kit::types::diagnostics::Diagnostic;
use kit::types::functions::{FunctionImplementation, FunctionSpecification};
use kit::{define_function, indoc, Value};

use super::{arg, expect_list, expect_number, expect_string, to_diag};

lazy_static! {
    pub static ref STRING_FUNCTIONS: Vec<FunctionSpecification> = vec![
        define_function! {
            Upper => {
                name: "upper",
                documentation: "`upper` converts letters to uppercase.",
                example: indoc! {r#"
                    output "shout" {
                        value = upper("web")
                    }
                    > shout: WEB
                "#},
                inputs: [
                    value: { documentation: "The string to convert." }
                ],
                output: { documentation: "The uppercase string." },
            }
        },
        define_function! {
            Lower => {
                name: "lower",
                documentation: "`lower` converts letters to lowercase.",
                example: indoc! {r#"
                    output "quiet" {
                        value = lower("WEB")
                    }
                    > quiet: web
                "#},
                inputs: [
                    value: { documentation: "The string to convert." }
                ],
                output: { documentation: "The lowercase string." },
            }
        },
        define_function! {
            TrimSpace => {
                name: "trimspace",
                documentation: "`trimspace` removes leading and trailing whitespace.",
                example: indoc! {r#"
                    output "trimmed" {
                        value = trimspace("  web  ")
                    }
                    > trimmed: web
                "#},
                inputs: [
                    value: { documentation: "The string to trim." }
                ],
                output: { documentation: "The trimmed string." },
            }
        },
        define_function! {
            Replace => {
                name: "replace",
                documentation: "`replace` substitutes every occurrence of a substring.",
                example: indoc! {r#"
                    output "name" {
                        value = replace("a-b", "-", "_")
                    }
                    > name: a_b
                "#},
                inputs: [
                    value: { documentation: "The string to search." },
                    substring: { documentation: "The text to replace." },
                    replacement: { documentation: "The replacement text." }
                ],
                output: { documentation: "The rewritten string." },
            }
        },
        define_function! {
            Join => {
                name: "join",
                documentation: "`join` concatenates the elements of a list with a separator.",
                example: indoc! {r#"
                    output "csv" {
                        value = join(",", ["a", "b"])
                    }
                    > csv: a,b
                "#},
                inputs: [
                    separator: { documentation: "The separator." },
                    list: { documentation: "The elements to join." }
                ],
                output: { documentation: "The joined string." },
            }
        },
        define_function! {
            Split => {
                name: "split",
                documentation: "`split` divides a string at each occurrence of a separator.",
                example: indoc! {r#"
                    output "parts" {
                        value = split(",", "a,b")
                    }
                    > parts: ["a", "b"]
                "#},
                inputs: [
                    separator: { documentation: "The separator." },
                    value: { documentation: "The string to split." }
                ],
                output: { documentation: "The list of parts." },
            }
        },
        define_function! {
            Format => {
                name: "format",
                documentation: "`format` renders a format string. Supported verbs are `%s`, `%d`, `%f`, `%v`, `%q` and `%%`.",
                example: indoc! {r#"
                    output "name" {
                        value = format("%s-%d", "web", 1)
                    }
                    > name: web-1
                "#},
                inputs: [
                    spec: { documentation: "The format string." },
                    values: { documentation: "The values to substitute.", optional: true }
                ],
                output: { documentation: "The formatted string." },
                variadic: true,
            }
        },
        define_function! {
            ConvertToString => {
                name: "tostring",
                documentation: "`tostring` converts a primitive value to a string.",
                example: indoc! {r#"
                    output "port" {
                        value = tostring(80)
                    }
                    > port: 80
                "#},
                inputs: [
                    value: { documentation: "A string, number or bool." }
                ],
                output: { documentation: "The string form." },
            }
        },
    ];
}

pub struct Upper;
impl FunctionImplementation for Upper {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::string(expect_string(fn_spec, args, 0)?.to_uppercase()))
    }
}

pub struct Lower;
impl FunctionImplementation for Lower {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::string(expect_string(fn_spec, args, 0)?.to_lowercase()))
    }
}

pub struct TrimSpace;
impl FunctionImplementation for TrimSpace {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::string(expect_string(fn_spec, args, 0)?.trim()))
    }
}

pub struct Replace;
impl FunctionImplementation for Replace {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let value = expect_string(fn_spec, args, 0)?;
        let substring = expect_string(fn_spec, args, 1)?;
        let replacement = expect_string(fn_spec, args, 2)?;
        Ok(Value::string(value.replace(&substring, &replacement)))
    }
}

pub struct Join;
impl FunctionImplementation for Join {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let separator = expect_string(fn_spec, args, 0)?;
        let mut parts = vec![];
        for value in expect_list(fn_spec, args, 1)? {
            let Some(part) = value.to_template_string() else {
                return Err(to_diag(fn_spec, format!("cannot join an element of type {}", value.type_name())));
            };
            parts.push(part);
        }
        Ok(Value::string(parts.join(&separator)))
    }
}

pub struct Split;
impl FunctionImplementation for Split {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let separator = expect_string(fn_spec, args, 0)?;
        let value = expect_string(fn_spec, args, 1)?;
        if value.is_empty() {
            return Ok(Value::list(vec![]));
        }
        Ok(Value::list(value.split(separator.as_str()).map(Value::string).collect()))
    }
}

pub struct Format;
impl FunctionImplementation for Format {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let spec = expect_string(fn_spec, args, 0)?;
        let mut out = String::new();
        let mut chars = spec.chars();
        let mut next_arg = 1;
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let Some(verb) = chars.next() else {
                return Err(to_diag(fn_spec, "format string ends with '%'".into()));
            };
            if verb == '%' {
                out.push('%');
                continue;
            }
            let value = arg(fn_spec, args, next_arg)?;
            match verb {
                's' | 'v' => match value.to_template_string() {
                    Some(text) => out.push_str(&text),
                    None => out.push_str(&value.to_string()),
                },
                'd' => out.push_str(&format!("{}", expect_number(fn_spec, args, next_arg)?.trunc() as i64)),
                'f' => out.push_str(&format!("{:.6}", expect_number(fn_spec, args, next_arg)?)),
                'q' => out.push_str(&format!("{:?}", expect_string(fn_spec, args, next_arg)?)),
                other => {
                    return Err(to_diag(fn_spec, format!("unsupported verb '%{}'", other)));
                }
            }
            next_arg += 1;
        }
        Ok(Value::string(out))
    }
}

pub struct ConvertToString;
impl FunctionImplementation for ConvertToString {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let value = arg(fn_spec, args, 0)?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        value
            .to_template_string()
            .map(Value::string)
            .ok_or_else(|| to_diag(fn_spec, format!("cannot convert {} to string", value.type_name())))
    }
}

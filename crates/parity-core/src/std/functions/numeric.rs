use kit::types::diagnostics::Diagnostic;
use kit::types::functions::{FunctionImplementation, FunctionSpecification};
use kit::{define_function, indoc, Value};

use super::{arg, coerce_number, expect_number, to_diag};

lazy_static! {
    pub static ref NUMERIC_FUNCTIONS: Vec<FunctionSpecification> = vec![
        define_function! {
            Max => {
                name: "max",
                documentation: "`max` returns the greatest of its arguments.",
                example: indoc! {r#"
                    output "largest" {
                        value = max(1, 5, 3)
                    }
                    > largest: 5
                "#},
                inputs: [
                    numbers: { documentation: "The numbers to compare." }
                ],
                output: { documentation: "The greatest number." },
                variadic: true,
            }
        },
        define_function! {
            Min => {
                name: "min",
                documentation: "`min` returns the smallest of its arguments.",
                example: indoc! {r#"
                    output "smallest" {
                        value = min(4, 2)
                    }
                    > smallest: 2
                "#},
                inputs: [
                    numbers: { documentation: "The numbers to compare." }
                ],
                output: { documentation: "The smallest number." },
                variadic: true,
            }
        },
        define_function! {
            Abs => {
                name: "abs",
                documentation: "`abs` returns the absolute value of a number.",
                example: indoc! {r#"
                    output "distance" {
                        value = abs(-3)
                    }
                    > distance: 3
                "#},
                inputs: [
                    number: { documentation: "The number." }
                ],
                output: { documentation: "The absolute value." },
            }
        },
        define_function! {
            Ceil => {
                name: "ceil",
                documentation: "`ceil` rounds a number up to the closest whole number.",
                example: indoc! {r#"
                    output "up" {
                        value = ceil(4.1)
                    }
                    > up: 5
                "#},
                inputs: [
                    number: { documentation: "The number." }
                ],
                output: { documentation: "The rounded number." },
            }
        },
        define_function! {
            Floor => {
                name: "floor",
                documentation: "`floor` rounds a number down to the closest whole number.",
                example: indoc! {r#"
                    output "down" {
                        value = floor(4.9)
                    }
                    > down: 4
                "#},
                inputs: [
                    number: { documentation: "The number." }
                ],
                output: { documentation: "The rounded number." },
            }
        },
        define_function! {
            ToNumber => {
                name: "tonumber",
                documentation: "`tonumber` converts a numeric string to a number.",
                example: indoc! {r#"
                    output "port" {
                        value = tonumber("80")
                    }
                    > port: 80
                "#},
                inputs: [
                    value: { documentation: "A number or numeric string." }
                ],
                output: { documentation: "The number." },
            }
        },
    ];
}

fn fold_numbers(
    fn_spec: &FunctionSpecification,
    args: &[Value],
    pick: fn(f64, f64) -> f64,
) -> Result<Value, Diagnostic> {
    let mut result = expect_number(fn_spec, args, 0)?;
    for index in 1..args.len() {
        result = pick(result, expect_number(fn_spec, args, index)?);
    }
    Ok(Value::number(result))
}

pub struct Max;
impl FunctionImplementation for Max {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        fold_numbers(fn_spec, args, f64::max)
    }
}

pub struct Min;
impl FunctionImplementation for Min {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        fold_numbers(fn_spec, args, f64::min)
    }
}

pub struct Abs;
impl FunctionImplementation for Abs {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::number(expect_number(fn_spec, args, 0)?.abs()))
    }
}

pub struct Ceil;
impl FunctionImplementation for Ceil {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::number(expect_number(fn_spec, args, 0)?.ceil()))
    }
}

pub struct Floor;
impl FunctionImplementation for Floor {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::number(expect_number(fn_spec, args, 0)?.floor()))
    }
}

pub struct ToNumber;
impl FunctionImplementation for ToNumber {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let value = arg(fn_spec, args, 0)?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        coerce_number(value)
            .map(Value::number)
            .ok_or_else(|| to_diag(fn_spec, format!("cannot convert {} to a number", value)))
    }
}

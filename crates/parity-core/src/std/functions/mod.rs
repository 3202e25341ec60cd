pub mod collections;
pub mod encoding;
pub mod numeric;
pub mod strings;

use kit::indexmap::IndexMap;
use kit::types::diagnostics::Diagnostic;
use kit::types::functions::{fn_diag, FunctionSpecification};
use kit::Value;

pub use kit::types::functions::arg_checker;

pub fn to_diag(fn_spec: &FunctionSpecification, e: String) -> Diagnostic {
    fn_diag(fn_spec, e)
}

lazy_static! {
    pub static ref FUNCTIONS: Vec<FunctionSpecification> = {
        let mut functions = vec![];
        functions.extend(collections::COLLECTION_FUNCTIONS.clone());
        functions.extend(strings::STRING_FUNCTIONS.clone());
        functions.extend(numeric::NUMERIC_FUNCTIONS.clone());
        functions.extend(encoding::ENCODING_FUNCTIONS.clone());
        functions
    };
}

pub fn find_function(name: &str) -> Option<&'static FunctionSpecification> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

/// Checks the arity and runs the function.
pub fn call_function(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
    arg_checker(fn_spec, args)?;
    (fn_spec.runner)(fn_spec, args)
}

pub(crate) fn arg<'a>(
    fn_spec: &FunctionSpecification,
    args: &'a [Value],
    index: usize,
) -> Result<&'a Value, Diagnostic> {
    args.get(index).ok_or_else(|| to_diag(fn_spec, format!("missing argument #{}", index + 1)))
}

pub(crate) fn expect_string(
    fn_spec: &FunctionSpecification,
    args: &[Value],
    index: usize,
) -> Result<String, Diagnostic> {
    let value = arg(fn_spec, args, index)?;
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(_) | Value::Bool(_) | Value::Reference(_) => {
            Ok(value.to_template_string().unwrap_or_default())
        }
        other => Err(to_diag(
            fn_spec,
            format!("argument #{} must be a string, got {}", index + 1, other.type_name()),
        )),
    }
}

pub(crate) fn expect_number(
    fn_spec: &FunctionSpecification,
    args: &[Value],
    index: usize,
) -> Result<f64, Diagnostic> {
    let value = arg(fn_spec, args, index)?;
    coerce_number(value).ok_or_else(|| {
        to_diag(
            fn_spec,
            format!("argument #{} must be a number, got {}", index + 1, value.type_name()),
        )
    })
}

pub(crate) fn expect_list<'a>(
    fn_spec: &FunctionSpecification,
    args: &'a [Value],
    index: usize,
) -> Result<&'a Vec<Value>, Diagnostic> {
    let value = arg(fn_spec, args, index)?;
    value.as_list().ok_or_else(|| {
        to_diag(
            fn_spec,
            format!("argument #{} must be a list, got {}", index + 1, value.type_name()),
        )
    })
}

pub(crate) fn expect_map<'a>(
    fn_spec: &FunctionSpecification,
    args: &'a [Value],
    index: usize,
) -> Result<&'a IndexMap<String, Value>, Diagnostic> {
    let value = arg(fn_spec, args, index)?;
    value.as_map().ok_or_else(|| {
        to_diag(
            fn_spec,
            format!("argument #{} must be a map, got {}", index + 1, value.type_name()),
        )
    })
}

/// Numbers pass through and numeric strings convert, as HCL does for
/// arithmetic.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

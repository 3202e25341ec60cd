use super::{diagnostics::Diagnostic, value::Value};

#[derive(Clone, Debug)]
pub struct FunctionInput {
    pub name: String,
    pub documentation: String,
    pub optional: bool,
}

#[derive(Clone, Debug)]
pub struct FunctionOutput {
    pub documentation: String,
}

#[derive(Clone, Debug)]
pub struct FunctionSpecification {
    pub name: String,
    pub documentation: String,
    pub inputs: Vec<FunctionInput>,
    pub output: FunctionOutput,
    /// The last input may repeat.
    pub variadic: bool,
    pub example: String,
    pub runner: FunctionRunner,
}

type FunctionRunner = fn(&FunctionSpecification, &[Value]) -> Result<Value, Diagnostic>;

pub trait FunctionImplementation {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic>;
}

impl FunctionSpecification {
    pub fn min_arity(&self) -> usize {
        self.inputs.iter().filter(|input| !input.optional).count()
    }

    pub fn max_arity(&self) -> Option<usize> {
        if self.variadic {
            None
        } else {
            Some(self.inputs.len())
        }
    }
}

/// Rejects calls whose argument count does not fit the specification.
pub fn arg_checker(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<(), Diagnostic> {
    let min = fn_spec.min_arity();
    if args.len() < min {
        return Err(fn_diag(
            fn_spec,
            format!("expected at least {} argument(s), got {}", min, args.len()),
        ));
    }
    if let Some(max) = fn_spec.max_arity() {
        if args.len() > max {
            return Err(fn_diag(
                fn_spec,
                format!("expected at most {} argument(s), got {}", max, args.len()),
            ));
        }
    }
    Ok(())
}

pub fn fn_diag(fn_spec: &FunctionSpecification, message: String) -> Diagnostic {
    Diagnostic::error_from_string(format!("function '{}': {}", fn_spec.name, message))
}

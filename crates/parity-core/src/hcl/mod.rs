//! HCL evaluation: turns a Terraform-style document into a [`ResourceGraph`].
//!
//! Evaluation is static. Variables come from bindings or defaults, locals
//! and resources are evaluated in dependency order, and references to other
//! resources stay symbolic as [`kit::ResourceRef`] values.

mod blocks;
mod document;
mod eval;
mod scope;
mod template;

pub use eval::HclContext;
pub use scope::Scope;

use kit::hcl::parser::parse_body;
use kit::helpers::location::Position;

use crate::bindings::BindingContext;
use crate::errors::EvalError;
use crate::graph::ResourceGraph;
use crate::provider::ProviderSchema;

pub fn evaluate(
    source: &str,
    bindings: &BindingContext,
    schema: &ProviderSchema,
) -> Result<ResourceGraph, EvalError> {
    let body = parse_body(source).map_err(|e| {
        let location = e.location();
        EvalError::parse(e.message(), Some(Position::new(location.line(), location.column())))
    })?;
    let ctx = HclContext::new(source, bindings, schema);
    document::evaluate_body(ctx, &body)
}

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[macro_use]
pub extern crate parity_kit as kit;

pub mod bindings;
pub mod checker;
pub mod errors;
pub mod graph;
pub mod hcl;
pub mod provider;
pub mod std;
pub mod target;

#[cfg(test)]
mod tests;

use ::std::path::Path;

use strum::{AsRefStr, Display, EnumString};

use crate::bindings::BindingContext;
use crate::errors::EvalError;
use crate::graph::ResourceGraph;
use crate::provider::ProviderSchema;

/// Source language of an input program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
pub enum Language {
    #[strum(to_string = "hcl", serialize = "tf")]
    Hcl,
    #[strum(to_string = "ts", serialize = "typescript")]
    TypeScript,
}

impl Language {
    /// `.tf` and `.hcl` files are HCL, `.ts` files are TypeScript.
    pub fn from_path(path: &Path) -> Option<Language> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tf" | "hcl") => Some(Language::Hcl),
            Some("ts") => Some(Language::TypeScript),
            _ => None,
        }
    }
}

/// Evaluates a program of either language into a finalized graph.
pub fn evaluate(
    language: Language,
    source: &str,
    bindings: &BindingContext,
    schema: &ProviderSchema,
) -> Result<ResourceGraph, EvalError> {
    match language {
        Language::Hcl => hcl::evaluate(source, bindings, schema),
        Language::TypeScript => target::evaluate(source, bindings, schema),
    }
}

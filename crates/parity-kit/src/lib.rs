#[macro_use]
extern crate serde_derive;

#[macro_use]
mod macros;

pub mod helpers;
pub mod types;

pub use hcl_edit as hcl;
pub use indexmap;
pub use indoc::formatdoc;
pub use indoc::indoc;
pub use serde;
pub use serde_json;

pub use types::diagnostics::Diagnostic;
pub use types::value::{RefStep, ResourceId, ResourceRef, Value};

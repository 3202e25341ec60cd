//! Fluent builders for HCL and TypeScript test programs

mod hcl_builder;
mod target_builder;

pub use hcl_builder::HclBuilder;
pub use target_builder::TargetBuilder;

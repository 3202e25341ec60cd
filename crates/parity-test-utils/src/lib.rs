pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod harness;

pub use builders::{HclBuilder, TargetBuilder};
pub use harness::{CheckHarness, HarnessError};

// Re-export common types for convenience
pub use parity_core::bindings::BindingContext;
pub use parity_core::checker::{CheckerConfig, EquivalenceResult, Strategy};
pub use parity_core::errors::ErrorKind;
pub use parity_kit::{ResourceId, Value};

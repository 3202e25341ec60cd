use parity_core::bindings::BindingContext;
use parity_core::checker::{compare_with, CheckerConfig, EquivalenceResult};
use parity_core::errors::{CheckError, ErrorKind, EvalError};
use parity_core::graph::ResourceGraph;
use parity_core::provider::ProviderSchema;
use parity_core::{evaluate, Language};
use parity_kit::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HarnessError {
    #[error("HCL program: {0}")]
    Hcl(EvalError),
    #[error("TypeScript program: {0}")]
    Target(EvalError),
    #[error("{0}")]
    Check(CheckError),
}

impl HarnessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::Hcl(e) | HarnessError::Target(e) => e.kind(),
            HarnessError::Check(e) => e.kind(),
        }
    }
}

/// Runs one HCL program and one TypeScript program through the evaluators
/// and the checker with shared bindings and schema.
#[derive(Clone, Debug)]
pub struct CheckHarness {
    hcl: String,
    target: String,
    bindings: BindingContext,
    schema: ProviderSchema,
    config: CheckerConfig,
}

impl CheckHarness {
    pub fn new(hcl: impl Into<String>, target: impl Into<String>) -> Self {
        CheckHarness {
            hcl: hcl.into(),
            target: target.into(),
            bindings: BindingContext::new(),
            schema: ProviderSchema::builtin().unwrap_or_default(),
            config: CheckerConfig::default(),
        }
    }

    pub fn with_binding(mut self, name: &str, value: Value) -> Self {
        self.bindings.insert(name, value);
        self
    }

    pub fn with_bindings(mut self, bindings: BindingContext) -> Self {
        self.bindings.merge(bindings);
        self
    }

    pub fn with_schema(mut self, schema: ProviderSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_config(mut self, config: CheckerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hcl_graph(&self) -> Result<ResourceGraph, HarnessError> {
        evaluate(Language::Hcl, &self.hcl, &self.bindings, &self.schema).map_err(HarnessError::Hcl)
    }

    pub fn target_graph(&self) -> Result<ResourceGraph, HarnessError> {
        evaluate(Language::TypeScript, &self.target, &self.bindings, &self.schema).map_err(HarnessError::Target)
    }

    pub fn graphs(&self) -> Result<(ResourceGraph, ResourceGraph), HarnessError> {
        Ok((self.hcl_graph()?, self.target_graph()?))
    }

    pub fn run(&self) -> Result<EquivalenceResult, HarnessError> {
        let (left, right) = self.graphs()?;
        compare_with(&left, &right, &self.config).map_err(HarnessError::Check)
    }

    /// Runs the checker with the programs' graphs swapped.
    pub fn run_reversed(&self) -> Result<EquivalenceResult, HarnessError> {
        let (left, right) = self.graphs()?;
        compare_with(&right, &left, &self.config).map_err(HarnessError::Check)
    }
}

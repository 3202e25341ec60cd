//! Mock provider model: which resource types exist, which attributes they
//! take, how nested blocks collapse, and which target-language constructors
//! map to which resource types.

use std::path::Path;

use kit::indexmap::IndexMap;
use kit::serde_json;
use kit::types::diagnostics::Diagnostic;
use thiserror::Error;

use crate::graph::ResourceGraph;

pub const MOCK_AWS_SCHEMA: &str = include_str!("mock_aws.yml");

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unable to read schema file {0}: {1}")]
    Io(String, std::io::Error),
    #[error("invalid provider schema: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nesting {
    #[default]
    List,
    Single,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSchema {
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    #[serde(default)]
    pub nesting: Nesting,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeSchema>,
    #[serde(default)]
    pub blocks: IndexMap<String, BlockSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub resources: IndexMap<String, ResourceSchema>,
}

impl ProviderSchema {
    /// The embedded mock AWS schema.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_yaml_str(MOCK_AWS_SCHEMA)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, SchemaError> {
        serde_yml::from_str(source).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(source).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::Io(path.display().to_string(), e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_yaml_str(&source),
        }
    }

    pub fn resource(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.resources.get(resource_type)
    }

    pub fn knows(&self, resource_type: &str) -> bool {
        self.resources.contains_key(resource_type)
    }

    /// Resource type registered for a constructor path such as
    /// `aws.ec2.Instance`.
    pub fn resolve_alias(&self, constructor: &str) -> Option<&str> {
        self.resources
            .iter()
            .find(|(_, schema)| schema.aliases.iter().any(|alias| alias == constructor))
            .map(|(name, _)| name.as_str())
    }

    pub fn nesting_of(&self, resource_type: &str, block: &str) -> Nesting {
        self.resource(resource_type)
            .and_then(|schema| schema.blocks.get(block))
            .map(|b| b.nesting.clone())
            .unwrap_or_default()
    }

    /// Reports unknown resource types, unknown attributes and missing
    /// required attributes as warnings.
    pub fn validate(&self, graph: &ResourceGraph) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        for resource in graph.resources() {
            let resource_type = &resource.id.resource_type;
            let Some(schema) = self.resource(resource_type) else {
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "resource type '{}' is not part of the '{}' provider schema",
                        resource_type, self.provider
                    ))
                    .with_code("UnknownResourceType")
                    .with_context(resource.id.to_string()),
                );
                continue;
            };
            for name in resource.attributes.keys() {
                if !schema.attributes.contains_key(name) && !schema.blocks.contains_key(name) {
                    diagnostics.push(
                        Diagnostic::warning(format!(
                            "'{}' has no attribute '{}'",
                            resource_type, name
                        ))
                        .with_code("UnknownAttribute")
                        .with_context(resource.id.to_string()),
                    );
                }
            }
            for (name, attribute) in schema.attributes.iter() {
                if attribute.required && !resource.attributes.contains_key(name) {
                    diagnostics.push(
                        Diagnostic::warning(format!("missing required attribute '{}'", name))
                            .with_code("MissingRequiredAttribute")
                            .with_context(resource.id.to_string()),
                    );
                }
            }
        }
        diagnostics
    }
}

//! The binding context shared by both evaluators.
//!
//! Values come from three layers, lowest precedence first: `TF_VAR_<name>`
//! environment variables, a JSON or YAML bindings file, and `name=value`
//! overrides from the command line.

use std::path::{Path, PathBuf};

use kit::indexmap::IndexMap;
use kit::serde_json::{self, Value as JsonValue};
use kit::Value;
use thiserror::Error;

pub const ENV_PREFIX: &str = "TF_VAR_";

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("unable to read bindings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON bindings: {0}")]
    Json(String),
    #[error("invalid YAML bindings: {0}")]
    Yaml(String),
    #[error("bindings must be a map of names to values, found {0}")]
    NotAMap(String),
    #[error("invalid override '{0}', expected name=value")]
    InvalidOverride(String),
}

/// Read-only mapping from variable and config names to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingContext {
    values: IndexMap<String, Value>,
}

impl BindingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: IndexMap<String, Value>) -> Self {
        BindingContext { values }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlays `other` on top of `self`.
    pub fn merge(&mut self, other: BindingContext) {
        for (name, value) in other.values {
            self.values.insert(name, value);
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, BindingError> {
        let json: JsonValue =
            serde_json::from_str(source).map_err(|e| BindingError::Json(e.to_string()))?;
        Self::from_json_value(&json)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, BindingError> {
        let json: JsonValue =
            serde_yml::from_str(source).map_err(|e| BindingError::Yaml(e.to_string()))?;
        Self::from_json_value(&json)
    }

    fn from_json_value(json: &JsonValue) -> Result<Self, BindingError> {
        match Value::from_json(json) {
            Value::Map(values) => Ok(BindingContext { values }),
            Value::Null => Ok(BindingContext::new()),
            other => Err(BindingError::NotAMap(other.type_name().to_string())),
        }
    }

    /// Loads a bindings file, choosing the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self, BindingError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| BindingError::Io { path: path.to_path_buf(), source })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml_str(&source),
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_json_str(&source).or_else(|_| Self::from_yaml_str(&source)),
        }
    }

    /// Picks up `TF_VAR_<name>` entries from the given environment.
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut context = BindingContext::new();
        for (key, raw) in vars {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                if !name.is_empty() {
                    context.insert(name, parse_scalar(&raw));
                }
            }
        }
        context
    }

    pub fn from_env() -> Self {
        Self::from_env_vars(std::env::vars())
    }

    /// Builds the context for one run: environment, then file, then
    /// overrides.
    pub fn load(
        env: BindingContext,
        bindings_file: Option<&Path>,
        overrides: &[String],
    ) -> Result<Self, BindingError> {
        let mut context = env;
        if let Some(path) = bindings_file {
            context.merge(Self::from_file(path)?);
        }
        for raw in overrides {
            let (name, value) = parse_override(raw)?;
            context.insert(name, value);
        }
        tracing::debug!(bindings = context.len(), "binding context loaded");
        Ok(context)
    }
}

/// Values given as text are read as JSON when they parse, and as plain
/// strings otherwise, so `3`, `true` and `["a"]` keep their types.
pub fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(json) => Value::from_json(&json),
        Err(_) => Value::string(raw),
    }
}

pub fn parse_override(raw: &str) -> Result<(String, Value), BindingError> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(BindingError::InvalidOverride(raw.to_string()));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(BindingError::InvalidOverride(raw.to_string()));
    }
    Ok((name.to_string(), parse_scalar(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("3", Value::number(3.0))]
    #[test_case("true", Value::bool(true))]
    #[test_case("us-east-1", Value::string("us-east-1"))]
    #[test_case("\"quoted\"", Value::string("quoted"))]
    #[test_case("[\"a\"]", Value::list(vec![Value::string("a")]))]
    fn test_parse_scalar(raw: &str, expected: Value) {
        assert_eq!(parse_scalar(raw), expected);
    }

    #[test]
    fn test_parse_override() {
        let (name, value) = parse_override("region=eu-west-1").unwrap();
        assert_eq!(name, "region");
        assert_eq!(value, Value::string("eu-west-1"));
        let (_, value) = parse_override("tags={\"a\":\"b=c\"}").unwrap();
        assert_eq!(value.as_map().unwrap()["a"], Value::string("b=c"));
        assert!(parse_override("no_equals").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn test_yaml_and_json_bindings() {
        let json = BindingContext::from_json_str(r#"{"count": 2, "names": ["a", "b"]}"#).unwrap();
        let yaml = BindingContext::from_yaml_str("count: 2\nnames:\n  - a\n  - b\n").unwrap();
        assert_eq!(json, yaml);
        assert!(matches!(
            BindingContext::from_json_str("[1, 2]"),
            Err(BindingError::NotAMap(_))
        ));
    }

    #[test]
    fn test_precedence_env_then_file_then_override() {
        let env = BindingContext::from_env_vars(vec![
            ("TF_VAR_region".to_string(), "us-east-1".to_string()),
            ("TF_VAR_size".to_string(), "1".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(env.len(), 2);

        let dir = std::env::temp_dir().join(format!("parity-bindings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("bindings.json");
        std::fs::write(&file, r#"{"region": "eu-west-1", "size": 2}"#).unwrap();

        let context =
            BindingContext::load(env, Some(&file), &["size=3".to_string()]).unwrap();
        assert_eq!(context.get("region"), Some(&Value::string("eu-west-1")));
        assert_eq!(context.get("size"), Some(&Value::number(3.0)));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

/// Identity of a resource inside a graph: the provider resource type and the
/// instance name given by the program (`aws_instance.web`, `aws_instance.web[0]`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub resource_type: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        ResourceId { resource_type: resource_type.into(), name: name.into() }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// One step of an access path hanging off a resource reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefStep {
    Attr(String),
    Key(String),
    Index(usize),
}

impl Display for RefStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefStep::Attr(name) => write!(f, ".{}", name),
            RefStep::Key(key) => write!(f, "[\"{}\"]", key),
            RefStep::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A first-class pointer to another resource, optionally narrowed to one of
/// its attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub target: ResourceId,
    pub path: Vec<RefStep>,
}

impl ResourceRef {
    pub fn new(target: ResourceId) -> Self {
        ResourceRef { target, path: vec![] }
    }

    pub fn with_step(&self, step: RefStep) -> Self {
        let mut path = self.path.clone();
        path.push(step);
        ResourceRef { target: self.target.clone(), path }
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        self.with_step(RefStep::Attr(name.into()))
    }

    /// Rendering used when a reference is interpolated into a string.
    pub fn placeholder(&self) -> String {
        format!("${{{}}}", self)
    }

    pub fn retarget(&self, target: ResourceId) -> Self {
        ResourceRef { target, path: self.path.clone() }
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        for step in self.path.iter() {
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Values produced by both evaluators.
///
/// Equality is deep: lists compare in order, maps compare as sets of entries
/// regardless of insertion order. `NaN` equals itself so that every value is
/// equal to a copy of itself.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Reference(ResourceRef),
}

impl Value {
    pub fn null() -> Value {
        Value::Null
    }

    pub fn bool(value: bool) -> Value {
        Value::Bool(value)
    }

    pub fn number(value: f64) -> Value {
        Value::Number(value)
    }

    pub fn string(value: impl Into<String>) -> Value {
        Value::String(value.into())
    }

    pub fn list(values: Vec<Value>) -> Value {
        Value::List(values)
    }

    pub fn map(entries: IndexMap<String, Value>) -> Value {
        Value::Map(entries)
    }

    pub fn reference(reference: ResourceRef) -> Value {
        Value::Reference(reference)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ResourceRef> {
        match self {
            Value::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Reference(_) => "reference",
        }
    }

    /// Text produced when the value is spliced into a string template.
    /// Collections have no template form.
    pub fn to_template_string(&self) -> Option<String> {
        match self {
            Value::String(value) => Some(value.clone()),
            Value::Number(value) => Some(format_number(*value)),
            Value::Bool(value) => Some(value.to_string()),
            Value::Reference(reference) => Some(reference.placeholder()),
            Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(value) => JsonValue::Bool(*value),
            Value::Number(value) => number_to_json(*value),
            Value::String(value) => JsonValue::String(value.clone()),
            Value::List(values) => JsonValue::Array(values.iter().map(|v| v.to_json()).collect()),
            Value::Map(entries) => {
                let mut map = JsonMap::new();
                for (key, value) in entries.iter() {
                    map.insert(key.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
            Value::Reference(reference) => JsonValue::String(reference.placeholder()),
        }
    }

    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(value) => Value::Bool(*value),
            JsonValue::Number(value) => Value::Number(value.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(value) => Value::String(value.clone()),
            JsonValue::Array(values) => Value::List(values.iter().map(Value::from_json).collect()),
            JsonValue::Object(entries) => Value::Map(
                entries.iter().map(|(key, value)| (key.clone(), Value::from_json(value))).collect(),
            ),
        }
    }

    /// Structured references reachable from this value.
    pub fn collect_references(&self) -> Vec<&ResourceRef> {
        let mut references = vec![];
        self.walk(&mut |value| {
            if let Value::Reference(reference) = value {
                references.push(reference);
            }
        });
        references
    }

    /// Inner text of every `${...}` placeholder found in string leaves.
    pub fn collect_placeholders(&self) -> Vec<String> {
        let mut placeholders = vec![];
        self.walk(&mut |value| {
            if let Value::String(text) = value {
                placeholders.extend(scan_placeholders(text).into_iter().map(|(_, inner)| inner));
            }
        });
        placeholders
    }

    fn walk<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a Value),
    {
        visitor(self);
        match self {
            Value::List(values) => {
                for value in values.iter() {
                    value.walk(&mut *visitor);
                }
            }
            Value::Map(entries) => {
                for value in entries.values() {
                    value.walk(&mut *visitor);
                }
            }
            _ => {}
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Number(value) => write!(f, "{}", format_number(*value)),
            Value::String(value) => write!(f, "{:?}", value),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Reference(reference) => write!(f, "{}", reference),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Integral numbers print without a fractional part so `3` renders the same
/// way in both languages.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn number_to_json(value: f64) -> JsonValue {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        JsonValue::from(value as i64)
    } else {
        JsonNumber::from_f64(value).map(JsonValue::Number).unwrap_or(JsonValue::Null)
    }
}

/// Finds `${...}` placeholders in a string, returning the byte range of each
/// placeholder (delimiters included) together with its trimmed inner text.
/// Unterminated placeholders are ignored.
pub fn scan_placeholders(text: &str) -> Vec<(std::ops::Range<usize>, String)> {
    let bytes = text.as_bytes();
    let mut found = vec![];
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'{' {
            let start = i;
            let mut depth = 1;
            let mut j = i + 2;
            while j < bytes.len() && depth > 0 {
                match bytes[j] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            if depth != 0 {
                break;
            }
            found.push((start..j, text[start + 2..j - 1].trim().to_string()));
            i = j;
        } else {
            i += 1;
        }
    }
    found
}

use kit::serde_json::{self, Map as JsonMap, Value as JsonValue};
use kit::types::diagnostics::Diagnostic;
use kit::types::functions::{FunctionImplementation, FunctionSpecification};
use kit::{define_function, indoc, Value};

use super::{arg, collections::sorted_entries, expect_string, to_diag};

lazy_static! {
    pub static ref ENCODING_FUNCTIONS: Vec<FunctionSpecification> = vec![
        define_function! {
            JsonEncode => {
                name: "jsonencode",
                documentation: "`jsonencode` serializes a value to a compact JSON string. Object keys are sorted.",
                example: indoc! {r#"
                    output "policy" {
                        value = jsonencode({ b = 1, a = true })
                    }
                    > policy: {"a":true,"b":1}
                "#},
                inputs: [
                    value: { documentation: "The value to encode." }
                ],
                output: { documentation: "The JSON text." },
            }
        },
        define_function! {
            JsonDecode => {
                name: "jsondecode",
                documentation: "`jsondecode` parses a JSON string into a value.",
                example: indoc! {r#"
                    output "parsed" {
                        value = jsondecode("{\"a\": 1}")
                    }
                    > parsed: { a = 1 }
                "#},
                inputs: [
                    json: { documentation: "The JSON text." }
                ],
                output: { documentation: "The decoded value." },
            }
        },
    ];
}

/// JSON form with object keys in lexicographic order.
pub fn to_sorted_json(value: &Value) -> JsonValue {
    match value {
        Value::List(values) => JsonValue::Array(values.iter().map(to_sorted_json).collect()),
        Value::Map(entries) => {
            let mut map = JsonMap::new();
            for (key, entry) in sorted_entries(entries) {
                map.insert(key.clone(), to_sorted_json(entry));
            }
            JsonValue::Object(map)
        }
        other => other.to_json(),
    }
}

pub struct JsonEncode;
impl FunctionImplementation for JsonEncode {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let json = to_sorted_json(arg(fn_spec, args, 0)?);
        serde_json::to_string(&json)
            .map(Value::string)
            .map_err(|e| to_diag(fn_spec, format!("failed to encode: {e}")))
    }
}

pub struct JsonDecode;
impl FunctionImplementation for JsonDecode {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let text = expect_string(fn_spec, args, 0)?;
        let json: JsonValue = serde_json::from_str(&text)
            .map_err(|e| to_diag(fn_spec, format!("failed to decode input as json: {e}")))?;
        Ok(Value::from_json(&json))
    }
}

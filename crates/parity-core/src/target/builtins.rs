//! Methods and globals available to target programs: the array, string and
//! number prototypes, `Object`, `JSON`, `Math`, `console`, the `pulumi`
//! module and the stack configuration.

use std::cmp::Ordering;

use kit::indexmap::IndexMap;
use kit::serde_json::{self, ser::PrettyFormatter, Serializer, Value as JsonValue};
use kit::types::value::format_number;
use kit::Value;
use serde::Serialize;

use crate::errors::EvalError;

use super::eval::{js_to_string, truthy, Global, Runtime, TargetEvaluator};

fn arg(args: &[Runtime], index: usize) -> Runtime {
    args.get(index).cloned().unwrap_or_else(Runtime::null)
}

fn value_arg(args: &[Runtime], index: usize) -> Result<Value, EvalError> {
    arg(args, index).into_value()
}

fn string_arg(args: &[Runtime], index: usize, method: &str) -> Result<String, EvalError> {
    match value_arg(args, index)? {
        Value::String(s) => Ok(s),
        other => Err(EvalError::type_error(format!(
            "{}: argument #{} must be a string, got {}",
            method,
            index + 1,
            other.type_name()
        ))),
    }
}

/// Relative index as `slice` interprets it: negatives count from the end,
/// everything clamps into `0..=len`.
fn relative_index(value: Option<f64>, len: usize, default: usize) -> usize {
    match value {
        None => default,
        Some(n) if n < 0.0 => (len as f64 + n.trunc()).max(0.0) as usize,
        Some(n) => (n.trunc() as usize).min(len),
    }
}

fn entries_to_map(items: Vec<Value>, method: &str) -> Result<Value, EvalError> {
    let mut map = IndexMap::new();
    for item in items {
        let Value::List(pair) = item else {
            return Err(EvalError::type_error(format!(
                "{}: expected [key, value] pairs, got {}",
                method,
                item.type_name()
            )));
        };
        let mut pair = pair.into_iter();
        let key = pair.next().unwrap_or(Value::Null);
        let value = pair.next().unwrap_or(Value::Null);
        map.insert(js_to_string(&key), value);
    }
    Ok(Value::map(map))
}

fn json_stringify(value: &Value, indent: Option<usize>) -> Result<String, EvalError> {
    let json = value.to_json();
    let text = match indent {
        Some(width) if width > 0 => {
            let indent = " ".repeat(width.min(10));
            let mut out = vec![];
            let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
            json.serialize(&mut serializer).map_err(|e| EvalError::type_error(e.to_string()))?;
            String::from_utf8(out).map_err(|e| EvalError::type_error(e.to_string()))?
        }
        _ => serde_json::to_string(&json).map_err(|e| EvalError::type_error(e.to_string()))?,
    };
    Ok(text)
}

fn coerce_config_bool(value: Value, name: &str) -> Result<Value, EvalError> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::String(s) if s == "true" || s == "false" => Ok(Value::bool(s == "true")),
        other => Err(EvalError::type_error(format!(
            "configuration value '{}' is not a boolean (got {})",
            name,
            other.type_name()
        ))),
    }
}

/// Structured configuration may be given as a JSON string.
fn coerce_config_object(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<JsonValue>(&text) {
            Ok(json @ (JsonValue::Object(_) | JsonValue::Array(_))) => Value::from_json(&json),
            _ => Value::String(text),
        },
        other => other,
    }
}

impl<'a> TargetEvaluator<'a> {
    pub(crate) fn call_method(
        &mut self,
        receiver: Runtime,
        method: &str,
        args: Vec<Runtime>,
    ) -> Result<Runtime, EvalError> {
        match receiver {
            Runtime::Config => self.config_method(method, &args),
            Runtime::Global(global) => self.global_method(global, method, args),
            Runtime::Data(value) if method == "apply" => {
                let callback = arg(&args, 0);
                self.call(&callback, vec![Runtime::Data(value)])
            }
            Runtime::Data(Value::List(items)) => self.array_method(items, method, args),
            Runtime::Data(Value::String(s)) => self.string_method(s, method, &args),
            Runtime::Data(Value::Number(n)) => self.number_method(n, method, &args),
            Runtime::Data(Value::Null) => {
                Err(EvalError::type_error(format!("cannot call '{}' on null", method)))
            }
            Runtime::Namespace(namespace) => Err(EvalError::unsupported(format!(
                "calling '{}.{}' (only constructors are modelled)",
                namespace.provider, method
            ))),
            other => Err(EvalError::unsupported(format!("method '{}' on a {}", method, other.type_name()))),
        }
    }

    pub(crate) fn call_global(&mut self, global: Global, args: Vec<Runtime>) -> Result<Runtime, EvalError> {
        let value = match global {
            Global::String => Value::string(js_to_string(&value_arg(&args, 0)?)),
            Global::Number => match value_arg(&args, 0)? {
                Value::String(s) if s.trim().is_empty() => Value::number(0.0),
                Value::String(s) => Value::number(s.trim().parse::<f64>().unwrap_or(f64::NAN)),
                other => Value::number(self.expect_number(&Runtime::Data(other))?),
            },
            Global::Boolean => Value::bool(truthy(&arg(&args, 0))),
            other => return Err(EvalError::type_error(format!("{:?} is not callable", other))),
        };
        Ok(Runtime::Data(value))
    }

    fn config_method(&mut self, method: &str, args: &[Runtime]) -> Result<Runtime, EvalError> {
        let name = string_arg(args, 0, method)?;
        let (required, kind) = match method.strip_prefix("require") {
            Some(kind) => (true, kind),
            None => match method.strip_prefix("get") {
                Some(kind) => (false, kind),
                None => return Err(EvalError::unsupported(format!("config.{}", method))),
            },
        };
        let Some(value) = self.config_value(&name) else {
            if required {
                return Err(EvalError::unbound(name));
            }
            return Ok(Runtime::null());
        };
        let value = match kind {
            "" | "Secret" => value,
            "Number" => Value::number(self.expect_number(&Runtime::Data(value))?),
            "Boolean" => coerce_config_bool(value, &name)?,
            "Object" | "SecretObject" => coerce_config_object(value),
            _ => return Err(EvalError::unsupported(format!("config.{}", method))),
        };
        Ok(Runtime::Data(value))
    }

    fn global_method(&mut self, global: Global, method: &str, args: Vec<Runtime>) -> Result<Runtime, EvalError> {
        let value = match (global, method) {
            (Global::Object, "keys") => match value_arg(&args, 0)? {
                Value::Map(entries) => Value::list(entries.into_keys().map(Value::string).collect()),
                Value::List(items) => Value::list((0..items.len()).map(|i| Value::string(i.to_string())).collect()),
                _ => Value::list(vec![]),
            },
            (Global::Object, "values") => match value_arg(&args, 0)? {
                Value::Map(entries) => Value::list(entries.into_values().collect()),
                Value::List(items) => Value::list(items),
                _ => Value::list(vec![]),
            },
            (Global::Object, "entries") => match value_arg(&args, 0)? {
                Value::Map(entries) => Value::list(
                    entries.into_iter().map(|(k, v)| Value::list(vec![Value::string(k), v])).collect(),
                ),
                _ => Value::list(vec![]),
            },
            (Global::Object, "fromEntries") => match value_arg(&args, 0)? {
                Value::List(items) => entries_to_map(items, "Object.fromEntries")?,
                other => {
                    return Err(EvalError::type_error(format!(
                        "Object.fromEntries expects a list, got {}",
                        other.type_name()
                    )))
                }
            },
            (Global::Object, "assign") => {
                let mut merged = IndexMap::new();
                for source in args {
                    match source.into_value()? {
                        Value::Map(entries) => merged.extend(entries),
                        Value::Null => {}
                        other => {
                            return Err(EvalError::type_error(format!(
                                "Object.assign expects objects, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                Value::map(merged)
            }
            (Global::Json, "stringify") => {
                let value = value_arg(&args, 0)?;
                let indent = match value_arg(&args, 2)? {
                    Value::Number(n) if n > 0.0 => Some(n as usize),
                    _ => None,
                };
                Value::string(json_stringify(&value, indent)?)
            }
            (Global::Json, "parse") => {
                let text = string_arg(&args, 0, "JSON.parse")?;
                let json: JsonValue = serde_json::from_str(&text)
                    .map_err(|e| EvalError::type_error(format!("JSON.parse: {}", e)))?;
                Value::from_json(&json)
            }
            (Global::Math, "max" | "min") => {
                let mut numbers = vec![];
                for value in args.iter() {
                    numbers.push(self.expect_number(value)?);
                }
                let folded = if method == "max" {
                    numbers.into_iter().fold(f64::NEG_INFINITY, f64::max)
                } else {
                    numbers.into_iter().fold(f64::INFINITY, f64::min)
                };
                Value::number(folded)
            }
            (Global::Math, "floor" | "ceil" | "round" | "abs") => {
                let n = self.expect_number(&arg(&args, 0))?;
                Value::number(match method {
                    "floor" => n.floor(),
                    "ceil" => n.ceil(),
                    "round" => (n + 0.5).floor(),
                    _ => n.abs(),
                })
            }
            (Global::Array, "isArray") => Value::bool(matches!(arg(&args, 0), Runtime::Data(Value::List(_)))),
            (Global::Array, "from") => match value_arg(&args, 0)? {
                Value::List(items) => Value::list(items),
                Value::String(s) => Value::list(s.chars().map(|c| Value::string(c.to_string())).collect()),
                _ => Value::list(vec![]),
            },
            (Global::Console, _) => {
                let rendered = args
                    .iter()
                    .map(|a| a.as_value().map(js_to_string).unwrap_or_else(|| a.type_name().to_string()))
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::debug!(target: "parity::console", "{}", rendered);
                Value::Null
            }
            (Global::Pulumi, "output" | "secret" | "all") => value_arg(&args, 0)?,
            (Global::Pulumi, "concat") => {
                let mut out = String::new();
                for value in args {
                    out.push_str(&js_to_string(&value.into_value()?));
                }
                Value::string(out)
            }
            (Global::Pulumi, "interpolate") => {
                return Err(EvalError::unsupported("pulumi.interpolate outside a tagged template"))
            }
            (global, method) => {
                return Err(EvalError::unsupported(format!("{:?}.{}", global, method)));
            }
        };
        Ok(Runtime::Data(value))
    }

    fn callback_value(&mut self, callback: &Runtime, args: Vec<Runtime>) -> Result<Value, EvalError> {
        self.call(callback, args)?.into_value()
    }

    fn array_method(&mut self, items: Vec<Value>, method: &str, args: Vec<Runtime>) -> Result<Runtime, EvalError> {
        let callback = arg(&args, 0);
        let indexed = |item: &Value, index: usize| vec![Runtime::Data(item.clone()), Value::number(index as f64).into()];
        let value = match method {
            "map" => {
                let mut mapped = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    mapped.push(self.callback_value(&callback, indexed(item, index))?);
                }
                Value::list(mapped)
            }
            "filter" => {
                let mut kept = vec![];
                for (index, item) in items.iter().enumerate() {
                    if truthy(&self.call(&callback, indexed(item, index))?) {
                        kept.push(item.clone());
                    }
                }
                Value::list(kept)
            }
            "flatMap" => {
                let mut flattened = vec![];
                for (index, item) in items.iter().enumerate() {
                    match self.callback_value(&callback, indexed(item, index))? {
                        Value::List(inner) => flattened.extend(inner),
                        other => flattened.push(other),
                    }
                }
                Value::list(flattened)
            }
            "forEach" => {
                for (index, item) in items.iter().enumerate() {
                    self.call(&callback, indexed(item, index))?;
                }
                Value::Null
            }
            "reduce" => {
                let mut remaining = items.into_iter().enumerate();
                let mut accumulator = match args.get(1) {
                    Some(initial) => initial.clone().into_value()?,
                    None => match remaining.next() {
                        Some((_, first)) => first,
                        None => return Err(EvalError::type_error("reduce of empty array with no initial value")),
                    },
                };
                for (index, item) in remaining {
                    accumulator = self.callback_value(
                        &callback,
                        vec![accumulator.into(), item.into(), Value::number(index as f64).into()],
                    )?;
                }
                accumulator
            }
            "find" | "findIndex" => {
                let mut found = None;
                for (index, item) in items.iter().enumerate() {
                    if truthy(&self.call(&callback, indexed(item, index))?) {
                        found = Some(index);
                        break;
                    }
                }
                match (method, found) {
                    ("find", Some(index)) => items[index].clone(),
                    ("find", None) => Value::Null,
                    (_, Some(index)) => Value::number(index as f64),
                    (_, None) => Value::number(-1.0),
                }
            }
            "some" | "every" => {
                let every = method == "every";
                let mut result = every;
                for (index, item) in items.iter().enumerate() {
                    if truthy(&self.call(&callback, indexed(item, index))?) != every {
                        result = !every;
                        break;
                    }
                }
                Value::bool(result)
            }
            "includes" => {
                let needle = value_arg(&args, 0)?;
                Value::bool(items.contains(&needle))
            }
            "indexOf" => {
                let needle = value_arg(&args, 0)?;
                let index = items.iter().position(|item| *item == needle);
                Value::number(index.map(|i| i as f64).unwrap_or(-1.0))
            }
            "join" => {
                let separator = match value_arg(&args, 0)? {
                    Value::Null => ",".to_string(),
                    other => js_to_string(&other),
                };
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| if item.is_null() { String::new() } else { js_to_string(item) })
                    .collect();
                Value::string(parts.join(&separator))
            }
            "concat" => {
                let mut joined = items;
                for extra in args {
                    match extra.into_value()? {
                        Value::List(more) => joined.extend(more),
                        other => joined.push(other),
                    }
                }
                Value::list(joined)
            }
            "slice" => {
                let len = items.len();
                let start = relative_index(value_arg(&args, 0)?.as_f64(), len, 0);
                let end = relative_index(value_arg(&args, 1)?.as_f64(), len, len);
                Value::list(if start < end { items[start..end].to_vec() } else { vec![] })
            }
            "reverse" => Value::list(items.into_iter().rev().collect()),
            "sort" => Value::list(self.sort(items, &callback)?),
            "entries" => Value::list(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Value::list(vec![Value::number(i as f64), item]))
                    .collect(),
            ),
            "toMap" => entries_to_map(items, "toMap")?,
            _ => return Err(EvalError::unsupported(format!("array method '{}'", method))),
        };
        Ok(Runtime::Data(value))
    }

    /// Without a comparator, elements sort by their string form as
    /// JavaScript does. With one, an insertion sort keeps equal elements in
    /// their original order.
    fn sort(&mut self, items: Vec<Value>, comparator: &Runtime) -> Result<Vec<Value>, EvalError> {
        if matches!(comparator, Runtime::Data(Value::Null)) {
            let mut keyed: Vec<(String, Value)> = items.into_iter().map(|v| (js_to_string(&v), v)).collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            return Ok(keyed.into_iter().map(|(_, v)| v).collect());
        }
        let mut sorted: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            let mut position = sorted.len();
            while position > 0 {
                let order = self.call(comparator, vec![sorted[position - 1].clone().into(), item.clone().into()])?;
                let order = self.expect_number(&order)?;
                if order.partial_cmp(&0.0) != Some(Ordering::Greater) {
                    break;
                }
                position -= 1;
            }
            sorted.insert(position, item);
        }
        Ok(sorted)
    }

    fn string_method(&mut self, s: String, method: &str, args: &[Runtime]) -> Result<Runtime, EvalError> {
        let value = match method {
            "toUpperCase" => Value::string(s.to_uppercase()),
            "toLowerCase" => Value::string(s.to_lowercase()),
            "trim" => Value::string(s.trim()),
            "trimStart" => Value::string(s.trim_start()),
            "trimEnd" => Value::string(s.trim_end()),
            "toString" => Value::string(s),
            "split" => match value_arg(args, 0)? {
                Value::Null => Value::list(vec![Value::string(s)]),
                Value::String(sep) if sep.is_empty() => {
                    Value::list(s.chars().map(|c| Value::string(c.to_string())).collect())
                }
                Value::String(sep) => Value::list(s.split(sep.as_str()).map(Value::string).collect()),
                other => {
                    return Err(EvalError::type_error(format!(
                        "split: separator must be a string, got {}",
                        other.type_name()
                    )))
                }
            },
            "startsWith" => Value::bool(s.starts_with(string_arg(args, 0, method)?.as_str())),
            "endsWith" => Value::bool(s.ends_with(string_arg(args, 0, method)?.as_str())),
            "includes" => Value::bool(s.contains(string_arg(args, 0, method)?.as_str())),
            "indexOf" => {
                let needle = string_arg(args, 0, method)?;
                let index = s.find(needle.as_str()).map(|byte| s[..byte].chars().count() as f64);
                Value::number(index.unwrap_or(-1.0))
            }
            "replace" => {
                let from = string_arg(args, 0, method)?;
                let to = js_to_string(&value_arg(args, 1)?);
                Value::string(s.replacen(from.as_str(), &to, 1))
            }
            "replaceAll" => {
                let from = string_arg(args, 0, method)?;
                let to = js_to_string(&value_arg(args, 1)?);
                Value::string(s.replace(from.as_str(), &to))
            }
            "slice" | "substring" => {
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len();
                let start = value_arg(args, 0)?.as_f64();
                let end = value_arg(args, 1)?.as_f64();
                let (start, end) = if method == "slice" {
                    (relative_index(start, len, 0), relative_index(end, len, len))
                } else {
                    let clamp = |n: Option<f64>, default: usize| n.map(|n| n.max(0.0).min(len as f64) as usize).unwrap_or(default);
                    let (a, b) = (clamp(start, 0), clamp(end, len));
                    (a.min(b), a.max(b))
                };
                Value::string(if start < end { chars[start..end].iter().collect::<String>() } else { String::new() })
            }
            "padStart" | "padEnd" => {
                let width = self.expect_number(&arg(args, 0))? as usize;
                let fill = match value_arg(args, 1)? {
                    Value::String(fill) if !fill.is_empty() => fill,
                    _ => " ".to_string(),
                };
                let missing = width.saturating_sub(s.chars().count());
                let padding: String = fill.chars().cycle().take(missing).collect();
                Value::string(if method == "padStart" { format!("{}{}", padding, s) } else { format!("{}{}", s, padding) })
            }
            _ => return Err(EvalError::unsupported(format!("string method '{}'", method))),
        };
        Ok(Runtime::Data(value))
    }

    fn number_method(&mut self, n: f64, method: &str, args: &[Runtime]) -> Result<Runtime, EvalError> {
        let value = match method {
            "toString" => Value::string(format_number(n)),
            "toFixed" => {
                let digits = match value_arg(args, 0)? {
                    Value::Number(d) => d.clamp(0.0, 20.0) as usize,
                    _ => 0,
                };
                Value::string(format!("{:.*}", digits, n))
            }
            _ => return Err(EvalError::unsupported(format!("number method '{}'", method))),
        };
        Ok(Runtime::Data(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_index_clamps_and_counts_from_the_end() {
        assert_eq!(relative_index(None, 5, 0), 0);
        assert_eq!(relative_index(Some(-2.0), 5, 0), 3);
        assert_eq!(relative_index(Some(-9.0), 5, 0), 0);
        assert_eq!(relative_index(Some(9.0), 5, 0), 5);
    }

    #[test]
    fn test_entries_to_map_lets_later_keys_win() {
        let pairs = vec![
            Value::list(vec![Value::string("a"), Value::number(1.0)]),
            Value::list(vec![Value::string("a"), Value::number(2.0)]),
        ];
        let map = entries_to_map(pairs, "toMap").unwrap();
        assert_eq!(map.as_map().unwrap().len(), 1);
        assert_eq!(map.as_map().unwrap()["a"], Value::number(2.0));
    }

    #[test]
    fn test_json_stringify_keeps_insertion_order() {
        let value = Value::map(IndexMap::from([
            ("b".to_string(), Value::number(1.0)),
            ("a".to_string(), Value::bool(true)),
        ]));
        assert_eq!(json_stringify(&value, None).unwrap(), r#"{"b":1,"a":true}"#);
        assert_eq!(json_stringify(&value, Some(2)).unwrap(), "{\n  \"b\": 1,\n  \"a\": true\n}");
    }

    #[test]
    fn test_config_objects_may_be_json_strings() {
        let value = coerce_config_object(Value::string(r#"{"size": 2}"#));
        assert_eq!(value.as_map().unwrap()["size"], Value::number(2.0));
        assert_eq!(coerce_config_object(Value::string("plain")), Value::string("plain"));
    }
}

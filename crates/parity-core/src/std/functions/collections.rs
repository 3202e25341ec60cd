use kit::indexmap::IndexMap;
use kit::types::diagnostics::Diagnostic;
use kit::types::functions::{FunctionImplementation, FunctionSpecification};
use kit::{define_function, indoc, Value};

use super::{arg, expect_list, expect_map, expect_number, expect_string, to_diag};

lazy_static! {
    pub static ref COLLECTION_FUNCTIONS: Vec<FunctionSpecification> = vec![
        define_function! {
            Length => {
                name: "length",
                documentation: "`length` returns the number of elements in a list or map, or the number of characters in a string.",
                example: indoc! {r#"
                    output "count" {
                        value = length(["a", "b"])
                    }
                    > count: 2
                "#},
                inputs: [
                    value: { documentation: "A list, map or string." }
                ],
                output: { documentation: "The length of the value." },
            }
        },
        define_function! {
            Concat => {
                name: "concat",
                documentation: "`concat` joins several lists into one.",
                example: indoc! {r#"
                    output "all" {
                        value = concat(["a"], ["b", "c"])
                    }
                    > all: ["a", "b", "c"]
                "#},
                inputs: [
                    lists: { documentation: "The lists to join." }
                ],
                output: { documentation: "A single list." },
                variadic: true,
            }
        },
        define_function! {
            Flatten => {
                name: "flatten",
                documentation: "`flatten` replaces nested lists with their elements, recursively.",
                example: indoc! {r#"
                    output "flat" {
                        value = flatten([["a"], [["b"]]])
                    }
                    > flat: ["a", "b"]
                "#},
                inputs: [
                    list: { documentation: "A list of lists." }
                ],
                output: { documentation: "The flattened list." },
            }
        },
        define_function! {
            Distinct => {
                name: "distinct",
                documentation: "`distinct` removes duplicate elements, keeping the first occurrence.",
                example: indoc! {r#"
                    output "unique" {
                        value = distinct(["a", "b", "a"])
                    }
                    > unique: ["a", "b"]
                "#},
                inputs: [
                    list: { documentation: "The list to deduplicate." }
                ],
                output: { documentation: "The list without duplicates." },
            }
        },
        define_function! {
            Reverse => {
                name: "reverse",
                documentation: "`reverse` returns the list in reverse order.",
                example: indoc! {r#"
                    output "reversed" {
                        value = reverse([1, 2])
                    }
                    > reversed: [2, 1]
                "#},
                inputs: [
                    list: { documentation: "The list to reverse." }
                ],
                output: { documentation: "The reversed list." },
            }
        },
        define_function! {
            Sort => {
                name: "sort",
                documentation: "`sort` orders a list of strings lexicographically. Numbers are sorted by their string form.",
                example: indoc! {r#"
                    output "sorted" {
                        value = sort(["b", "a"])
                    }
                    > sorted: ["a", "b"]
                "#},
                inputs: [
                    list: { documentation: "The list to sort." }
                ],
                output: { documentation: "The sorted list." },
            }
        },
        define_function! {
            Compact => {
                name: "compact",
                documentation: "`compact` removes null and empty string elements from a list.",
                example: indoc! {r#"
                    output "compacted" {
                        value = compact(["a", "", null])
                    }
                    > compacted: ["a"]
                "#},
                inputs: [
                    list: { documentation: "The list to compact." }
                ],
                output: { documentation: "The list without empty elements." },
            }
        },
        define_function! {
            Contains => {
                name: "contains",
                documentation: "`contains` tells whether a list holds the given value.",
                example: indoc! {r#"
                    output "found" {
                        value = contains(["a"], "a")
                    }
                    > found: true
                "#},
                inputs: [
                    list: { documentation: "The list to search." },
                    value: { documentation: "The value to look for." }
                ],
                output: { documentation: "`true` when the value is present." },
            }
        },
        define_function! {
            Element => {
                name: "element",
                documentation: "`element` retrieves an element from a list, wrapping around when the index exceeds the length.",
                example: indoc! {r#"
                    output "second" {
                        value = element(["a", "b"], 3)
                    }
                    > second: b
                "#},
                inputs: [
                    list: { documentation: "A non-empty list." },
                    index: { documentation: "The index of the element." }
                ],
                output: { documentation: "The selected element." },
            }
        },
        define_function! {
            Index => {
                name: "index",
                documentation: "`index` returns the position of the first element equal to the given value.",
                example: indoc! {r#"
                    output "pos" {
                        value = index(["a", "b"], "b")
                    }
                    > pos: 1
                "#},
                inputs: [
                    list: { documentation: "The list to search." },
                    value: { documentation: "The value to look for." }
                ],
                output: { documentation: "The index of the value." },
            }
        },
        define_function! {
            Keys => {
                name: "keys",
                documentation: "`keys` returns the keys of a map in lexicographic order.",
                example: indoc! {r#"
                    output "names" {
                        value = keys({ b = 1, a = 2 })
                    }
                    > names: ["a", "b"]
                "#},
                inputs: [
                    map: { documentation: "The map to read." }
                ],
                output: { documentation: "The sorted keys." },
            }
        },
        define_function! {
            Values => {
                name: "values",
                documentation: "`values` returns the values of a map, ordered by their keys.",
                example: indoc! {r#"
                    output "sizes" {
                        value = values({ b = 1, a = 2 })
                    }
                    > sizes: [2, 1]
                "#},
                inputs: [
                    map: { documentation: "The map to read." }
                ],
                output: { documentation: "The values, ordered by key." },
            }
        },
        define_function! {
            Lookup => {
                name: "lookup",
                documentation: "`lookup` retrieves the value of a map key, falling back to a default when the key is absent.",
                example: indoc! {r#"
                    output "size" {
                        value = lookup({ a = "small" }, "b", "medium")
                    }
                    > size: medium
                "#},
                inputs: [
                    map: { documentation: "The map to read." },
                    key: { documentation: "The key to look up." },
                    default: { documentation: "Value returned when the key is absent.", optional: true }
                ],
                output: { documentation: "The value found, or the default." },
            }
        },
        define_function! {
            Merge => {
                name: "merge",
                documentation: "`merge` combines maps. Keys from later maps win.",
                example: indoc! {r#"
                    output "tags" {
                        value = merge({ a = 1 }, { a = 2, b = 3 })
                    }
                    > tags: { a = 2, b = 3 }
                "#},
                inputs: [
                    maps: { documentation: "The maps to merge." }
                ],
                output: { documentation: "The merged map." },
                variadic: true,
            }
        },
        define_function! {
            Zipmap => {
                name: "zipmap",
                documentation: "`zipmap` builds a map from a list of keys and a list of values.",
                example: indoc! {r#"
                    output "pairs" {
                        value = zipmap(["a", "b"], [1, 2])
                    }
                    > pairs: { a = 1, b = 2 }
                "#},
                inputs: [
                    keys: { documentation: "The keys." },
                    values: { documentation: "The values, same length as the keys." }
                ],
                output: { documentation: "The resulting map." },
            }
        },
        define_function! {
            Range => {
                name: "range",
                documentation: "`range` generates a list of numbers from `start` up to, not including, `limit`.",
                example: indoc! {r#"
                    output "indices" {
                        value = range(3)
                    }
                    > indices: [0, 1, 2]
                "#},
                inputs: [
                    start: { documentation: "The limit, or the start when more arguments follow." },
                    limit: { documentation: "The exclusive limit.", optional: true },
                    step: { documentation: "The increment.", optional: true }
                ],
                output: { documentation: "A list of numbers." },
            }
        },
        define_function! {
            Coalesce => {
                name: "coalesce",
                documentation: "`coalesce` returns the first argument that is neither null nor an empty string.",
                example: indoc! {r#"
                    output "name" {
                        value = coalesce(null, "", "web")
                    }
                    > name: web
                "#},
                inputs: [
                    values: { documentation: "The candidate values." }
                ],
                output: { documentation: "The first non-empty value." },
                variadic: true,
            }
        },
        define_function! {
            ToList => {
                name: "tolist",
                documentation: "`tolist` converts a list-like value to a list.",
                example: indoc! {r#"
                    output "items" {
                        value = tolist(["a"])
                    }
                    > items: ["a"]
                "#},
                inputs: [
                    value: { documentation: "The value to convert." }
                ],
                output: { documentation: "A list." },
            }
        },
        define_function! {
            ToSet => {
                name: "toset",
                documentation: "`toset` removes duplicates from a list. Lists of strings come back sorted.",
                example: indoc! {r#"
                    output "set" {
                        value = toset(["b", "a", "b"])
                    }
                    > set: ["a", "b"]
                "#},
                inputs: [
                    value: { documentation: "The list to convert." }
                ],
                output: { documentation: "A list without duplicates." },
            }
        },
        define_function! {
            ToMap => {
                name: "tomap",
                documentation: "`tomap` converts an object to a map.",
                example: indoc! {r#"
                    output "tags" {
                        value = tomap({ a = "b" })
                    }
                    > tags: { a = "b" }
                "#},
                inputs: [
                    value: { documentation: "The object to convert." }
                ],
                output: { documentation: "A map." },
            }
        },
    ];
}

pub struct Length;
impl FunctionImplementation for Length {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let length = match arg(fn_spec, args, 0)? {
            Value::List(values) => values.len(),
            Value::Map(entries) => entries.len(),
            Value::String(s) => s.chars().count(),
            other => {
                return Err(to_diag(fn_spec, format!("cannot take the length of {}", other.type_name())))
            }
        };
        Ok(Value::number(length as f64))
    }
}

pub struct Concat;
impl FunctionImplementation for Concat {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let mut result = vec![];
        for index in 0..args.len() {
            result.extend(expect_list(fn_spec, args, index)?.iter().cloned());
        }
        Ok(Value::list(result))
    }
}

pub struct Flatten;
impl FunctionImplementation for Flatten {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        fn flatten_into(values: &[Value], out: &mut Vec<Value>) {
            for value in values {
                match value {
                    Value::List(inner) => flatten_into(inner, out),
                    other => out.push(other.clone()),
                }
            }
        }
        let mut result = vec![];
        flatten_into(expect_list(fn_spec, args, 0)?, &mut result);
        Ok(Value::list(result))
    }
}

pub(crate) fn distinct(values: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = vec![];
    for value in values {
        if !result.contains(value) {
            result.push(value.clone());
        }
    }
    result
}

pub struct Distinct;
impl FunctionImplementation for Distinct {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::list(distinct(expect_list(fn_spec, args, 0)?)))
    }
}

pub struct Reverse;
impl FunctionImplementation for Reverse {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let mut values = expect_list(fn_spec, args, 0)?.clone();
        values.reverse();
        Ok(Value::list(values))
    }
}

pub struct Sort;
impl FunctionImplementation for Sort {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let values = expect_list(fn_spec, args, 0)?;
        let mut strings = vec![];
        for value in values {
            let Some(text) = value.to_template_string() else {
                return Err(to_diag(fn_spec, format!("cannot sort elements of type {}", value.type_name())));
            };
            strings.push(text);
        }
        strings.sort();
        Ok(Value::list(strings.into_iter().map(Value::string).collect()))
    }
}

pub struct Compact;
impl FunctionImplementation for Compact {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let values = expect_list(fn_spec, args, 0)?
            .iter()
            .filter(|v| !v.is_null() && v.as_str() != Some(""))
            .cloned()
            .collect();
        Ok(Value::list(values))
    }
}

pub struct Contains;
impl FunctionImplementation for Contains {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let values = expect_list(fn_spec, args, 0)?;
        let needle = arg(fn_spec, args, 1)?;
        Ok(Value::bool(values.contains(needle)))
    }
}

pub struct Element;
impl FunctionImplementation for Element {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let values = expect_list(fn_spec, args, 0)?;
        let index = expect_number(fn_spec, args, 1)?;
        if values.is_empty() {
            return Err(to_diag(fn_spec, "cannot use element on an empty list".into()));
        }
        if index < 0.0 {
            return Err(to_diag(fn_spec, "index must not be negative".into()));
        }
        Ok(values[(index as usize) % values.len()].clone())
    }
}

pub struct Index;
impl FunctionImplementation for Index {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let values = expect_list(fn_spec, args, 0)?;
        let needle = arg(fn_spec, args, 1)?;
        match values.iter().position(|v| v == needle) {
            Some(position) => Ok(Value::number(position as f64)),
            None => Err(to_diag(fn_spec, format!("{} is not in the list", needle))),
        }
    }
}

pub(crate) fn sorted_entries(map: &IndexMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

pub struct Keys;
impl FunctionImplementation for Keys {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let map = expect_map(fn_spec, args, 0)?;
        Ok(Value::list(sorted_entries(map).into_iter().map(|(k, _)| Value::string(k.clone())).collect()))
    }
}

pub struct Values;
impl FunctionImplementation for Values {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let map = expect_map(fn_spec, args, 0)?;
        Ok(Value::list(sorted_entries(map).into_iter().map(|(_, v)| v.clone()).collect()))
    }
}

pub struct Lookup;
impl FunctionImplementation for Lookup {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let map = expect_map(fn_spec, args, 0)?;
        let key = expect_string(fn_spec, args, 1)?;
        match (map.get(&key), args.get(2)) {
            (Some(value), _) => Ok(value.clone()),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(to_diag(fn_spec, format!("key '{}' not found", key))),
        }
    }
}

pub struct Merge;
impl FunctionImplementation for Merge {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let mut merged = IndexMap::new();
        for (index, value) in args.iter().enumerate() {
            if value.is_null() {
                continue;
            }
            for (key, entry) in expect_map(fn_spec, args, index)?.iter() {
                merged.insert(key.clone(), entry.clone());
            }
        }
        Ok(Value::map(merged))
    }
}

pub struct Zipmap;
impl FunctionImplementation for Zipmap {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let keys = expect_list(fn_spec, args, 0)?;
        let values = expect_list(fn_spec, args, 1)?;
        if keys.len() != values.len() {
            return Err(to_diag(
                fn_spec,
                format!("{} keys but {} values", keys.len(), values.len()),
            ));
        }
        let mut map = IndexMap::new();
        for (key, value) in keys.iter().zip(values.iter()) {
            let Some(key) = key.to_template_string() else {
                return Err(to_diag(fn_spec, format!("keys must be strings, got {}", key.type_name())));
            };
            map.insert(key, value.clone());
        }
        Ok(Value::map(map))
    }
}

pub struct Range;
impl FunctionImplementation for Range {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let (start, limit, step) = match args.len() {
            1 => (0.0, expect_number(fn_spec, args, 0)?, 1.0),
            2 => (expect_number(fn_spec, args, 0)?, expect_number(fn_spec, args, 1)?, 1.0),
            _ => (
                expect_number(fn_spec, args, 0)?,
                expect_number(fn_spec, args, 1)?,
                expect_number(fn_spec, args, 2)?,
            ),
        };
        if step == 0.0 {
            return Err(to_diag(fn_spec, "step must not be zero".into()));
        }
        let mut values = vec![];
        let mut current = start;
        while (step > 0.0 && current < limit) || (step < 0.0 && current > limit) {
            values.push(Value::number(current));
            current += step;
            if values.len() > 1024 {
                return Err(to_diag(fn_spec, "more than 1024 elements requested".into()));
            }
        }
        Ok(Value::list(values))
    }
}

pub struct Coalesce;
impl FunctionImplementation for Coalesce {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        args.iter()
            .find(|v| !v.is_null() && v.as_str() != Some(""))
            .cloned()
            .ok_or_else(|| to_diag(fn_spec, "no non-null, non-empty argument".into()))
    }
}

pub struct ToList;
impl FunctionImplementation for ToList {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::list(expect_list(fn_spec, args, 0)?.clone()))
    }
}

pub struct ToSet;
impl FunctionImplementation for ToSet {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        let mut values = distinct(expect_list(fn_spec, args, 0)?);
        if values.iter().all(|v| v.as_str().is_some()) {
            values.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
        }
        Ok(Value::list(values))
    }
}

pub struct ToMap;
impl FunctionImplementation for ToMap {
    fn run(fn_spec: &FunctionSpecification, args: &[Value]) -> Result<Value, Diagnostic> {
        Ok(Value::map(expect_map(fn_spec, args, 0)?.clone()))
    }
}

use std::collections::{BTreeMap, BTreeSet};

use kit::indexmap::IndexMap;
use kit::serde_json::{json, Value as JsonValue};
use kit::types::value::scan_placeholders;
use kit::{ResourceId, Value};

use crate::graph::ResourceGraph;

/// Rewrites a value so it no longer depends on how resources are named:
/// references become `${...}` placeholder strings and every placeholder that
/// resolves to a resource of `graph` is renamed through `rename`. Ids
/// `rename` does not know keep their own name.
pub(crate) fn canonicalize<F>(value: &Value, graph: &ResourceGraph, rename: &F) -> Value
where
    F: Fn(&ResourceId) -> Option<ResourceId>,
{
    match value {
        Value::Reference(reference) => {
            let target = rename(&reference.target).unwrap_or_else(|| reference.target.clone());
            Value::String(reference.retarget(target).placeholder())
        }
        Value::String(text) => Value::String(rename_placeholders(text, graph, rename)),
        Value::List(items) => Value::List(items.iter().map(|v| canonicalize(v, graph, rename)).collect()),
        Value::Map(entries) => Value::Map(
            entries.iter().map(|(k, v)| (k.clone(), canonicalize(v, graph, rename))).collect(),
        ),
        other => other.clone(),
    }
}

fn rename_placeholders<F>(text: &str, graph: &ResourceGraph, rename: &F) -> String
where
    F: Fn(&ResourceId) -> Option<ResourceId>,
{
    let placeholders = scan_placeholders(text);
    if placeholders.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, inner) in placeholders {
        out.push_str(&text[cursor..range.start]);
        match graph.resolve_placeholder(&inner) {
            Some(id) => {
                let rest = &inner[id.to_string().len()..];
                let target = rename(id).unwrap_or_else(|| id.clone());
                out.push_str(&format!("${{{}{}}}", target, rest));
            }
            None => out.push_str(&text[range.clone()]),
        }
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

pub(crate) fn canonical_attributes<F>(
    attributes: &IndexMap<String, Value>,
    graph: &ResourceGraph,
    rename: &F,
) -> IndexMap<String, Value>
where
    F: Fn(&ResourceId) -> Option<ResourceId>,
{
    attributes.iter().map(|(k, v)| (k.clone(), canonicalize(v, graph, rename))).collect()
}

/// One differing leaf. `None` means the path is absent on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDiff {
    pub path: String,
    pub left: Option<Value>,
    pub right: Option<Value>,
}

impl AttributeDiff {
    pub fn swapped(&self) -> Self {
        AttributeDiff { path: self.path.clone(), left: self.right.clone(), right: self.left.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyDiff {
    pub only_left: Vec<ResourceId>,
    pub only_right: Vec<ResourceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDiff {
    pub left: ResourceId,
    pub right: ResourceId,
    pub attributes: Vec<AttributeDiff>,
    pub dependencies: Option<DependencyDiff>,
}

impl ResourceDiff {
    pub fn swapped(&self) -> Self {
        ResourceDiff {
            left: self.right.clone(),
            right: self.left.clone(),
            attributes: self.attributes.iter().map(AttributeDiff::swapped).collect(),
            dependencies: self.dependencies.as_ref().map(|d| DependencyDiff {
                only_left: d.only_right.clone(),
                only_right: d.only_left.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputDiff {
    pub name: String,
    pub left: Option<Value>,
    pub right: Option<Value>,
}

/// Structural differences between two graphs under a resource pairing.
///
/// Values and dependency ids are reported with paired resources renamed to
/// a common name (the smaller of the two ids), so the diff of `b` against
/// `a` is exactly [`GraphDiff::swapped`] of the diff of `a` against `b`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphDiff {
    /// Resources only in the left graph.
    pub removed: Vec<ResourceId>,
    /// Resources only in the right graph.
    pub added: Vec<ResourceId>,
    pub changed: Vec<ResourceDiff>,
    pub outputs: Vec<OutputDiff>,
}

impl GraphDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.changed.is_empty() && self.outputs.is_empty()
    }

    /// Number of reported differences.
    pub fn len(&self) -> usize {
        self.removed.len()
            + self.added.len()
            + self.outputs.len()
            + self
                .changed
                .iter()
                .map(|c| c.attributes.len() + usize::from(c.dependencies.is_some()))
                .sum::<usize>()
    }

    pub fn swapped(&self) -> Self {
        GraphDiff {
            removed: self.added.clone(),
            added: self.removed.clone(),
            changed: self.changed.iter().map(ResourceDiff::swapped).collect(),
            outputs: self
                .outputs
                .iter()
                .map(|o| OutputDiff { name: o.name.clone(), left: o.right.clone(), right: o.left.clone() })
                .collect(),
        }
    }

    /// Computes the diff of `right` against `left` for a pairing of their
    /// resources. Unpaired resources are reported as removed or added.
    pub fn between(left: &ResourceGraph, right: &ResourceGraph, pairing: &[(ResourceId, ResourceId)]) -> Self {
        let mut left_names = BTreeMap::new();
        let mut right_names = BTreeMap::new();
        for (l, r) in pairing {
            let common = l.min(r).clone();
            left_names.insert(l.clone(), common.clone());
            right_names.insert(r.clone(), common);
        }
        let rename_left = |id: &ResourceId| left_names.get(id).cloned();
        let rename_right = |id: &ResourceId| right_names.get(id).cloned();

        let mut removed: Vec<ResourceId> = left.ids().filter(|id| !left_names.contains_key(*id)).cloned().collect();
        let mut added: Vec<ResourceId> = right.ids().filter(|id| !right_names.contains_key(*id)).cloned().collect();
        removed.sort();
        added.sort();

        let mut changed = vec![];
        for (l, r) in pairing {
            let (Some(left_resource), Some(right_resource)) = (left.get(l), right.get(r)) else {
                continue;
            };
            let mut attributes = vec![];
            diff_values(
                String::new(),
                Some(&Value::Map(canonical_attributes(&left_resource.attributes, left, &rename_left))),
                Some(&Value::Map(canonical_attributes(&right_resource.attributes, right, &rename_right))),
                &mut attributes,
            );
            attributes.sort_by(|a, b| a.path.cmp(&b.path));

            let left_deps: BTreeSet<ResourceId> = left_resource
                .dependencies
                .iter()
                .map(|d| rename_left(d).unwrap_or_else(|| d.clone()))
                .collect();
            let right_deps: BTreeSet<ResourceId> = right_resource
                .dependencies
                .iter()
                .map(|d| rename_right(d).unwrap_or_else(|| d.clone()))
                .collect();
            let dependencies = (left_deps != right_deps).then(|| DependencyDiff {
                only_left: left_deps.difference(&right_deps).cloned().collect(),
                only_right: right_deps.difference(&left_deps).cloned().collect(),
            });

            if !attributes.is_empty() || dependencies.is_some() {
                changed.push((l.min(r).clone(), ResourceDiff { left: l.clone(), right: r.clone(), attributes, dependencies }));
            }
        }
        changed.sort_by(|a, b| a.0.cmp(&b.0));

        let names: BTreeSet<&String> = left.outputs().keys().chain(right.outputs().keys()).collect();
        let mut outputs = vec![];
        for name in names {
            let l = left.outputs().get(name).map(|v| canonicalize(v, left, &rename_left));
            let r = right.outputs().get(name).map(|v| canonicalize(v, right, &rename_right));
            if l != r {
                outputs.push(OutputDiff { name: name.clone(), left: l, right: r });
            }
        }

        GraphDiff { removed, added, changed: changed.into_iter().map(|(_, c)| c).collect(), outputs }
    }

    pub fn to_json(&self) -> JsonValue {
        let value = |v: &Option<Value>| v.as_ref().map(|v| v.to_json()).unwrap_or(JsonValue::Null);
        json!({
            "removed": self.removed.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            "added": self.added.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            "changed": self.changed.iter().map(|c| json!({
                "left": c.left.to_string(),
                "right": c.right.to_string(),
                "attributes": c.attributes.iter().map(|a| json!({
                    "path": a.path,
                    "left": value(&a.left),
                    "right": value(&a.right),
                })).collect::<Vec<_>>(),
                "dependencies": c.dependencies.as_ref().map(|d| json!({
                    "only_left": d.only_left.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                    "only_right": d.only_right.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                })),
            })).collect::<Vec<_>>(),
            "outputs": self.outputs.iter().map(|o| json!({
                "name": o.name,
                "left": value(&o.left),
                "right": value(&o.right),
            })).collect::<Vec<_>>(),
        })
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Walks two values in parallel and records the smallest differing paths:
/// `tags.Name`, `ingress[0].from_port`. Lists of different lengths differ as
/// a whole.
pub(crate) fn diff_values(path: String, left: Option<&Value>, right: Option<&Value>, out: &mut Vec<AttributeDiff>) {
    match (left, right) {
        (Some(Value::Map(l)), Some(Value::Map(r))) => {
            let keys: BTreeSet<&String> = l.keys().chain(r.keys()).collect();
            for key in keys {
                diff_values(join_key(&path, key), l.get(key), r.get(key), out);
            }
        }
        (Some(Value::List(l)), Some(Value::List(r))) if l.len() == r.len() => {
            for (index, (lv, rv)) in l.iter().zip(r.iter()).enumerate() {
                diff_values(format!("{}[{}]", path, index), Some(lv), Some(rv), out);
            }
        }
        (l, r) if l != r => out.push(AttributeDiff { path, left: l.cloned(), right: r.cloned() }),
        _ => {}
    }
}

//! The resource graph both evaluators produce and the checker consumes.

pub mod dependency_graph;

use std::collections::{BTreeMap, BTreeSet};

use kit::indexmap::IndexMap;
use kit::serde_json::{json, Value as JsonValue};
use kit::{ResourceId, Value};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::GraphError;

pub use dependency_graph::DependencyGraph;

/// A declared resource. Immutable once added to a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: IndexMap<String, Value>,
    /// Edges requested through `depends_on` / `dependsOn`.
    pub explicit_dependencies: BTreeSet<ResourceId>,
    /// Explicit edges plus every resource referenced from the attributes.
    pub dependencies: BTreeSet<ResourceId>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: IndexMap<ResourceId, Resource>,
    outputs: IndexMap<String, Value>,
    finalized: bool,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(
        &mut self,
        resource_type: &str,
        name: &str,
        attributes: IndexMap<String, Value>,
    ) -> Result<&Resource, GraphError> {
        self.add_resource_with_dependencies(resource_type, name, attributes, BTreeSet::new())
    }

    /// Adds a resource. References inside `attributes`, structured or
    /// interpolated, must point at resources already in the graph. Null
    /// attributes are dropped.
    pub fn add_resource_with_dependencies(
        &mut self,
        resource_type: &str,
        name: &str,
        mut attributes: IndexMap<String, Value>,
        explicit_dependencies: BTreeSet<ResourceId>,
    ) -> Result<&Resource, GraphError> {
        let id = ResourceId::new(resource_type, name);
        if self.finalized {
            return Err(GraphError::GraphFinalized(id.to_string()));
        }
        if self.resources.contains_key(&id) {
            return Err(GraphError::DuplicateResource(id));
        }

        attributes.retain(|_, value| !value.is_null());

        let mut dependencies = BTreeSet::new();
        for dependency in explicit_dependencies.iter() {
            if !self.resources.contains_key(dependency) {
                return Err(GraphError::DanglingReference {
                    from: id.to_string(),
                    to: dependency.clone(),
                });
            }
            dependencies.insert(dependency.clone());
        }
        for value in attributes.values() {
            dependencies.extend(self.referenced_resources(&id.to_string(), value)?);
        }

        tracing::debug!(resource = %id, dependencies = dependencies.len(), "adding resource");
        let resource = Resource { id: id.clone(), attributes, explicit_dependencies, dependencies };
        self.resources.insert(id.clone(), resource);
        Ok(&self.resources[&id])
    }

    pub fn set_output(&mut self, name: &str, value: Value) -> Result<(), GraphError> {
        if self.finalized {
            return Err(GraphError::GraphFinalized(format!("output.{}", name)));
        }
        if self.outputs.contains_key(name) {
            return Err(GraphError::DuplicateOutput(name.to_string()));
        }
        self.referenced_resources(&format!("output.{}", name), &value)?;
        self.outputs.insert(name.to_string(), value);
        Ok(())
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    /// Resources in declaration order. Every resource comes after the
    /// resources it depends on.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources.keys()
    }

    pub fn position_of(&self, id: &ResourceId) -> Option<usize> {
        self.resources.get_index_of(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn outputs(&self) -> &IndexMap<String, Value> {
        &self.outputs
    }

    pub fn dependencies_of(&self, id: &ResourceId) -> BTreeSet<ResourceId> {
        self.resources.get(id).map(|r| r.dependencies.clone()).unwrap_or_default()
    }

    /// `(dependent, dependency)` pairs.
    pub fn edges(&self) -> Vec<(ResourceId, ResourceId)> {
        self.resources
            .values()
            .flat_map(|r| r.dependencies.iter().map(move |d| (r.id.clone(), d.clone())))
            .collect()
    }

    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for id in self.resources.keys() {
            *counts.entry(id.resource_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Resolves the inner text of a `${...}` placeholder to the resource it
    /// names. The longest matching id wins so `web[0]` beats `web`.
    pub fn resolve_placeholder(&self, inner: &str) -> Option<&ResourceId> {
        let mut best: Option<(&ResourceId, usize)> = None;
        for id in self.resources.keys() {
            let rendered = id.to_string();
            let matches = inner == rendered
                || (inner.starts_with(&rendered)
                    && matches!(inner.as_bytes().get(rendered.len()), Some(b'.') | Some(b'[')));
            if matches && best.map(|(_, len)| rendered.len() > len).unwrap_or(true) {
                best = Some((id, rendered.len()));
            }
        }
        best.map(|(id, _)| id)
    }

    fn referenced_resources(
        &self,
        from: &str,
        value: &Value,
    ) -> Result<BTreeSet<ResourceId>, GraphError> {
        let mut found = BTreeSet::new();
        for reference in value.collect_references() {
            if !self.resources.contains_key(&reference.target) {
                return Err(GraphError::DanglingReference {
                    from: from.to_string(),
                    to: reference.target.clone(),
                });
            }
            found.insert(reference.target.clone());
        }
        for placeholder in value.collect_placeholders() {
            if let Some(id) = self.resolve_placeholder(&placeholder) {
                found.insert(id.clone());
            }
        }
        Ok(found)
    }

    pub fn to_petgraph(&self) -> DiGraph<ResourceId, ()> {
        let mut graph = DiGraph::new();
        let mut indices: BTreeMap<&ResourceId, NodeIndex> = BTreeMap::new();
        for id in self.resources.keys() {
            indices.insert(id, graph.add_node(id.clone()));
        }
        for resource in self.resources.values() {
            for dependency in resource.dependencies.iter() {
                if let (Some(from), Some(to)) = (indices.get(&resource.id), indices.get(dependency))
                {
                    graph.add_edge(*from, *to, ());
                }
            }
        }
        graph
    }

    pub fn to_dot(&self) -> String {
        let graph = self.to_petgraph();
        let dot = Dot::with_attr_getters(
            &graph,
            &[Config::EdgeNoLabel, Config::NodeNoLabel],
            &|_, _| String::new(),
            &|_, (_, id)| format!("label = \"{}\"", id.to_string().replace('"', "\\\"")),
        );
        format!("{:?}", dot)
    }

    pub fn to_json(&self) -> JsonValue {
        let resources: Vec<JsonValue> = self
            .resources
            .values()
            .map(|r| {
                let attributes: kit::serde_json::Map<String, JsonValue> =
                    r.attributes.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                json!({
                    "type": r.id.resource_type,
                    "name": r.id.name,
                    "attributes": attributes,
                    "dependencies": r.dependencies.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();
        let outputs: kit::serde_json::Map<String, JsonValue> =
            self.outputs.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        json!({ "resources": resources, "outputs": outputs })
    }
}

#[cfg(test)]
mod tests {
    use kit::indexmap::indexmap;
    use kit::ResourceRef;

    use super::*;

    fn vpc_graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph
            .add_resource(
                "aws_vpc",
                "main",
                indexmap! { "cidr_block".to_string() => Value::string("10.0.0.0/16") },
            )
            .unwrap();
        graph
    }

    fn vpc_ref() -> ResourceRef {
        ResourceRef::new(ResourceId::new("aws_vpc", "main")).attr("id")
    }

    #[test]
    fn test_duplicate_resource_is_rejected() {
        let mut graph = vpc_graph();
        let err = graph.add_resource("aws_vpc", "main", IndexMap::new()).unwrap_err();
        assert_eq!(err, GraphError::DuplicateResource(ResourceId::new("aws_vpc", "main")));
    }

    #[test]
    fn test_finalized_graph_rejects_additions() {
        let mut graph = vpc_graph();
        graph.finalize();
        assert!(matches!(
            graph.add_resource("aws_subnet", "a", IndexMap::new()),
            Err(GraphError::GraphFinalized(_))
        ));
        assert!(matches!(graph.set_output("x", Value::Null), Err(GraphError::GraphFinalized(_))));
    }

    #[test]
    fn test_null_attributes_are_dropped() {
        let mut graph = ResourceGraph::new();
        let resource = graph
            .add_resource(
                "aws_instance",
                "web",
                indexmap! {
                    "ami".to_string() => Value::string("ami-1"),
                    "key_name".to_string() => Value::Null,
                },
            )
            .unwrap();
        assert_eq!(resource.attributes.len(), 1);
        assert!(!resource.attributes.contains_key("key_name"));
    }

    #[test]
    fn test_structured_and_interpolated_dependencies() {
        let mut graph = vpc_graph();
        graph
            .add_resource(
                "aws_subnet",
                "a",
                indexmap! { "vpc_id".to_string() => Value::reference(vpc_ref()) },
            )
            .unwrap();
        graph
            .add_resource(
                "aws_instance",
                "web",
                indexmap! {
                    "user_data".to_string() => Value::string("subnet=${aws_subnet.a.id}"),
                },
            )
            .unwrap();

        let subnet = ResourceId::new("aws_subnet", "a");
        assert_eq!(
            graph.dependencies_of(&subnet),
            BTreeSet::from([ResourceId::new("aws_vpc", "main")])
        );
        assert_eq!(
            graph.dependencies_of(&ResourceId::new("aws_instance", "web")),
            BTreeSet::from([subnet])
        );
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let mut graph = ResourceGraph::new();
        let err = graph
            .add_resource(
                "aws_subnet",
                "a",
                indexmap! { "vpc_id".to_string() => Value::reference(vpc_ref()) },
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingReference { .. }));
    }

    #[test]
    fn test_placeholder_prefers_longest_match() {
        let mut graph = ResourceGraph::new();
        graph.add_resource("aws_instance", "web", IndexMap::new()).unwrap();
        graph.add_resource("aws_instance", "web[0]", IndexMap::new()).unwrap();
        assert_eq!(
            graph.resolve_placeholder("aws_instance.web[0].id"),
            Some(&ResourceId::new("aws_instance", "web[0]"))
        );
        assert_eq!(
            graph.resolve_placeholder("aws_instance.web.id"),
            Some(&ResourceId::new("aws_instance", "web"))
        );
        assert_eq!(graph.resolve_placeholder("aws_instance.webserver.id"), None);
    }

    #[test]
    fn test_dot_export_lists_edges() {
        let mut graph = vpc_graph();
        graph
            .add_resource(
                "aws_subnet",
                "a",
                indexmap! { "vpc_id".to_string() => Value::reference(vpc_ref()) },
            )
            .unwrap();
        let dot = graph.to_dot();
        assert!(dot.contains("aws_subnet.a"));
        assert!(dot.contains("1 -> 0"));
    }
}

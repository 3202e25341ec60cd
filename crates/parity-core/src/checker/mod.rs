//! Graph equivalence checking.
//!
//! Two graphs are equivalent when some bijection between their resources
//! pairs equal types and equal attributes (references compared through the
//! bijection), preserves the dependency relation and makes the outputs
//! equal. Resources sharing an id are paired first; when that fails a
//! bounded backtracking search looks for another pairing.

mod diff;
mod search;

use std::collections::BTreeSet;
use std::time::Duration;

use kit::ResourceId;
use strum::{AsRefStr, Display};

use crate::errors::CheckError;
use crate::graph::ResourceGraph;

pub use diff::{AttributeDiff, DependencyDiff, GraphDiff, OutputDiff, ResourceDiff};
pub use search::Pairing;

pub const DEFAULT_MAX_RESOURCES: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    /// Largest graph the pairing search accepts.
    pub max_resources: usize,
    /// Candidate pairs the search may try before giving up.
    pub step_budget: Option<u64>,
    pub deadline: Option<Duration>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig { max_resources: DEFAULT_MAX_RESOURCES, step_budget: None, deadline: None }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_resources(mut self, max_resources: usize) -> Self {
        self.max_resources = max_resources;
        self
    }

    pub fn with_step_budget(mut self, step_budget: u64) -> Self {
        self.step_budget = Some(step_budget);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// How the verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Strategy {
    SameName,
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceResult {
    pub equivalent: bool,
    pub strategy: Strategy,
    /// `(left, right)` pairs. For a mismatch, the pairing the diff was
    /// computed against.
    pub pairing: Vec<(ResourceId, ResourceId)>,
    pub diff: GraphDiff,
    /// Candidate pairs tried by the search.
    pub steps: u64,
}

pub fn compare(left: &ResourceGraph, right: &ResourceGraph) -> Result<EquivalenceResult, CheckError> {
    compare_with(left, right, &CheckerConfig::default())
}

pub fn compare_with(
    left: &ResourceGraph,
    right: &ResourceGraph,
    config: &CheckerConfig,
) -> Result<EquivalenceResult, CheckError> {
    if let Some(pairing) = same_name_pairing(left, right) {
        if search::pairing_holds(left, right, &pairing) {
            tracing::info!(resources = left.len(), "graphs are equivalent under same-name pairing");
            return Ok(equivalent(pairing, Strategy::SameName, 0));
        }
    }

    let left_outputs: BTreeSet<&String> = left.outputs().keys().collect();
    let right_outputs: BTreeSet<&String> = right.outputs().keys().collect();
    if left.type_counts() != right.type_counts() || left_outputs != right_outputs {
        let result = mismatch(left, right, Strategy::SameName, 0);
        tracing::info!(differences = result.diff.len(), "graphs differ in shape");
        return Ok(result);
    }

    let count = left.len().max(right.len());
    if count > config.max_resources {
        return Err(CheckError::TooManyResources { count, limit: config.max_resources });
    }

    let outcome = search::Search::new(left, right, config).run()?;
    let result = match outcome.pairing {
        Some(pairing) => equivalent(pairing, Strategy::Search, outcome.steps),
        None => mismatch(left, right, Strategy::Search, outcome.steps),
    };
    tracing::info!(
        equivalent = result.equivalent,
        steps = result.steps,
        differences = result.diff.len(),
        "pairing search complete"
    );
    Ok(result)
}

/// Pairs every resource with the identically named one on the other side.
/// `None` unless both graphs hold exactly the same ids.
fn same_name_pairing(left: &ResourceGraph, right: &ResourceGraph) -> Option<Pairing> {
    if left.len() != right.len() || !left.ids().all(|id| right.contains(id)) {
        return None;
    }
    Some(left.ids().map(|id| (id.clone(), id.clone())).collect())
}

/// Pairing used to explain a mismatch: identical ids first, then the
/// remaining resources of each type in declaration order.
fn fallback_pairing(left: &ResourceGraph, right: &ResourceGraph) -> Vec<(ResourceId, ResourceId)> {
    let mut pairs: Vec<(ResourceId, ResourceId)> =
        left.ids().filter(|id| right.contains(id)).map(|id| (id.clone(), id.clone())).collect();
    let types: BTreeSet<&String> = left.ids().map(|id| &id.resource_type).collect();
    for resource_type in types {
        let unpaired = |graph: &ResourceGraph, other: &ResourceGraph| -> Vec<ResourceId> {
            graph
                .ids()
                .filter(|id| &id.resource_type == resource_type && !other.contains(id))
                .cloned()
                .collect()
        };
        let left_rest = unpaired(left, right);
        let right_rest = unpaired(right, left);
        pairs.extend(left_rest.into_iter().zip(right_rest));
    }
    pairs
}

fn equivalent(pairing: Pairing, strategy: Strategy, steps: u64) -> EquivalenceResult {
    EquivalenceResult {
        equivalent: true,
        strategy,
        pairing: pairing.into_iter().collect(),
        diff: GraphDiff::default(),
        steps,
    }
}

fn mismatch(left: &ResourceGraph, right: &ResourceGraph, strategy: Strategy, steps: u64) -> EquivalenceResult {
    let pairing = fallback_pairing(left, right);
    let diff = GraphDiff::between(left, right, &pairing);
    EquivalenceResult { equivalent: false, strategy, pairing, diff, steps }
}

#[cfg(test)]
mod tests {
    use kit::indexmap::{indexmap, IndexMap};
    use kit::{ResourceRef, Value};

    use super::*;
    use crate::errors::ErrorKind;

    fn attrs(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn reference(resource_type: &str, name: &str, attr: &str) -> Value {
        Value::reference(ResourceRef::new(ResourceId::new(resource_type, name)).attr(attr))
    }

    /// A vpc and `subnets` subnets pointing at it.
    fn network(vpc: &str, subnets: &[(&str, &str)]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph.add_resource("aws_vpc", vpc, attrs(&[("cidr_block", Value::string("10.0.0.0/16"))])).unwrap();
        for (name, cidr) in subnets {
            graph
                .add_resource(
                    "aws_subnet",
                    name,
                    attrs(&[
                        ("vpc_id", reference("aws_vpc", vpc, "id")),
                        ("cidr_block", Value::string(*cidr)),
                        ("tags", Value::map(indexmap! { "Name".to_string() => Value::string(format!("${{aws_vpc.{}.id}}-{}", vpc, name)) })),
                    ]),
                )
                .unwrap();
        }
        graph.set_output("vpc_id", reference("aws_vpc", vpc, "id")).unwrap();
        graph.finalize();
        graph
    }

    #[test]
    fn test_graph_is_equivalent_to_itself() {
        let graph = network("main", &[("a", "10.0.1.0/24"), ("b", "10.0.2.0/24")]);
        let result = compare(&graph, &graph).unwrap();
        assert!(result.equivalent);
        assert_eq!(result.strategy, Strategy::SameName);
        assert!(result.diff.is_empty());
    }

    #[test]
    fn test_renamed_resources_are_found_by_search() {
        let left = network("main", &[("a", "10.0.1.0/24"), ("b", "10.0.2.0/24")]);
        let mut right = ResourceGraph::new();
        right.add_resource("aws_vpc", "primary", attrs(&[("cidr_block", Value::string("10.0.0.0/16"))])).unwrap();
        for (name, cidr, tag) in [("second", "10.0.2.0/24", "b"), ("first", "10.0.1.0/24", "a")] {
            right
                .add_resource(
                    "aws_subnet",
                    name,
                    attrs(&[
                        ("cidr_block", Value::string(cidr)),
                        ("vpc_id", reference("aws_vpc", "primary", "id")),
                        ("tags", Value::map(indexmap! { "Name".to_string() => Value::string(format!("${{aws_vpc.primary.id}}-{}", tag)) })),
                    ]),
                )
                .unwrap();
        }
        right.set_output("vpc_id", Value::string("${aws_vpc.primary.id}")).unwrap();

        let result = compare(&left, &right).unwrap();
        assert!(result.equivalent, "{:?}", result.diff);
        assert_eq!(result.strategy, Strategy::Search);
        assert!(result.pairing.contains(&(ResourceId::new("aws_subnet", "a"), ResourceId::new("aws_subnet", "first"))));
        assert!(compare(&right, &left).unwrap().equivalent);
    }

    #[test]
    fn test_mismatch_reports_nested_attribute_paths() {
        let left = network("main", &[("a", "10.0.1.0/24")]);
        let right = network("main", &[("a", "10.0.9.0/24")]);
        let result = compare(&left, &right).unwrap();
        assert!(!result.equivalent);
        assert_eq!(result.diff.changed.len(), 1);
        let change = &result.diff.changed[0];
        assert_eq!(change.left, ResourceId::new("aws_subnet", "a"));
        assert_eq!(
            change.attributes,
            vec![AttributeDiff {
                path: "cidr_block".into(),
                left: Some(Value::string("10.0.1.0/24")),
                right: Some(Value::string("10.0.9.0/24")),
            }]
        );
    }

    #[test]
    fn test_comparison_is_symmetric() {
        let left = network("main", &[("a", "10.0.1.0/24"), ("b", "10.0.2.0/24")]);
        let right = network("main", &[("a", "10.0.1.0/24"), ("c", "10.0.3.0/24"), ("d", "10.0.4.0/24")]);
        let forward = compare(&left, &right).unwrap();
        let backward = compare(&right, &left).unwrap();
        assert!(!forward.equivalent);
        assert!(!backward.equivalent);
        assert_eq!(forward.diff.added, vec![ResourceId::new("aws_subnet", "d")]);
        assert_eq!(backward.diff, forward.diff.swapped());
    }

    #[test]
    fn test_dependency_differences_are_reported() {
        let mut left = ResourceGraph::new();
        left.add_resource("aws_s3_bucket", "logs", attrs(&[])).unwrap();
        left.add_resource_with_dependencies(
            "aws_instance",
            "web",
            attrs(&[("ami", Value::string("ami-1"))]),
            [ResourceId::new("aws_s3_bucket", "logs")].into(),
        )
        .unwrap();
        let mut right = ResourceGraph::new();
        right.add_resource("aws_s3_bucket", "logs", attrs(&[])).unwrap();
        right.add_resource("aws_instance", "web", attrs(&[("ami", Value::string("ami-1"))])).unwrap();

        let result = compare(&left, &right).unwrap();
        assert!(!result.equivalent);
        let dependencies = result.diff.changed[0].dependencies.as_ref().unwrap();
        assert_eq!(dependencies.only_left, vec![ResourceId::new("aws_s3_bucket", "logs")]);
        assert!(dependencies.only_right.is_empty());
    }

    #[test]
    fn test_output_differences_are_reported() {
        let left = network("main", &[]);
        let mut right = ResourceGraph::new();
        right.add_resource("aws_vpc", "main", attrs(&[("cidr_block", Value::string("10.0.0.0/16"))])).unwrap();
        right.set_output("vpc_id", reference("aws_vpc", "main", "arn")).unwrap();
        let result = compare(&left, &right).unwrap();
        assert!(!result.equivalent);
        assert_eq!(result.diff.outputs.len(), 1);
        assert_eq!(result.diff.outputs[0].right, Some(Value::string("${aws_vpc.main.arn}")));
    }

    fn buckets(names: &[&str], tag: &str) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for name in names {
            graph.add_resource("aws_s3_bucket", name, attrs(&[("acl", Value::string(tag))])).unwrap();
        }
        graph
    }

    #[test]
    fn test_resource_ceiling() {
        let left = buckets(&["a", "b", "c"], "private");
        let right = buckets(&["x", "y", "z"], "private");
        let err = compare_with(&left, &right, &CheckerConfig::new().with_max_resources(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyResourcesError);
        // same-name pairing never searches, so the ceiling does not apply
        assert!(compare_with(&left, &left, &CheckerConfig::new().with_max_resources(2)).unwrap().equivalent);
    }

    #[test]
    fn test_step_budget_exhaustion() {
        let left = buckets(&["a", "b", "c", "d"], "private");
        let right = buckets(&["w", "x", "y", "z"], "public-read");
        let err = compare_with(&left, &right, &CheckerConfig::new().with_step_budget(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceededError);
    }

    #[test]
    fn test_type_count_mismatch_skips_search() {
        let left = buckets(&["a"], "private");
        let right = network("main", &[]);
        let result = compare_with(&left, &right, &CheckerConfig::new().with_step_budget(0)).unwrap();
        assert!(!result.equivalent);
        assert_eq!(result.steps, 0);
        assert_eq!(result.diff.removed, vec![ResourceId::new("aws_s3_bucket", "a")]);
        assert_eq!(result.diff.added, vec![ResourceId::new("aws_vpc", "main")]);
    }
}

use std::collections::HashSet;
use std::ops::Range;

use kit::indexmap::IndexMap;

/// Declaration-level dependency tracking for HCL documents.
///
/// Nodes are declaration names (`local.region`, `aws_instance.web`). The
/// graph detects cycles with a depth-first search and produces an evaluation
/// order where dependencies come first and ties keep source order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node name -> nodes it depends on, in insertion order
    pub(crate) deps: IndexMap<String, Vec<String>>,
    /// Node name -> span of its declaration
    pub(crate) spans: IndexMap<String, Range<usize>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>, span: Option<Range<usize>>) {
        let name = name.into();
        self.deps.entry(name.clone()).or_default();
        if let Some(span) = span {
            self.spans.insert(name, span);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains_key(name)
    }

    /// Records that `from` depends on `to`. Edges to unknown nodes are
    /// ignored, as are duplicates.
    pub fn add_edge(&mut self, from: &str, to: impl Into<String>) {
        let to = to.into();
        if !self.deps.contains_key(&to) {
            tracing::trace!(from, to = to.as_str(), "skipping edge to undeclared node");
            return;
        }
        if let Some(deps) = self.deps.get_mut(from) {
            if !deps.contains(&to) {
                deps.push(to);
            }
        }
    }

    /// Find all cycles in the graph using depth-first search
    ///
    /// Each cycle is the chain of node names closed by its first node, e.g.
    /// `["local.a", "local.b", "local.a"]`.
    pub fn find_all_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node in self.deps.keys() {
            if !visited.contains(node.as_str()) {
                self.dfs_cycles(node, &mut visited, &mut rec_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn extract_cycle(&self, path: &[String], cycle_start: &str) -> Option<Vec<String>> {
        path.iter().position(|n| n == cycle_start).map(|start| {
            let mut cycle = path[start..].to_vec();
            cycle.push(cycle_start.to_string());
            cycle
        })
    }

    fn dfs_cycles(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node.to_owned());
        rec_stack.insert(node.to_owned());
        path.push(node.to_owned());

        if let Some(neighbors) = self.deps.get(node) {
            for neighbor in neighbors {
                if rec_stack.contains(neighbor.as_str()) {
                    if let Some(cycle) = self.extract_cycle(path, neighbor) {
                        cycles.push(cycle);
                    }
                } else if !visited.contains(neighbor.as_str()) {
                    self.dfs_cycles(neighbor, visited, rec_stack, path, cycles);
                }
            }
        }

        rec_stack.remove(node);
        path.pop();
    }

    /// Dependency-first order of every node. Fails with the first cycle found.
    pub fn evaluation_order(&self) -> Result<Vec<String>, Vec<String>> {
        if let Some(cycle) = self.find_all_cycles().into_iter().next() {
            return Err(cycle);
        }
        let mut order = Vec::with_capacity(self.deps.len());
        let mut placed = HashSet::new();
        for node in self.deps.keys() {
            self.place(node, &mut placed, &mut order);
        }
        Ok(order)
    }

    fn place(&self, node: &str, placed: &mut HashSet<String>, order: &mut Vec<String>) {
        if placed.contains(node) {
            return;
        }
        placed.insert(node.to_owned());
        if let Some(neighbors) = self.deps.get(node) {
            for neighbor in neighbors {
                self.place(neighbor, placed, order);
            }
        }
        order.push(node.to_owned());
    }

    pub fn get_span(&self, node: &str) -> Option<&Range<usize>> {
        self.spans.get(node)
    }
}

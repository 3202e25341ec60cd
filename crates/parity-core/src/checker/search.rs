use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use kit::ResourceId;

use crate::errors::CheckError;
use crate::graph::{Resource, ResourceGraph};

use super::diff::{canonical_attributes, canonicalize};
use super::CheckerConfig;

/// Maps left resource ids to right resource ids.
pub type Pairing = BTreeMap<ResourceId, ResourceId>;

/// True when `left` and `right` agree once `left`'s dependencies are renamed
/// through `pairing`. Every dependency of `left` must already be paired.
pub(crate) fn resources_match(
    left_graph: &ResourceGraph,
    right_graph: &ResourceGraph,
    left: &Resource,
    right: &Resource,
    pairing: &Pairing,
) -> bool {
    if left.id.resource_type != right.id.resource_type || left.attributes.len() != right.attributes.len() {
        return false;
    }
    let renamed: Option<BTreeSet<ResourceId>> =
        left.dependencies.iter().map(|d| pairing.get(d).cloned()).collect();
    if renamed.as_ref() != Some(&right.dependencies) {
        return false;
    }
    let rename = |id: &ResourceId| pairing.get(id).cloned();
    let keep = |_: &ResourceId| None;
    canonical_attributes(&left.attributes, left_graph, &rename)
        == canonical_attributes(&right.attributes, right_graph, &keep)
}

pub(crate) fn outputs_match(left: &ResourceGraph, right: &ResourceGraph, pairing: &Pairing) -> bool {
    if left.outputs().len() != right.outputs().len() {
        return false;
    }
    let rename = |id: &ResourceId| pairing.get(id).cloned();
    let keep = |_: &ResourceId| None;
    left.outputs().iter().all(|(name, value)| {
        right.outputs().get(name).is_some_and(|other| {
            canonicalize(value, left, &rename) == canonicalize(other, right, &keep)
        })
    })
}

pub(crate) fn pairing_holds(left: &ResourceGraph, right: &ResourceGraph, pairing: &Pairing) -> bool {
    pairing.len() == left.len()
        && pairing.len() == right.len()
        && pairing.iter().all(|(l, r)| match (left.get(l), right.get(r)) {
            (Some(lr), Some(rr)) => resources_match(left, right, lr, rr, pairing),
            _ => false,
        })
        && outputs_match(left, right, pairing)
}

pub(crate) struct SearchOutcome {
    pub pairing: Option<Pairing>,
    pub steps: u64,
}

/// Backtracking search for a pairing. Left resources are visited in graph
/// order, which puts every resource after its dependencies, so each
/// candidate can be checked completely when it is tried.
pub(crate) struct Search<'g> {
    left: &'g ResourceGraph,
    right: &'g ResourceGraph,
    config: &'g CheckerConfig,
    order: Vec<&'g Resource>,
    used: BTreeSet<ResourceId>,
    pairing: Pairing,
    steps: u64,
    started: Instant,
}

impl<'g> Search<'g> {
    pub fn new(left: &'g ResourceGraph, right: &'g ResourceGraph, config: &'g CheckerConfig) -> Self {
        Search {
            left,
            right,
            config,
            order: left.resources().collect(),
            used: BTreeSet::new(),
            pairing: Pairing::new(),
            steps: 0,
            started: Instant::now(),
        }
    }

    pub fn run(mut self) -> Result<SearchOutcome, CheckError> {
        let found = self.assign(0)?;
        tracing::debug!(steps = self.steps, found, "pairing search finished");
        Ok(SearchOutcome { pairing: found.then_some(self.pairing), steps: self.steps })
    }

    fn tick(&mut self, left: &ResourceId, right: &ResourceId) -> Result<(), CheckError> {
        self.steps += 1;
        tracing::trace!(step = self.steps, left = %left, right = %right, "trying pair");
        if let Some(budget) = self.config.step_budget {
            if self.steps > budget {
                return Err(CheckError::DeadlineExceeded(format!("step budget of {} steps", budget)));
            }
        }
        if let Some(deadline) = self.config.deadline {
            if self.started.elapsed() > deadline {
                return Err(CheckError::DeadlineExceeded(format!("deadline of {}ms", deadline.as_millis())));
            }
        }
        Ok(())
    }

    /// Unused right resources of the same type, the same-name one first.
    fn candidates(&self, left: &Resource) -> Vec<&'g Resource> {
        let right = self.right;
        let mut candidates: Vec<&'g Resource> = right
            .resources()
            .filter(|r| r.id.resource_type == left.id.resource_type && !self.used.contains(&r.id))
            .collect();
        candidates.sort_by_key(|r| r.id != left.id);
        candidates
    }

    fn assign(&mut self, index: usize) -> Result<bool, CheckError> {
        let Some(left) = self.order.get(index).copied() else {
            return Ok(outputs_match(self.left, self.right, &self.pairing));
        };
        for right in self.candidates(left) {
            self.tick(&left.id, &right.id)?;
            if !resources_match(self.left, self.right, left, right, &self.pairing) {
                continue;
            }
            self.pairing.insert(left.id.clone(), right.id.clone());
            self.used.insert(right.id.clone());
            if self.assign(index + 1)? {
                return Ok(true);
            }
            self.pairing.remove(&left.id);
            self.used.remove(&right.id);
        }
        Ok(false)
    }
}

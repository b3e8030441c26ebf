//! Rule-set selection resolution
//!
//! Expands a user's selected rule sets to everything they transitively
//! require, and works out which rule sets are locked because a member of the
//! effective set depends on them. Lock state is a dependents count rebuilt on
//! every call; nothing is carried between calls.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use shared_types::{DependencyKind, EngineError, RuleConflict};
use uuid::Uuid;

use super::jurisdiction_graph::JurisdictionGraph;

/// A rule set in the effective set, with diagnostic metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedRuleSet {
    pub rule_set_id: Uuid,
    pub code: String,
    pub jurisdiction_code: String,
    /// Dependency hops from the nearest selected rule set.
    pub depth: usize,
    /// Directly selected by the user.
    pub is_root: bool,
    /// Effective rule sets with an edge to this one.
    pub required_by: Vec<Uuid>,
    /// Kinds of the edges it was reached through.
    pub via: Vec<DependencyKind>,
    /// Highest priority among incoming edges; 0 when none.
    pub dependency_priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SelectionResolution {
    pub selected: Vec<Uuid>,
    /// Selected rule sets first, then requirements in discovery order.
    pub effective: Vec<ResolvedRuleSet>,
    pub locked: BTreeSet<Uuid>,
    pub dependents_count: BTreeMap<Uuid, usize>,
    /// Declared conflicts between two effective rule sets.
    pub conflicts: Vec<RuleConflict>,
    pub warnings: Vec<String>,
}

impl SelectionResolution {
    pub fn contains(&self, id: Uuid) -> bool {
        self.effective.iter().any(|r| r.rule_set_id == id)
    }

    pub fn is_locked(&self, id: Uuid) -> bool {
        self.locked.contains(&id)
    }

    pub fn entry(&self, id: Uuid) -> Option<&ResolvedRuleSet> {
        self.effective.iter().find(|r| r.rule_set_id == id)
    }

    pub fn effective_ids(&self) -> Vec<Uuid> {
        self.effective.iter().map(|r| r.rule_set_id).collect()
    }
}

/// What to do when deselecting a rule set that others depend on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeselectPolicy {
    /// Refuse with a `SelectionLocked` error.
    Reject,
    /// Also deselect every selected rule set that depends on it.
    Cascade,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeselectOutcome {
    pub selection: Vec<Uuid>,
    /// Selected rule sets removed, the target included.
    pub removed: Vec<Uuid>,
    pub resolution: SelectionResolution,
}

pub struct SelectionResolver<'a> {
    graph: &'a JurisdictionGraph,
    declared: &'a [RuleConflict],
}

impl<'a> SelectionResolver<'a> {
    pub fn new(graph: &'a JurisdictionGraph, declared: &'a [RuleConflict]) -> Self {
        Self { graph, declared }
    }

    /// Compute the effective set, lock state and declared conflicts.
    #[tracing::instrument(skip(self, selected), fields(selected = selected.len()))]
    pub fn resolve(&self, selected: &[Uuid]) -> Result<SelectionResolution, EngineError> {
        let mut warnings = Vec::new();
        let mut roots = Vec::new();
        let mut seen = HashSet::new();
        for id in selected {
            let rule_set = self
                .graph
                .rule_set(*id)
                .ok_or_else(|| EngineError::unknown_rule_set(id))?;
            if !seen.insert(*id) {
                continue;
            }
            if !rule_set.active {
                warnings.push(format!(
                    "Rule set '{}' is inactive and was left out of the selection",
                    rule_set.code
                ));
                continue;
            }
            roots.push(*id);
        }

        // Cycle check before expansion so bad data cannot loop.
        let mut done = HashSet::new();
        for root in &roots {
            let mut path = Vec::new();
            let mut on_path = HashSet::new();
            self.check_path(*root, &mut path, &mut on_path, &mut done)?;
        }

        // Breadth-first closure gives the minimum hop depth.
        let mut effective: Vec<ResolvedRuleSet> = Vec::new();
        let mut index: BTreeMap<Uuid, usize> = BTreeMap::new();
        let mut queue = VecDeque::new();
        for root in &roots {
            index.insert(*root, effective.len());
            effective.push(self.entry(*root, 0, true));
            queue.push_back(*root);
        }

        let mut warned_inactive = HashSet::new();
        while let Some(id) = queue.pop_front() {
            let depth = effective[index[&id]].depth;
            for dep in self.graph.dependencies_of(id) {
                let target = dep.required_rule_set_id;
                let Some(required) = self.graph.rule_set(target) else {
                    continue;
                };
                if !required.active {
                    if warned_inactive.insert(target) {
                        warnings.push(format!(
                            "Rule set '{}' requires inactive rule set '{}'; it was not applied",
                            self.graph.label(id),
                            required.code
                        ));
                    }
                    continue;
                }
                let slot = match index.get(&target) {
                    Some(slot) => *slot,
                    None => {
                        let slot = effective.len();
                        index.insert(target, slot);
                        effective.push(self.entry(target, depth + 1, false));
                        queue.push_back(target);
                        slot
                    }
                };
                let resolved = &mut effective[slot];
                if !resolved.required_by.contains(&id) {
                    resolved.required_by.push(id);
                }
                if !resolved.via.contains(&dep.kind) {
                    resolved.via.push(dep.kind);
                }
                resolved.dependency_priority = resolved.dependency_priority.max(dep.priority);
            }
        }

        let mut dependents_count = BTreeMap::new();
        let mut locked = BTreeSet::new();
        for resolved in &effective {
            let count = resolved.required_by.len();
            dependents_count.insert(resolved.rule_set_id, count);
            if count > 0 {
                locked.insert(resolved.rule_set_id);
            }
        }

        let conflicts = self
            .declared
            .iter()
            .filter(|c| index.contains_key(&c.rule_set_a) && index.contains_key(&c.rule_set_b))
            .cloned()
            .collect();

        tracing::debug!(
            effective = effective.len(),
            locked = locked.len(),
            "selection resolved"
        );

        Ok(SelectionResolution {
            selected: roots,
            effective,
            locked,
            dependents_count,
            conflicts,
            warnings,
        })
    }

    /// Remove `target` from the selection according to `policy`.
    pub fn deselect(
        &self,
        selected: &[Uuid],
        target: Uuid,
        policy: DeselectPolicy,
    ) -> Result<DeselectOutcome, EngineError> {
        let current = self.resolve(selected)?;
        if !current.contains(target) {
            return Ok(DeselectOutcome {
                selection: current.selected.clone(),
                removed: Vec::new(),
                resolution: current,
            });
        }

        let removed: BTreeSet<Uuid> = match policy {
            DeselectPolicy::Reject => {
                if let Some(entry) = current.entry(target).filter(|e| !e.required_by.is_empty()) {
                    let dependents: Vec<String> =
                        entry.required_by.iter().map(|id| self.graph.label(*id)).collect();
                    return Err(EngineError::selection_locked(
                        format!(
                            "Rule set '{}' is required by {} and cannot be deselected",
                            self.graph.label(target),
                            dependents.join(", ")
                        ),
                        dependents,
                    ));
                }
                BTreeSet::from([target])
            }
            DeselectPolicy::Cascade => self.dependents_closure(&current, target),
        };

        let selection: Vec<Uuid> = current
            .selected
            .iter()
            .copied()
            .filter(|id| !removed.contains(id))
            .collect();
        let removed_from_selection: Vec<Uuid> = current
            .selected
            .iter()
            .copied()
            .filter(|id| removed.contains(id))
            .collect();

        let resolution = self.resolve(&selection)?;
        Ok(DeselectOutcome {
            selection,
            removed: removed_from_selection,
            resolution,
        })
    }

    /// The target plus every effective rule set that reaches it.
    fn dependents_closure(&self, resolution: &SelectionResolution, target: Uuid) -> BTreeSet<Uuid> {
        let mut out = BTreeSet::from([target]);
        let mut queue = VecDeque::from([target]);
        while let Some(id) = queue.pop_front() {
            if let Some(entry) = resolution.entry(id) {
                for dependent in &entry.required_by {
                    if out.insert(*dependent) {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
        out
    }

    fn entry(&self, id: Uuid, depth: usize, is_root: bool) -> ResolvedRuleSet {
        let (code, jurisdiction_code) = self
            .graph
            .rule_set(id)
            .map(|rs| (rs.code.clone(), rs.jurisdiction_code.clone()))
            .unwrap_or_default();
        ResolvedRuleSet {
            rule_set_id: id,
            code,
            jurisdiction_code,
            depth,
            is_root,
            required_by: Vec::new(),
            via: Vec::new(),
            dependency_priority: 0,
        }
    }

    fn check_path(
        &self,
        id: Uuid,
        path: &mut Vec<Uuid>,
        on_path: &mut HashSet<Uuid>,
        done: &mut HashSet<Uuid>,
    ) -> Result<(), EngineError> {
        if on_path.contains(&id) {
            return Err(self.graph.cycle_error(path, id));
        }
        if done.contains(&id) {
            return Ok(());
        }
        path.push(id);
        on_path.insert(id);
        for dep in self.graph.dependencies_of(id) {
            let target = dep.required_rule_set_id;
            if self.graph.rule_set(target).map_or(false, |rs| rs.active) {
                self.check_path(target, path, on_path, done)?;
            }
        }
        on_path.remove(&id);
        path.pop();
        done.insert(id);
        Ok(())
    }
}

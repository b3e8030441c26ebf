//! Jurisdiction tree and rule-set dependency graph
//!
//! Both graphs are identifier-keyed arenas with adjacency maps: jurisdictions
//! by code, rule sets by id. Structural validation happens once at
//! construction so lookups afterwards never fail on dangling references.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use shared_types::{EngineError, Jurisdiction, ReferenceData, RuleSet, RuleSetDependency};
use uuid::Uuid;

#[derive(Debug)]
pub struct JurisdictionGraph {
    jurisdictions: HashMap<String, Jurisdiction>,
    children: HashMap<String, Vec<String>>,
    depths: HashMap<String, usize>,
    rule_sets: HashMap<Uuid, RuleSet>,
    rule_sets_by_jurisdiction: HashMap<String, Vec<Uuid>>,
    /// Outgoing edges: rule set -> rule sets it requires.
    requires: HashMap<Uuid, Vec<RuleSetDependency>>,
    /// Incoming edges: rule set -> rule sets that require it.
    required_by: HashMap<Uuid, Vec<RuleSetDependency>>,
}

impl JurisdictionGraph {
    /// Build and validate both graphs.
    ///
    /// Rule-set dependency cycles are not checked here; see
    /// [`JurisdictionGraph::detect_cycles`].
    pub fn new(reference: &ReferenceData) -> Result<Self, EngineError> {
        let mut jurisdictions = HashMap::new();
        for j in &reference.jurisdictions {
            if jurisdictions.insert(j.code.clone(), j.clone()).is_some() {
                return Err(EngineError::invalid_jurisdiction(
                    format!("Jurisdiction code '{}' is defined more than once", j.code),
                    vec![j.code.clone()],
                ));
            }
        }

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for j in &reference.jurisdictions {
            if let Some(parent) = &j.parent_code {
                if !jurisdictions.contains_key(parent) {
                    return Err(EngineError::invalid_jurisdiction(
                        format!("Jurisdiction '{}' names unknown parent '{}'", j.code, parent),
                        vec![j.code.clone(), parent.clone()],
                    ));
                }
                children.entry(parent.clone()).or_default().push(j.code.clone());
            }
        }
        for list in children.values_mut() {
            list.sort();
        }

        let mut depths = HashMap::new();
        for code in jurisdictions.keys() {
            let depth = parent_chain_depth(&jurisdictions, code)?;
            depths.insert(code.clone(), depth);
        }

        let mut rule_sets = HashMap::new();
        let mut rule_sets_by_jurisdiction: HashMap<String, Vec<Uuid>> = HashMap::new();
        for rs in &reference.rule_sets {
            if !jurisdictions.contains_key(&rs.jurisdiction_code) {
                return Err(EngineError::invalid_reference(
                    format!(
                        "Rule set '{}' belongs to unknown jurisdiction '{}'",
                        rs.code, rs.jurisdiction_code
                    ),
                    vec![rs.code.clone(), rs.jurisdiction_code.clone()],
                ));
            }
            if rule_sets.insert(rs.id, rs.clone()).is_some() {
                return Err(EngineError::invalid_reference(
                    format!("Rule set id {} is defined more than once", rs.id),
                    vec![rs.code.clone()],
                ));
            }
            rule_sets_by_jurisdiction
                .entry(rs.jurisdiction_code.clone())
                .or_default()
                .push(rs.id);
        }

        let mut requires: HashMap<Uuid, Vec<RuleSetDependency>> = HashMap::new();
        let mut required_by: HashMap<Uuid, Vec<RuleSetDependency>> = HashMap::new();
        for dep in &reference.dependencies {
            let from = rule_sets.get(&dep.rule_set_id);
            let to = rule_sets.get(&dep.required_rule_set_id);
            let (Some(from), Some(to)) = (from, to) else {
                return Err(EngineError::invalid_reference(
                    "Dependency references an unknown rule set",
                    vec![
                        dep.rule_set_id.to_string(),
                        dep.required_rule_set_id.to_string(),
                    ],
                ));
            };
            if from.id == to.id {
                return Err(EngineError::cyclic_dependency(
                    format!("Rule set '{}' depends on itself", from.code),
                    vec![from.code.clone(), from.code.clone()],
                ));
            }
            requires.entry(from.id).or_default().push(dep.clone());
            required_by.entry(to.id).or_default().push(dep.clone());
        }

        Ok(Self {
            jurisdictions,
            children,
            depths,
            rule_sets,
            rule_sets_by_jurisdiction,
            requires,
            required_by,
        })
    }

    // ── Jurisdictions ──────────────────────────────────────────

    pub fn jurisdiction(&self, code: &str) -> Option<&Jurisdiction> {
        self.jurisdictions.get(code)
    }

    pub fn jurisdiction_codes(&self) -> impl Iterator<Item = &str> {
        self.jurisdictions.keys().map(|k| k.as_str())
    }

    pub fn parent(&self, code: &str) -> Option<&Jurisdiction> {
        self.jurisdictions
            .get(code)
            .and_then(|j| j.parent_code.as_deref())
            .and_then(|p| self.jurisdictions.get(p))
    }

    pub fn children(&self, code: &str) -> &[String] {
        self.children.get(code).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// The jurisdiction followed by each ancestor up to the root.
    pub fn lineage(&self, code: &str) -> Vec<&Jurisdiction> {
        let mut out = Vec::new();
        let mut current = self.jurisdictions.get(code);
        while let Some(j) = current {
            out.push(j);
            current = j.parent_code.as_deref().and_then(|p| self.jurisdictions.get(p));
        }
        out
    }

    /// Ancestors only, nearest first.
    pub fn ancestors(&self, code: &str) -> Vec<&Jurisdiction> {
        self.lineage(code).into_iter().skip(1).collect()
    }

    /// Distance from the root; roots have depth 0.
    pub fn depth(&self, code: &str) -> Option<usize> {
        self.depths.get(code).copied()
    }

    pub fn is_root(&self, code: &str) -> bool {
        self.depth(code) == Some(0)
    }

    pub fn root_of(&self, code: &str) -> Option<&Jurisdiction> {
        self.lineage(code).last().copied()
    }

    // ── Rule sets ──────────────────────────────────────────────

    pub fn rule_set(&self, id: Uuid) -> Option<&RuleSet> {
        self.rule_sets.get(&id)
    }

    pub fn rule_sets_in(&self, code: &str) -> Vec<&RuleSet> {
        let mut out: Vec<&RuleSet> = self
            .rule_sets_by_jurisdiction
            .get(code)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rule_sets.get(id))
            .collect();
        out.sort_by(|a, b| a.code.cmp(&b.code));
        out
    }

    /// Jurisdiction depth of the jurisdiction a rule set belongs to.
    pub fn rule_set_depth(&self, id: Uuid) -> Option<usize> {
        self.rule_sets
            .get(&id)
            .and_then(|rs| self.depth(&rs.jurisdiction_code))
    }

    pub fn dependencies_of(&self, id: Uuid) -> &[RuleSetDependency] {
        self.requires.get(&id).map(|d| d.as_slice()).unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: Uuid) -> &[RuleSetDependency] {
        self.required_by.get(&id).map(|d| d.as_slice()).unwrap_or(&[])
    }

    /// The direct edge `from -> to`, if any.
    pub fn edge(&self, from: Uuid, to: Uuid) -> Option<&RuleSetDependency> {
        self.dependencies_of(from)
            .iter()
            .find(|d| d.required_rule_set_id == to)
    }

    /// Active rule sets in effect on `on_date` attached to the jurisdiction
    /// or any ancestor, most specific jurisdiction first.
    pub fn applicable_rule_sets(
        &self,
        code: &str,
        on_date: NaiveDate,
        court_type: Option<&str>,
    ) -> Result<Vec<&RuleSet>, EngineError> {
        if !self.jurisdictions.contains_key(code) {
            return Err(EngineError::unknown_jurisdiction(code));
        }
        let out = self
            .lineage(code)
            .into_iter()
            .filter(|j| j.active)
            .flat_map(|j| self.rule_sets_in(&j.code))
            .filter(|rs| rs.active && rs.effective_date <= on_date)
            .filter(|rs| court_type.map_or(true, |ct| rs.court_type.eq_ignore_ascii_case(ct)))
            .collect();
        Ok(out)
    }

    /// Fail with the offending path if active rule sets form a dependency cycle.
    pub fn detect_cycles(&self) -> Result<(), EngineError> {
        let mut ids: Vec<Uuid> = self
            .rule_sets
            .values()
            .filter(|rs| rs.active)
            .map(|rs| rs.id)
            .collect();
        ids.sort();

        let mut done = HashSet::new();
        for id in ids {
            let mut path = Vec::new();
            let mut on_path = HashSet::new();
            self.walk_for_cycles(id, &mut path, &mut on_path, &mut done)?;
        }
        Ok(())
    }

    fn walk_for_cycles(
        &self,
        id: Uuid,
        path: &mut Vec<Uuid>,
        on_path: &mut HashSet<Uuid>,
        done: &mut HashSet<Uuid>,
    ) -> Result<(), EngineError> {
        if done.contains(&id) {
            return Ok(());
        }
        if on_path.contains(&id) {
            return Err(self.cycle_error(path, id));
        }
        path.push(id);
        on_path.insert(id);
        let targets: BTreeSet<Uuid> = self
            .dependencies_of(id)
            .iter()
            .map(|d| d.required_rule_set_id)
            .filter(|t| self.rule_sets.get(t).map_or(false, |rs| rs.active))
            .collect();
        for target in targets {
            self.walk_for_cycles(target, path, on_path, done)?;
        }
        on_path.remove(&id);
        path.pop();
        done.insert(id);
        Ok(())
    }

    /// Build a structural error naming every rule set on the cycle, closing
    /// back on `revisited`.
    pub(crate) fn cycle_error(&self, path: &[Uuid], revisited: Uuid) -> EngineError {
        let start = path.iter().position(|p| *p == revisited).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..].iter().map(|id| self.label(*id)).collect();
        cycle.push(self.label(revisited));
        EngineError::cyclic_dependency(
            format!("Rule-set dependency cycle: {}", cycle.join(" -> ")),
            cycle,
        )
    }

    /// Human-readable rule set name for diagnostics.
    pub fn label(&self, id: Uuid) -> String {
        self.rule_sets
            .get(&id)
            .map(|rs| rs.code.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

/// Walk the parent chain, failing if it revisits a node.
fn parent_chain_depth(
    jurisdictions: &HashMap<String, Jurisdiction>,
    code: &str,
) -> Result<usize, EngineError> {
    let mut seen = vec![code.to_string()];
    let mut current = jurisdictions.get(code).and_then(|j| j.parent_code.clone());
    while let Some(parent) = current {
        if seen.contains(&parent) {
            seen.push(parent);
            return Err(EngineError::invalid_jurisdiction(
                format!("Jurisdiction parent chain is cyclic: {}", seen.join(" -> ")),
                seen,
            ));
        }
        current = jurisdictions.get(&parent).and_then(|j| j.parent_code.clone());
        seen.push(parent);
    }
    Ok(seen.len() - 1)
}

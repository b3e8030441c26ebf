//! Rule conflict detection and resolution
//!
//! Groups the candidate deadlines of the effective rule sets by
//! (trigger type, deadline name). When more than one rule set defines the
//! same logical deadline with a different offset, priority or counting
//! method, the group becomes a RuleConflict and a resolution strategy picks
//! a winner or leaves it for a human.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use shared_types::{
    CalculationInput, ConflictCandidate, ConflictOrigin, ConflictResolution, ConflictType,
    CountingMethod, DeadlinePriority, DependencyKind, EngineConfig, EngineError,
    ResolutionStrategy, RuleConflict, RuleSet, RuleTemplate, RuleTemplateDeadline, ServiceMethod,
    TriggerType,
};
use uuid::Uuid;

use super::deadline_engine::DateCalculator;
use super::jurisdiction_graph::JurisdictionGraph;
use super::selection::SelectionResolution;

/// Order in which strategies are tried when the chosen one cannot single
/// out a winner.
const FALLBACK_ORDER: [ResolutionStrategy; 3] = [
    ResolutionStrategy::LocalPrevails,
    ResolutionStrategy::FederalPrevails,
    ResolutionStrategy::Strictest,
];

/// One template deadline offered by an effective rule set.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineCandidate<'r> {
    pub rule_set: &'r RuleSet,
    pub template: &'r RuleTemplate,
    pub deadline: &'r RuleTemplateDeadline,
}

impl DeadlineCandidate<'_> {
    fn signature(&self) -> (i32, DeadlinePriority, CountingMethod) {
        (
            self.deadline.day_offset,
            self.deadline.priority,
            self.deadline.counting_method,
        )
    }
}

/// A candidate cleared for calculation, with an optional note explaining
/// how it won or absorbed competing definitions.
#[derive(Debug, Clone)]
pub struct AcceptedCandidate<'r> {
    pub candidate: DeadlineCandidate<'r>,
    pub note: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConflictReport<'r> {
    pub accepted: Vec<AcceptedCandidate<'r>>,
    pub conflicts: Vec<RuleConflict>,
}

pub struct ConflictDetector<'a> {
    graph: &'a JurisdictionGraph,
    calculator: &'a DateCalculator<'a>,
    config: &'a EngineConfig,
}

/// Normalized grouping key for a deadline name.
fn group_key(trigger: TriggerType, name: &str) -> (TriggerType, String) {
    (trigger, name.trim().to_lowercase())
}

impl<'a> ConflictDetector<'a> {
    pub fn new(
        graph: &'a JurisdictionGraph,
        calculator: &'a DateCalculator<'a>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            graph,
            calculator,
            config,
        }
    }

    /// Split candidates into those safe to calculate and the conflicts found.
    ///
    /// A declared conflict with `auto_resolve = false` holds its group back
    /// even when every rule set defines the deadline identically. Unmatched
    /// declarations are passed through only when they await a human.
    pub fn detect<'r>(
        &self,
        candidates: Vec<DeadlineCandidate<'r>>,
        resolution: &SelectionResolution,
        trigger_date: NaiveDate,
        service_method: Option<ServiceMethod>,
    ) -> Result<ConflictReport<'r>, EngineError> {
        let mut groups: BTreeMap<(TriggerType, String), Vec<DeadlineCandidate<'r>>> =
            BTreeMap::new();
        for candidate in candidates {
            groups
                .entry(group_key(candidate.template.trigger_type, &candidate.deadline.name))
                .or_default()
                .push(candidate);
        }

        let mut report = ConflictReport::default();
        let mut consumed_declared = vec![false; resolution.conflicts.len()];

        for ((trigger, _), mut group) in groups {
            group.sort_by(|a, b| self.specificity_order(a, b));

            let rule_sets: BTreeSet<Uuid> = group.iter().map(|c| c.rule_set.id).collect();
            if rule_sets.len() < 2 {
                report.accepted.extend(group.into_iter().map(|candidate| AcceptedCandidate {
                    candidate,
                    note: None,
                }));
                continue;
            }

            let declared_idx = resolution.conflicts.iter().position(|c| {
                c.covers(trigger, &group[0].deadline.name)
                    && rule_sets
                        .iter()
                        .any(|a| rule_sets.iter().any(|b| a != b && c.involves_pair(*a, *b)))
            });
            if let Some(idx) = declared_idx {
                consumed_declared[idx] = true;
            }
            let declared = declared_idx.map(|idx| &resolution.conflicts[idx]);
            let held = declared.map_or(false, |d| !d.auto_resolve);

            let signatures: BTreeSet<_> = group.iter().map(|c| c.signature()).collect();
            if signatures.len() == 1 && !held {
                // Identical definitions: keep the most specific one.
                let mut iter = group.into_iter();
                if let Some(first) = iter.next() {
                    let others: Vec<String> =
                        iter.map(|c| c.rule_set.code.clone()).collect();
                    report.accepted.push(AcceptedCandidate {
                        candidate: first,
                        note: Some(format!("Also defined identically by {}", others.join(", "))),
                    });
                }
                continue;
            }

            let conflict = self.build_conflict(
                trigger,
                &group,
                declared,
                resolution,
                trigger_date,
                service_method,
            )?;

            if let ConflictResolution::Resolved {
                winner_template_deadline_id,
                applied_strategy,
                reason,
                ..
            } = &conflict.resolution
            {
                if let Some(winner) = group
                    .iter()
                    .find(|c| c.deadline.id == *winner_template_deadline_id)
                {
                    report.accepted.push(AcceptedCandidate {
                        candidate: *winner,
                        note: Some(format!(
                            "Conflict resolved by {}: {}",
                            applied_strategy.as_str(),
                            reason
                        )),
                    });
                }
                tracing::debug!(
                    deadline = %group[0].deadline.name,
                    strategy = applied_strategy.as_str(),
                    "conflict resolved"
                );
            } else {
                tracing::warn!(deadline = %group[0].deadline.name, "conflict left unresolved");
            }
            report.conflicts.push(conflict);
        }

        for (idx, declared) in resolution.conflicts.iter().enumerate() {
            if !consumed_declared[idx] && !declared.auto_resolve {
                report.conflicts.push(declared.clone());
            }
        }

        Ok(report)
    }

    /// Deepest jurisdiction first, then rule-set code, then deadline id.
    fn specificity_order(
        &self,
        a: &DeadlineCandidate<'_>,
        b: &DeadlineCandidate<'_>,
    ) -> std::cmp::Ordering {
        let da = self.graph.rule_set_depth(a.rule_set.id).unwrap_or(0);
        let db = self.graph.rule_set_depth(b.rule_set.id).unwrap_or(0);
        db.cmp(&da)
            .then_with(|| a.rule_set.code.cmp(&b.rule_set.code))
            .then_with(|| a.deadline.id.cmp(&b.deadline.id))
    }

    fn build_conflict(
        &self,
        trigger: TriggerType,
        group: &[DeadlineCandidate<'_>],
        declared: Option<&RuleConflict>,
        resolution: &SelectionResolution,
        trigger_date: NaiveDate,
        service_method: Option<ServiceMethod>,
    ) -> Result<RuleConflict, EngineError> {
        let mut candidates = Vec::with_capacity(group.len());
        for c in group {
            let input = CalculationInput {
                jurisdiction_code: c.rule_set.jurisdiction_code.clone(),
                trigger_date,
                day_count: c.deadline.day_offset,
                counting_method: c.deadline.counting_method,
                service_method: service_method.filter(|_| c.deadline.add_service_days),
            };
            let projected = self.calculator.calculate(&input)?;
            candidates.push(ConflictCandidate {
                rule_set_id: c.rule_set.id,
                template_deadline_id: c.deadline.id,
                jurisdiction_code: c.rule_set.jurisdiction_code.clone(),
                jurisdiction_depth: self.graph.rule_set_depth(c.rule_set.id).unwrap_or(0),
                day_offset: c.deadline.day_offset,
                priority: c.deadline.priority,
                counting_method: c.deadline.counting_method,
                projected_date: Some(projected.deadline_date),
            });
        }

        let conflict_type = classify(group);
        let name = group[0].deadline.name.clone();
        let mut distinct = Vec::new();
        for c in group {
            if !distinct.contains(&c.rule_set.id) {
                distinct.push(c.rule_set.id);
            }
        }
        let codes: Vec<String> = distinct.iter().map(|id| self.graph.label(*id)).collect();

        let strategy = declared
            .map(|d| d.strategy)
            .unwrap_or(self.config.default_strategy);
        let auto_resolve = declared.map_or(!strategy.is_deferred(), |d| d.auto_resolve);

        let mut description = format!(
            "{} define '{}' {} ({})",
            codes.join(" and "),
            name,
            if conflict_type == ConflictType::Declared {
                "identically"
            } else {
                "differently"
            },
            describe_differences(&candidates)
        );
        if let Some(d) = declared {
            description = format!("{}; declared: {}", description, d.description);
        }

        let outcome = if !auto_resolve {
            ConflictResolution::Unresolved {
                reason: match declared {
                    Some(_) => "Declared conflict requires a human decision".to_string(),
                    None => format!("Strategy {} defers to a human decision", strategy.as_str()),
                },
            }
        } else if let Some((idx, reason)) = self.overriding_candidate(&candidates) {
            ConflictResolution::Resolved {
                winner_rule_set_id: candidates[idx].rule_set_id,
                winner_template_deadline_id: candidates[idx].template_deadline_id,
                applied_strategy: strategy,
                reason,
            }
        } else {
            self.apply_strategy(strategy, &candidates, resolution)
        };

        Ok(RuleConflict {
            id: declared.and_then(|d| d.id),
            origin: ConflictOrigin::Detected,
            rule_set_a: distinct[0],
            rule_set_b: distinct[1],
            trigger_type: Some(trigger),
            deadline_name: Some(name),
            conflict_type,
            description,
            strategy,
            auto_resolve,
            manual_notes: declared.and_then(|d| d.manual_notes.clone()),
            candidates,
            resolution: outcome,
        })
    }

    /// A candidate whose rule set declares `overrides` on every other
    /// competing rule set supersedes them.
    fn overriding_candidate(&self, candidates: &[ConflictCandidate]) -> Option<(usize, String)> {
        let rule_sets: BTreeSet<Uuid> = candidates.iter().map(|c| c.rule_set_id).collect();
        candidates.iter().enumerate().find_map(|(idx, c)| {
            let overrides_all = rule_sets
                .iter()
                .filter(|other| **other != c.rule_set_id)
                .all(|other| {
                    self.graph
                        .edge(c.rule_set_id, *other)
                        .map_or(false, |e| e.kind == DependencyKind::Overrides)
                });
            overrides_all.then(|| {
                (
                    idx,
                    format!("'{}' overrides the competing rule sets", self.graph.label(c.rule_set_id)),
                )
            })
        })
    }

    fn apply_strategy(
        &self,
        strategy: ResolutionStrategy,
        candidates: &[ConflictCandidate],
        resolution: &SelectionResolution,
    ) -> ConflictResolution {
        if strategy.is_deferred() {
            return ConflictResolution::Unresolved {
                reason: format!("Strategy {} defers to a human decision", strategy.as_str()),
            };
        }

        let order = std::iter::once(strategy)
            .chain(FALLBACK_ORDER.into_iter().filter(|s| *s != strategy));
        for attempt in order {
            let picked = match attempt {
                ResolutionStrategy::LocalPrevails => pick_local(candidates),
                ResolutionStrategy::FederalPrevails => pick_federal(candidates),
                ResolutionStrategy::Strictest => pick_strictest(candidates, resolution),
                ResolutionStrategy::UserChoice | ResolutionStrategy::Manual => None,
            };
            if let Some(idx) = picked {
                let winner = &candidates[idx];
                let reason = match attempt {
                    ResolutionStrategy::LocalPrevails => format!(
                        "most specific jurisdiction '{}' prevails",
                        winner.jurisdiction_code
                    ),
                    ResolutionStrategy::FederalPrevails => format!(
                        "root jurisdiction '{}' prevails",
                        winner.jurisdiction_code
                    ),
                    _ => match winner.projected_date {
                        Some(date) => format!("earliest deadline {} prevails", date),
                        None => "earliest deadline prevails".to_string(),
                    },
                };
                return ConflictResolution::Resolved {
                    winner_rule_set_id: winner.rule_set_id,
                    winner_template_deadline_id: winner.template_deadline_id,
                    applied_strategy: attempt,
                    reason,
                };
            }
        }

        ConflictResolution::Unresolved {
            reason: "No strategy could single out one rule set".to_string(),
        }
    }
}

/// Index of the first candidate whose rule set is the only one in `pool`.
fn unique_rule_set(candidates: &[ConflictCandidate], pool: &[usize]) -> Option<usize> {
    let first = *pool.first()?;
    let id = candidates[first].rule_set_id;
    pool.iter()
        .all(|i| candidates[*i].rule_set_id == id)
        .then_some(first)
}

fn pick_local(candidates: &[ConflictCandidate]) -> Option<usize> {
    let deepest = candidates.iter().map(|c| c.jurisdiction_depth).max()?;
    if deepest == 0 {
        return None;
    }
    let pool: Vec<usize> = (0..candidates.len())
        .filter(|i| candidates[*i].jurisdiction_depth == deepest)
        .collect();
    unique_rule_set(candidates, &pool)
}

fn pick_federal(candidates: &[ConflictCandidate]) -> Option<usize> {
    let pool: Vec<usize> = (0..candidates.len())
        .filter(|i| candidates[*i].jurisdiction_depth == 0)
        .collect();
    unique_rule_set(candidates, &pool)
}

fn pick_strictest(candidates: &[ConflictCandidate], resolution: &SelectionResolution) -> Option<usize> {
    let earliest = candidates.iter().filter_map(|c| c.projected_date).min()?;
    let pool: Vec<usize> = (0..candidates.len())
        .filter(|i| candidates[*i].projected_date == Some(earliest))
        .collect();
    if let Some(idx) = unique_rule_set(candidates, &pool) {
        return Some(idx);
    }

    // Tie on date: higher declared dependency priority wins.
    let priority = |i: &usize| {
        resolution
            .entry(candidates[*i].rule_set_id)
            .map_or(0, |e| e.dependency_priority)
    };
    let best = pool.iter().map(priority).max()?;
    let top: Vec<usize> = pool.into_iter().filter(|i| priority(i) == best).collect();
    unique_rule_set(candidates, &top)
}

fn classify(group: &[DeadlineCandidate<'_>]) -> ConflictType {
    let first = group[0].deadline;
    let offset = group.iter().any(|c| c.deadline.day_offset != first.day_offset);
    let priority = group.iter().any(|c| c.deadline.priority != first.priority);
    let method = group
        .iter()
        .any(|c| c.deadline.counting_method != first.counting_method);
    match (offset, priority, method) {
        (true, false, false) => ConflictType::DayOffset,
        (false, true, false) => ConflictType::Priority,
        (false, false, true) => ConflictType::CountingMethod,
        // Only a declaration can turn identical definitions into a conflict
        (false, false, false) => ConflictType::Declared,
        _ => ConflictType::Multiple,
    }
}

fn describe_differences(candidates: &[ConflictCandidate]) -> String {
    candidates
        .iter()
        .map(|c| {
            format!(
                "{}: {} {} {:?}",
                c.jurisdiction_code,
                c.day_offset,
                c.counting_method.as_str(),
                c.priority
            )
        })
        .collect::<Vec<_>>()
        .join(" vs ")
}

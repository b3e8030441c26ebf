//! Deadline projection pipeline
//!
//! Stateless over an immutable reference snapshot:
//! 1. Resolves the selected rule sets to the effective set (closure + locks)
//! 2. Selects active templates matching the trigger and case type
//! 3. Detects and resolves conflicts between competing rule sets
//! 4. Computes a date for every deadline not held by an unresolved conflict
//! 5. Returns the deadlines sorted by date with conflicts and warnings

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use shared_types::{
    CalculatedDeadline, CalculationInput, CalculationResult, EngineConfig, EngineError,
    Projection, ProjectionRequest, ReferenceData, RuleConflict, TriggerType,
};
use uuid::Uuid;

use super::conflict::{ConflictDetector, DeadlineCandidate};
use super::deadline_engine::{DateCalculator, ServiceExtensions};
use super::holiday_calendar::{HolidayCalendar, HolidaySet};
use super::jurisdiction_graph::JurisdictionGraph;
use super::selection::{DeselectOutcome, DeselectPolicy, SelectionResolution, SelectionResolver};

/// The deadline engine for one reference snapshot.
///
/// Safe to share across threads; concurrent projections only contend on the
/// holiday cache.
#[derive(Debug)]
pub struct DeadlineEngine {
    reference: ReferenceData,
    config: EngineConfig,
    graph: JurisdictionGraph,
    calendar: HolidayCalendar,
    service: ServiceExtensions,
    /// rule set id -> indexes into `reference.templates`
    templates_by_rule_set: HashMap<Uuid, Vec<usize>>,
    /// template id -> indexes into `reference.template_deadlines`
    deadlines_by_template: HashMap<Uuid, Vec<usize>>,
}

impl DeadlineEngine {
    /// Validate the snapshot and build lookup structures.
    ///
    /// Fails on any structural defect: cyclic jurisdiction parents or
    /// rule-set dependencies, malformed holiday rules, dangling references.
    pub fn new(reference: ReferenceData, config: EngineConfig) -> Result<Self, EngineError> {
        let graph = JurisdictionGraph::new(&reference)?;
        graph.detect_cycles()?;
        let calendar = HolidayCalendar::new(&reference, &graph, config.memoize_holidays)?;
        let service = ServiceExtensions::new(&reference.service_rules)?;

        let mut templates_by_rule_set: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, template) in reference.templates.iter().enumerate() {
            if graph.rule_set(template.rule_set_id).is_none() {
                return Err(EngineError::invalid_reference(
                    format!(
                        "Template '{}' belongs to unknown rule set {}",
                        template.name, template.rule_set_id
                    ),
                    vec![template.id.to_string()],
                ));
            }
            templates_by_rule_set
                .entry(template.rule_set_id)
                .or_default()
                .push(idx);
        }

        let template_ids: HashSet<Uuid> = reference.templates.iter().map(|t| t.id).collect();
        let mut deadlines_by_template: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, deadline) in reference.template_deadlines.iter().enumerate() {
            if !template_ids.contains(&deadline.template_id) {
                return Err(EngineError::invalid_reference(
                    format!(
                        "Deadline '{}' belongs to unknown template {}",
                        deadline.name, deadline.template_id
                    ),
                    vec![deadline.id.to_string()],
                ));
            }
            deadlines_by_template
                .entry(deadline.template_id)
                .or_default()
                .push(idx);
        }

        tracing::info!(
            jurisdictions = reference.jurisdictions.len(),
            rule_sets = reference.rule_sets.len(),
            templates = reference.templates.len(),
            holidays = reference.holidays.len(),
            "deadline engine ready"
        );

        Ok(Self {
            reference,
            config,
            graph,
            calendar,
            service,
            templates_by_rule_set,
            deadlines_by_template,
        })
    }

    /// Build with the process-wide config from `config.toml`.
    pub fn with_loaded_config(reference: ReferenceData) -> Result<Self, EngineError> {
        Self::new(reference, crate::config::engine_config().clone())
    }

    /// Build from a JSON reference snapshot.
    pub fn from_json(json: &str, config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(ReferenceData::from_json_str(json)?, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn graph(&self) -> &JurisdictionGraph {
        &self.graph
    }

    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    pub fn calculator(&self) -> DateCalculator<'_> {
        DateCalculator::new(&self.graph, &self.calendar, &self.service, &self.config)
    }

    pub fn holidays_for(&self, jurisdiction_code: &str, year: i32) -> Arc<HolidaySet> {
        self.calendar.holidays_for(jurisdiction_code, year)
    }

    /// A single ad-hoc calculation outside any rule template.
    pub fn calculate_single(
        &self,
        input: &CalculationInput,
    ) -> Result<CalculationResult, EngineError> {
        self.calculator().calculate(input)
    }

    pub fn resolve_selection(&self, selected: &[Uuid]) -> Result<SelectionResolution, EngineError> {
        SelectionResolver::new(&self.graph, &self.reference.conflicts).resolve(selected)
    }

    pub fn deselect(
        &self,
        selected: &[Uuid],
        target: Uuid,
        policy: DeselectPolicy,
    ) -> Result<DeselectOutcome, EngineError> {
        SelectionResolver::new(&self.graph, &self.reference.conflicts)
            .deselect(selected, target, policy)
    }

    /// Project every deadline that follows from a trigger event.
    #[tracing::instrument(
        skip(self, request),
        fields(trigger = request.trigger_type.as_str(), trigger_date = %request.trigger_date)
    )]
    pub fn project(&self, request: &ProjectionRequest) -> Result<Projection, EngineError> {
        // Stage 1: selection closure and locks
        let resolution = self.resolve_selection(&request.selected_rule_sets)?;
        let mut warnings = resolution.warnings.clone();

        // Stage 2: template selection
        let candidates = self.select_candidates(
            request.trigger_type,
            request.trigger_date,
            request.case_type.as_deref(),
            &resolution,
            &mut warnings,
        );

        let calculator = self.calculator();
        if candidates.is_empty() {
            let message = format!(
                "No rule templates for trigger '{}' in the selected rule sets; no deadlines were computed",
                request.trigger_type.as_str()
            );
            tracing::warn!("{}", message);
            warnings.push(message);
            let declared = resolution
                .conflicts
                .iter()
                .filter(|c| !c.auto_resolve)
                .filter(|c| c.trigger_type.map_or(true, |t| t == request.trigger_type))
                .cloned()
                .collect();
            return Ok(self.finish(request, &resolution, Vec::new(), declared, warnings));
        }

        // Stage 3: conflicts
        let detector = ConflictDetector::new(&self.graph, &calculator, &self.config);
        let report = detector.detect(
            candidates,
            &resolution,
            request.trigger_date,
            request.service_method,
        )?;

        // Stage 4: dates
        let mut deadlines = Vec::with_capacity(report.accepted.len());
        for accepted in &report.accepted {
            let DeadlineCandidate {
                rule_set,
                template,
                deadline,
            } = accepted.candidate;
            let service_method = request.service_method.filter(|_| deadline.add_service_days);
            let result = calculator.calculate(&CalculationInput {
                jurisdiction_code: rule_set.jurisdiction_code.clone(),
                trigger_date: request.trigger_date,
                day_count: deadline.day_offset,
                counting_method: deadline.counting_method,
                service_method,
            })?;

            let mut notes = result.notes();
            if let Some(extra) = &deadline.notes {
                notes = format!("{}; {}", notes, extra);
            }

            deadlines.push(CalculatedDeadline {
                template_id: template.id,
                template_deadline_id: deadline.id,
                rule_set_id: rule_set.id,
                jurisdiction_code: rule_set.jurisdiction_code.clone(),
                name: deadline.name.clone(),
                trigger_type: request.trigger_type,
                trigger_date: request.trigger_date,
                deadline_date: result.deadline_date,
                day_offset: deadline.day_offset,
                total_days: result.total_days,
                priority: deadline.priority,
                party_responsible: deadline.party_responsible.clone(),
                action_required: deadline.action_required.clone(),
                citation: template.citation.clone(),
                counting_method: deadline.counting_method,
                service_method,
                service_days_added: result.service_days_added,
                holidays_skipped: result.holidays_skipped,
                weekend_days_skipped: result.weekend_days_skipped,
                calculation_notes: notes,
                audit_log: result.audit_log,
                conflict_note: accepted.note.clone(),
            });
        }

        // Stage 5: report
        deadlines.sort_by(|a, b| {
            a.deadline_date
                .cmp(&b.deadline_date)
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.name.cmp(&b.name))
        });

        let conflicts: Vec<_> = report
            .conflicts
            .into_iter()
            .filter(|c| c.trigger_type.map_or(true, |t| t == request.trigger_type))
            .collect();
        let unresolved = conflicts.iter().filter(|c| !c.is_resolved()).count();
        if unresolved > 0 {
            warnings.push(format!(
                "{} unresolved conflict(s) need a decision before the affected deadlines are final",
                unresolved
            ));
        }

        tracing::info!(
            deadlines = deadlines.len(),
            conflicts = conflicts.len(),
            unresolved,
            "projection complete"
        );

        Ok(self.finish(request, &resolution, deadlines, conflicts, warnings))
    }

    /// Active templates of effective rule sets matching the trigger.
    fn select_candidates(
        &self,
        trigger: TriggerType,
        trigger_date: NaiveDate,
        case_type: Option<&str>,
        resolution: &SelectionResolution,
        warnings: &mut Vec<String>,
    ) -> Vec<DeadlineCandidate<'_>> {
        let mut out = Vec::new();
        for resolved in &resolution.effective {
            let Some(rule_set) = self.graph.rule_set(resolved.rule_set_id) else {
                continue;
            };
            if rule_set.effective_date > trigger_date {
                warnings.push(format!(
                    "Rule set '{}' takes effect {} after the trigger date; it was not applied",
                    rule_set.code, rule_set.effective_date
                ));
                continue;
            }
            let templates = self
                .templates_by_rule_set
                .get(&rule_set.id)
                .into_iter()
                .flatten()
                .map(|idx| &self.reference.templates[*idx])
                .filter(|t| t.active && t.trigger_type == trigger)
                .filter(|t| t.applies_to_case_type(case_type));
            for template in templates {
                let deadlines = self
                    .deadlines_by_template
                    .get(&template.id)
                    .into_iter()
                    .flatten()
                    .map(|idx| &self.reference.template_deadlines[*idx]);
                for deadline in deadlines {
                    out.push(DeadlineCandidate {
                        rule_set,
                        template,
                        deadline,
                    });
                }
            }
        }
        out
    }

    fn finish(
        &self,
        request: &ProjectionRequest,
        resolution: &SelectionResolution,
        deadlines: Vec<CalculatedDeadline>,
        conflicts: Vec<RuleConflict>,
        warnings: Vec<String>,
    ) -> Projection {
        Projection {
            trigger_type: request.trigger_type,
            trigger_date: request.trigger_date,
            deadlines,
            conflicts,
            warnings,
            effective_rule_sets: resolution.effective_ids(),
            locked_rule_sets: resolution.locked.iter().copied().collect(),
        }
    }
}

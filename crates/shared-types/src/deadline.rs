use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::ServiceMethod;
use crate::compliance::RuleConflict;
use crate::rule::{CountingMethod, DeadlinePriority, TriggerType};

// ---------------------------------------------------------------------------
// Audit Trail
// ---------------------------------------------------------------------------

/// A discrete step in a deadline calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStep {
    Start,
    ApplyServiceDays,
    SkipWeekend,
    SkipHoliday,
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub step: AuditStep,
    pub date: NaiveDate,
    pub detail: String,
}

// ---------------------------------------------------------------------------
// Single Calculation
// ---------------------------------------------------------------------------

/// Input to a single date calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationInput {
    pub jurisdiction_code: String,
    pub trigger_date: NaiveDate,
    pub day_count: i32,
    pub counting_method: CountingMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_method: Option<ServiceMethod>,
}

/// Result of a single date calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationResult {
    pub trigger_date: NaiveDate,
    /// Date reached by counting, before rollover.
    pub raw_date: NaiveDate,
    pub deadline_date: NaiveDate,
    pub day_count: i32,
    pub service_days_added: i32,
    /// `day_count + service_days_added`.
    pub total_days: i32,
    pub counting_method: CountingMethod,
    pub weekend_days_skipped: u32,
    pub holidays_skipped: u32,
    /// FRCP 6(a)(2): periods of 14 days or less.
    pub is_short_period: bool,
    pub audit_log: Vec<AuditEntry>,
}

impl CalculationResult {
    /// One-line rendering of the audit trail.
    pub fn notes(&self) -> String {
        self.audit_log
            .iter()
            .map(|e| e.detail.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// A deadline computed from a rule template for one trigger event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculatedDeadline {
    pub template_id: Uuid,
    pub template_deadline_id: Uuid,
    pub rule_set_id: Uuid,
    pub jurisdiction_code: String,
    pub name: String,
    pub trigger_type: TriggerType,
    pub trigger_date: NaiveDate,
    pub deadline_date: NaiveDate,
    pub day_offset: i32,
    pub total_days: i32,
    pub priority: DeadlinePriority,
    pub party_responsible: String,
    pub action_required: String,
    pub citation: String,
    pub counting_method: CountingMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_method: Option<ServiceMethod>,
    pub service_days_added: i32,
    pub holidays_skipped: u32,
    pub weekend_days_skipped: u32,
    pub calculation_notes: String,
    pub audit_log: Vec<AuditEntry>,
    /// Set when this deadline won a resolved conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_note: Option<String>,
}

/// Request to project every deadline that follows from a trigger event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectionRequest {
    pub trigger_type: TriggerType,
    pub trigger_date: NaiveDate,
    pub selected_rule_sets: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_method: Option<ServiceMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
}

/// Projected deadlines plus the conflicts met along the way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Projection {
    pub trigger_type: TriggerType,
    pub trigger_date: NaiveDate,
    /// Sorted by deadline date, most severe first on the same date.
    pub deadlines: Vec<CalculatedDeadline>,
    pub conflicts: Vec<RuleConflict>,
    pub warnings: Vec<String>,
    pub effective_rule_sets: Vec<Uuid>,
    pub locked_rule_sets: Vec<Uuid>,
}

impl Projection {
    pub fn unresolved_conflicts(&self) -> impl Iterator<Item = &RuleConflict> {
        self.conflicts.iter().filter(|c| !c.is_resolved())
    }

    pub fn has_unresolved_conflicts(&self) -> bool {
        self.unresolved_conflicts().next().is_some()
    }

    pub fn deadline(&self, name: &str) -> Option<&CalculatedDeadline> {
        self.deadlines.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

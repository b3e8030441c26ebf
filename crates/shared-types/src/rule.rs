use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Rule Sets
// ---------------------------------------------------------------------------

/// One coherent, versioned body of procedural rules attached to a single
/// jurisdiction (e.g. "Florida Rules of Civil Procedure").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSet {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub jurisdiction_code: String,
    /// Court type the rules govern (e.g. "district", "circuit", "bankruptcy").
    pub court_type: String,
    pub version: String,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// How a rule set relates to a rule set it requires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Applied together, no ordering implication.
    Concurrent,
    /// Base rules carried over.
    Inherits,
    /// Adds to the required set without replacing it.
    Supplements,
    /// Supersedes the required set on conflict.
    Overrides,
}

/// Directed edge `rule_set_id -> required_rule_set_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSetDependency {
    pub rule_set_id: Uuid,
    pub required_rule_set_id: Uuid,
    pub kind: DependencyKind,
    /// Tie-breaker; higher wins.
    #[serde(default)]
    pub priority: i32,
}

// ---------------------------------------------------------------------------
// Trigger Types
// ---------------------------------------------------------------------------

/// Case events from which dependent deadlines are counted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    CaseFiled,
    ServiceCompleted,
    ComplaintServed,
    AnswerFiled,
    DiscoveryCommenced,
    MotionFiled,
    HearingScheduled,
    PretrialConference,
    TrialDate,
    OrderEntered,
    JudgmentEntered,
    AppealFiled,
}

impl TriggerType {
    /// Parse from the snake_case wire name.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseFiled => "case_filed",
            Self::ServiceCompleted => "service_completed",
            Self::ComplaintServed => "complaint_served",
            Self::AnswerFiled => "answer_filed",
            Self::DiscoveryCommenced => "discovery_commenced",
            Self::MotionFiled => "motion_filed",
            Self::HearingScheduled => "hearing_scheduled",
            Self::PretrialConference => "pretrial_conference",
            Self::TrialDate => "trial_date",
            Self::OrderEntered => "order_entered",
            Self::JudgmentEntered => "judgment_entered",
            Self::AppealFiled => "appeal_filed",
        }
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A rule within a rule set that fires on a trigger event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleTemplate {
    pub id: Uuid,
    pub rule_set_id: Uuid,
    pub trigger_type: TriggerType,
    pub name: String,
    pub citation: String,
    /// Case types the template applies to. Empty means every case type.
    #[serde(default)]
    pub case_types: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl RuleTemplate {
    pub fn applies_to_case_type(&self, case_type: Option<&str>) -> bool {
        match case_type {
            None => true,
            Some(_) if self.case_types.is_empty() => true,
            Some(ct) => self.case_types.iter().any(|c| c.eq_ignore_ascii_case(ct)),
        }
    }
}

/// Severity of missing a deadline. Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePriority {
    Informational,
    #[default]
    Standard,
    Important,
    Critical,
    Fatal,
}

/// Day-counting convention for a deadline.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CountingMethod {
    #[default]
    CalendarDays,
    BusinessDays,
    CourtDays,
}

impl CountingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalendarDays => "calendar_days",
            Self::BusinessDays => "business_days",
            Self::CourtDays => "court_days",
        }
    }
}

/// A named deadline produced by a template, counted from the trigger date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleTemplateDeadline {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    /// Signed offset in days; negative counts backward from the trigger.
    pub day_offset: i32,
    #[serde(default)]
    pub priority: DeadlinePriority,
    #[serde(default)]
    pub counting_method: CountingMethod,
    /// Whether the service-method extension applies.
    #[serde(default)]
    pub add_service_days: bool,
    pub party_responsible: String,
    pub action_required: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

//! Rule conflict types.
//!
//! A conflict is either declared by an administrator in the reference data
//! or detected when two effective rule sets define the same logical deadline
//! differently. Detected conflicts are recomputed on every projection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::{CountingMethod, DeadlinePriority, TriggerType};

// ─── Resolution Strategy ───────────────────────────────────────

/// How competing rule-set values are reconciled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Most specific (deepest, non-root) jurisdiction wins.
    #[default]
    LocalPrevails,
    /// Root jurisdiction wins regardless of depth.
    FederalPrevails,
    /// Earliest resulting deadline date wins.
    Strictest,
    /// Deferred to the user.
    UserChoice,
    /// Deferred to an administrator.
    Manual,
}

impl ResolutionStrategy {
    /// Strategies that never pick a side on their own.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::UserChoice | Self::Manual)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalPrevails => "local_prevails",
            Self::FederalPrevails => "federal_prevails",
            Self::Strictest => "strictest",
            Self::UserChoice => "user_choice",
            Self::Manual => "manual",
        }
    }
}

// ─── Conflict ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictOrigin {
    #[default]
    Declared,
    Detected,
}

/// Which aspect of a deadline the competing rule sets disagree on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    DayOffset,
    Priority,
    CountingMethod,
    /// More than one of the above differ.
    Multiple,
    /// Declared by an administrator without a field-level diff.
    #[default]
    Declared,
}

/// One rule set's definition of a contested deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictCandidate {
    pub rule_set_id: Uuid,
    pub template_deadline_id: Uuid,
    pub jurisdiction_code: String,
    pub jurisdiction_depth: usize,
    pub day_offset: i32,
    pub priority: DeadlinePriority,
    pub counting_method: CountingMethod,
    /// Date this candidate would produce for the current trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_date: Option<NaiveDate>,
}

/// Outcome of applying a resolution strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConflictResolution {
    Resolved {
        winner_rule_set_id: Uuid,
        winner_template_deadline_id: Uuid,
        applied_strategy: ResolutionStrategy,
        reason: String,
    },
    Unresolved {
        reason: String,
    },
}

impl Default for ConflictResolution {
    fn default() -> Self {
        Self::Unresolved {
            reason: "Awaiting resolution".to_string(),
        }
    }
}

/// A declared or detected incompatibility between rule sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConflict {
    /// Declared conflicts carry their reference-data id; detected ones do not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub origin: ConflictOrigin,
    pub rule_set_a: Uuid,
    pub rule_set_b: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<TriggerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_name: Option<String>,
    #[serde(default)]
    pub conflict_type: ConflictType,
    pub description: String,
    pub strategy: ResolutionStrategy,
    #[serde(default)]
    pub auto_resolve: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_notes: Option<String>,
    #[serde(default)]
    pub candidates: Vec<ConflictCandidate>,
    #[serde(default)]
    pub resolution: ConflictResolution,
}

impl RuleConflict {
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, ConflictResolution::Resolved { .. })
    }

    /// Whether this conflict is between the two given rule sets, in either order.
    pub fn involves_pair(&self, a: Uuid, b: Uuid) -> bool {
        (self.rule_set_a == a && self.rule_set_b == b) || (self.rule_set_a == b && self.rule_set_b == a)
    }

    /// Whether a declared conflict applies to the given deadline. Declared
    /// conflicts without a trigger type or deadline name match any value.
    pub fn covers(&self, trigger_type: TriggerType, deadline_name: &str) -> bool {
        self.trigger_type.map_or(true, |t| t == trigger_type)
            && self
                .deadline_name
                .as_ref()
                .map_or(true, |n| n.trim().eq_ignore_ascii_case(deadline_name.trim()))
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorization of engine errors.
///
/// Every kind except `SelectionLocked` and `DateOutOfRange` describes a defect
/// in the reference data rather than a user mistake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EngineErrorKind {
    CyclicDependency,
    InvalidHoliday,
    InvalidJurisdiction,
    InvalidReference,
    UnknownRuleSet,
    UnknownJurisdiction,
    SelectionLocked,
    DateOutOfRange,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErrorKind::CyclicDependency => write!(f, "CyclicDependency"),
            EngineErrorKind::InvalidHoliday => write!(f, "InvalidHoliday"),
            EngineErrorKind::InvalidJurisdiction => write!(f, "InvalidJurisdiction"),
            EngineErrorKind::InvalidReference => write!(f, "InvalidReference"),
            EngineErrorKind::UnknownRuleSet => write!(f, "UnknownRuleSet"),
            EngineErrorKind::UnknownJurisdiction => write!(f, "UnknownJurisdiction"),
            EngineErrorKind::SelectionLocked => write!(f, "SelectionLocked"),
            EngineErrorKind::DateOutOfRange => write!(f, "DateOutOfRange"),
        }
    }
}

/// Structured engine error.
///
/// `implicated` names the rule sets, edges, jurisdictions or holidays that
/// caused the failure so the caller can point an administrator at them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implicated: Vec<String>,
}

impl EngineError {
    fn new(kind: EngineErrorKind, message: impl Into<String>, implicated: Vec<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            implicated,
        }
    }

    pub fn cyclic_dependency(message: impl Into<String>, cycle: Vec<String>) -> Self {
        Self::new(EngineErrorKind::CyclicDependency, message, cycle)
    }

    pub fn invalid_holiday(message: impl Into<String>, holiday: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidHoliday, message, vec![holiday.into()])
    }

    pub fn invalid_jurisdiction(message: impl Into<String>, codes: Vec<String>) -> Self {
        Self::new(EngineErrorKind::InvalidJurisdiction, message, codes)
    }

    pub fn invalid_reference(message: impl Into<String>, implicated: Vec<String>) -> Self {
        Self::new(EngineErrorKind::InvalidReference, message, implicated)
    }

    pub fn unknown_rule_set(id: impl fmt::Display) -> Self {
        Self::new(
            EngineErrorKind::UnknownRuleSet,
            format!("Rule set {} is not in the reference data", id),
            vec![id.to_string()],
        )
    }

    pub fn unknown_jurisdiction(code: impl Into<String>) -> Self {
        let code = code.into();
        Self::new(
            EngineErrorKind::UnknownJurisdiction,
            format!("Jurisdiction '{}' is not in the reference data", code),
            vec![code],
        )
    }

    pub fn selection_locked(message: impl Into<String>, dependents: Vec<String>) -> Self {
        Self::new(EngineErrorKind::SelectionLocked, message, dependents)
    }

    pub fn date_out_of_range(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::DateOutOfRange, message, Vec::new())
    }

    /// Structural errors are configuration defects in the reference data.
    /// They are never recoverable by retrying with different user input.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self.kind,
            EngineErrorKind::SelectionLocked | EngineErrorKind::DateOutOfRange
        )
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.implicated.is_empty() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(
                f,
                "{}: {} [{}]",
                self.kind,
                self.message,
                self.implicated.join(", ")
            )
        }
    }
}

impl std::error::Error for EngineError {}

use serde::{Deserialize, Serialize};

use crate::calendar::{Holiday, ServiceMethodRule};
use crate::compliance::RuleConflict;
use crate::error::EngineError;
use crate::jurisdiction::Jurisdiction;
use crate::rule::{RuleSet, RuleSetDependency, RuleTemplate, RuleTemplateDeadline};

/// Read-only snapshot of everything the engine needs to compute deadlines.
///
/// The caller owns persistence; the engine only reads this.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReferenceData {
    #[serde(default)]
    pub jurisdictions: Vec<Jurisdiction>,
    #[serde(default)]
    pub rule_sets: Vec<RuleSet>,
    #[serde(default)]
    pub dependencies: Vec<RuleSetDependency>,
    #[serde(default)]
    pub templates: Vec<RuleTemplate>,
    #[serde(default)]
    pub template_deadlines: Vec<RuleTemplateDeadline>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub service_rules: Vec<ServiceMethodRule>,
    /// Conflicts declared by administrators.
    #[serde(default)]
    pub conflicts: Vec<RuleConflict>,
}

impl ReferenceData {
    pub fn from_json_str(s: &str) -> Result<Self, EngineError> {
        serde_json::from_str(s).map_err(|e| {
            EngineError::invalid_reference(format!("Malformed reference data: {}", e), Vec::new())
        })
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, EngineError> {
        serde_json::from_value(value).map_err(|e| {
            EngineError::invalid_reference(format!("Malformed reference data: {}", e), Vec::new())
        })
    }
}

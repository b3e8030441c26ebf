use serde::{Deserialize, Serialize};

/// Level of a jurisdiction in the court hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionType {
    Federal,
    State,
    Local,
    Bankruptcy,
    Appellate,
}

impl JurisdictionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federal => "federal",
            Self::State => "state",
            Self::Local => "local",
            Self::Bankruptcy => "bankruptcy",
            Self::Appellate => "appellate",
        }
    }
}

/// A node in the jurisdiction tree (federal -> state -> local).
///
/// `parent_code` links to at most one parent; the chain must terminate at a
/// root without revisiting a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Jurisdiction {
    pub code: String,
    pub name: String,
    pub jurisdiction_type: JurisdictionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Jurisdiction {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        jurisdiction_type: JurisdictionType,
        parent_code: Option<&str>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            jurisdiction_type,
            parent_code: parent_code.map(|p| p.to_string()),
            active: true,
        }
    }
}

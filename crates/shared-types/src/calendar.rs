//! Holiday and service-method reference data.
//!
//! Holidays are stored as recurrence rules rather than concrete dates so a
//! single row covers every calendar year. The engine expands them per
//! (jurisdiction, year).

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::jurisdiction::JurisdictionType;

fn default_true() -> bool {
    true
}

// ─── Holidays ──────────────────────────────────────────────────

/// How a holiday's date is determined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HolidayRule {
    /// Same month/day every year (e.g. July 4).
    Fixed { month: u32, day: u32 },
    /// Nth weekday of a month (e.g. 3rd Monday of January).
    NthWeekday { month: u32, weekday: Weekday, n: u32 },
    /// Last weekday of a month (e.g. last Monday of May).
    LastWeekday { month: u32, weekday: Weekday },
    /// A specific date. When the holiday is recurring, the month/day
    /// repeats in every year.
    Date { date: NaiveDate },
}

/// Which jurisdictions a holiday applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum HolidayScope {
    Jurisdiction { code: String },
    JurisdictionType { jurisdiction_type: JurisdictionType },
}

/// A non-juridical day definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holiday {
    pub name: String,
    pub rule: HolidayRule,
    pub scope: HolidayScope,
    #[serde(default = "default_true")]
    pub recurring: bool,
    /// Shift Saturday to Friday and Sunday to Monday. Only meaningful for
    /// fixed-date holidays.
    #[serde(default = "default_true")]
    pub observe_weekend: bool,
}

impl Holiday {
    pub fn fixed(name: &str, month: u32, day: u32, scope: HolidayScope) -> Self {
        Self {
            name: name.to_string(),
            rule: HolidayRule::Fixed { month, day },
            scope,
            recurring: true,
            observe_weekend: true,
        }
    }

    pub fn nth_weekday(name: &str, month: u32, weekday: Weekday, n: u32, scope: HolidayScope) -> Self {
        Self {
            name: name.to_string(),
            rule: HolidayRule::NthWeekday { month, weekday, n },
            scope,
            recurring: true,
            observe_weekend: false,
        }
    }

    pub fn last_weekday(name: &str, month: u32, weekday: Weekday, scope: HolidayScope) -> Self {
        Self {
            name: name.to_string(),
            rule: HolidayRule::LastWeekday { month, weekday },
            scope,
            recurring: true,
            observe_weekend: false,
        }
    }

    /// A one-off closure (e.g. a court closed for a storm).
    pub fn on_date(name: &str, date: NaiveDate, scope: HolidayScope) -> Self {
        Self {
            name: name.to_string(),
            rule: HolidayRule::Date { date },
            scope,
            recurring: false,
            observe_weekend: false,
        }
    }
}

/// A concrete holiday occurrence after expansion and observance shifting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedHoliday {
    pub date: NaiveDate,
    pub name: String,
}

// ─── Service Method ────────────────────────────────────────────

/// How a document was served.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMethod {
    #[default]
    Electronic,
    Personal,
    Mail,
    CertifiedMail,
    Publication,
    LeavingWithClerk,
    Other,
}

impl ServiceMethod {
    /// Additional days under FRCP 6(d): mail, leaving with the clerk and
    /// other consented means add 3 days.
    pub fn frcp_additional_days(&self) -> i32 {
        match self {
            Self::Electronic | Self::Personal | Self::Publication => 0,
            Self::Mail | Self::CertifiedMail | Self::LeavingWithClerk | Self::Other => 3,
        }
    }

    pub fn all() -> [ServiceMethod; 7] {
        [
            Self::Electronic,
            Self::Personal,
            Self::Mail,
            Self::CertifiedMail,
            Self::Publication,
            Self::LeavingWithClerk,
            Self::Other,
        ]
    }
}

/// Per-jurisdiction extension days for a service method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceMethodRule {
    pub jurisdiction_code: String,
    pub method: ServiceMethod,
    pub additional_days: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

impl ServiceMethodRule {
    pub fn new(jurisdiction_code: &str, method: ServiceMethod, additional_days: i32) -> Self {
        Self {
            jurisdiction_code: jurisdiction_code.to_string(),
            method,
            additional_days,
            citation: None,
        }
    }
}

/// FRCP 6(d) service rules for a federal jurisdiction.
pub fn frcp_service_rules(jurisdiction_code: &str) -> Vec<ServiceMethodRule> {
    ServiceMethod::all()
        .into_iter()
        .map(|method| ServiceMethodRule {
            jurisdiction_code: jurisdiction_code.to_string(),
            method,
            additional_days: method.frcp_additional_days(),
            citation: Some("FRCP 6(d)".to_string()),
        })
        .collect()
}

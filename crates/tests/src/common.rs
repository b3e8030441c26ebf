//! Shared fixtures: a four-jurisdiction tree with federal and Florida rules.
//!
//! ```text
//! US (federal)
//! ├── FLSD (federal district)
//! └── FL (state)
//!     └── FL-DADE (local)
//! ```

use chrono::NaiveDate;
use engine::compliance::holiday_calendar::federal_holidays;
use engine::DeadlineEngine;
use shared_types::*;
use uuid::Uuid;

pub const US: &str = "US";
pub const FLSD: &str = "FLSD";
pub const FL: &str = "FL";
pub const DADE: &str = "FL-DADE";

pub const FRCP: Uuid = Uuid::from_u128(0x100);
pub const SDFL_LOCAL: Uuid = Uuid::from_u128(0x200);
pub const FL_RCP: Uuid = Uuid::from_u128(0x300);
pub const DADE_LOCAL: Uuid = Uuid::from_u128(0x400);

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn jurisdictions() -> Vec<Jurisdiction> {
    vec![
        Jurisdiction::new(US, "United States", JurisdictionType::Federal, None),
        Jurisdiction::new(
            FLSD,
            "Southern District of Florida",
            JurisdictionType::Federal,
            Some(US),
        ),
        Jurisdiction::new(FL, "Florida", JurisdictionType::State, Some(US)),
        Jurisdiction::new(DADE, "Miami-Dade County", JurisdictionType::Local, Some(FL)),
    ]
}

pub fn rule_set(id: Uuid, code: &str, jurisdiction_code: &str, court_type: &str) -> RuleSet {
    RuleSet {
        id,
        code: code.to_string(),
        name: format!("{} rules", code),
        jurisdiction_code: jurisdiction_code.to_string(),
        court_type: court_type.to_string(),
        version: "2024".to_string(),
        effective_date: date(2020, 1, 1),
        is_local: false,
        active: true,
    }
}

pub fn dependency(from: Uuid, to: Uuid, kind: DependencyKind, priority: i32) -> RuleSetDependency {
    RuleSetDependency {
        rule_set_id: from,
        required_rule_set_id: to,
        kind,
        priority,
    }
}

pub fn template(id: Uuid, rule_set_id: Uuid, trigger_type: TriggerType, name: &str) -> RuleTemplate {
    RuleTemplate {
        id,
        rule_set_id,
        trigger_type,
        name: name.to_string(),
        citation: format!("{} citation", name),
        case_types: vec![],
        active: true,
    }
}

pub fn deadline(id: Uuid, template_id: Uuid, name: &str, day_offset: i32) -> RuleTemplateDeadline {
    RuleTemplateDeadline {
        id,
        template_id,
        name: name.to_string(),
        day_offset,
        priority: DeadlinePriority::Standard,
        counting_method: CountingMethod::CalendarDays,
        add_service_days: false,
        party_responsible: "Defendant".to_string(),
        action_required: format!("File {}", name.to_lowercase()),
        notes: None,
    }
}

/// Federal holidays, Florida's own state holiday, FRCP 6(d) service rules
/// and Florida's five-day mail extension.
pub fn base_reference() -> ReferenceData {
    let mut holidays = federal_holidays();
    holidays.push(Holiday::fixed(
        "Pascua Florida Day",
        4,
        2,
        HolidayScope::Jurisdiction {
            code: FL.to_string(),
        },
    ));

    let mut service_rules = frcp_service_rules(US);
    service_rules.push(ServiceMethodRule::new(FL, ServiceMethod::Mail, 5));
    service_rules.push(ServiceMethodRule::new(FL, ServiceMethod::CertifiedMail, 5));

    let mut dade_local = rule_set(DADE_LOCAL, "DADE-LOCAL", DADE, "circuit");
    dade_local.is_local = true;
    let mut sdfl_local = rule_set(SDFL_LOCAL, "SDFL-LOCAL", FLSD, "district");
    sdfl_local.is_local = true;

    ReferenceData {
        jurisdictions: jurisdictions(),
        rule_sets: vec![
            rule_set(FRCP, "FRCP", US, "district"),
            sdfl_local,
            rule_set(FL_RCP, "FL-RCP", FL, "circuit"),
            dade_local,
        ],
        dependencies: vec![
            dependency(SDFL_LOCAL, FRCP, DependencyKind::Supplements, 0),
            dependency(DADE_LOCAL, FL_RCP, DependencyKind::Supplements, 10),
        ],
        holidays,
        service_rules,
        ..Default::default()
    }
}

pub fn build_engine(reference: ReferenceData) -> DeadlineEngine {
    DeadlineEngine::new(reference, EngineConfig::default()).unwrap()
}

pub fn build_engine_with(reference: ReferenceData, config: EngineConfig) -> DeadlineEngine {
    DeadlineEngine::new(reference, config).unwrap()
}

pub fn input(code: &str, trigger: NaiveDate, days: i32, method: CountingMethod) -> CalculationInput {
    CalculationInput {
        jurisdiction_code: code.to_string(),
        trigger_date: trigger,
        day_count: days,
        counting_method: method,
        service_method: None,
    }
}

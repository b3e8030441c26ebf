//! Conflict detection between rule sets and strategy resolution

use crate::common::*;
use pretty_assertions::assert_eq;
use shared_types::*;
use uuid::Uuid;

const FED_TEMPLATE: Uuid = Uuid::from_u128(0x1001);
const FL_TEMPLATE: Uuid = Uuid::from_u128(0x1002);
const DADE_TEMPLATE: Uuid = Uuid::from_u128(0x1003);
const FED_ANSWER: Uuid = Uuid::from_u128(0x2001);
const FL_ANSWER: Uuid = Uuid::from_u128(0x2002);
const DADE_ANSWER: Uuid = Uuid::from_u128(0x2003);

fn answer(id: Uuid, template_id: Uuid, days: i32) -> RuleTemplateDeadline {
    let mut d = deadline(id, template_id, "Answer Due", days);
    d.priority = DeadlinePriority::Critical;
    d.add_service_days = true;
    d
}

/// FRCP and FL-RCP each define "Answer Due" on complaint service.
fn answer_reference(fed_days: i32, fl_days: i32) -> ReferenceData {
    let mut reference = base_reference();
    reference.templates = vec![
        template(FED_TEMPLATE, FRCP, TriggerType::ComplaintServed, "Answer"),
        template(FL_TEMPLATE, FL_RCP, TriggerType::ComplaintServed, "Answer"),
    ];
    reference.template_deadlines = vec![
        answer(FED_ANSWER, FED_TEMPLATE, fed_days),
        answer(FL_ANSWER, FL_TEMPLATE, fl_days),
    ];
    reference
}

fn with_dade_answer(mut reference: ReferenceData, days: i32) -> ReferenceData {
    reference
        .templates
        .push(template(DADE_TEMPLATE, DADE_LOCAL, TriggerType::ComplaintServed, "Answer"));
    reference
        .template_deadlines
        .push(answer(DADE_ANSWER, DADE_TEMPLATE, days));
    reference
}

fn request(selected: Vec<Uuid>) -> ProjectionRequest {
    ProjectionRequest {
        trigger_type: TriggerType::ComplaintServed,
        // Wednesday
        trigger_date: date(2025, 3, 5),
        selected_rule_sets: selected,
        service_method: None,
        case_type: None,
    }
}

fn strategy(default_strategy: ResolutionStrategy) -> EngineConfig {
    EngineConfig {
        default_strategy,
        ..EngineConfig::default()
    }
}

fn winner(conflict: &RuleConflict) -> Option<(Uuid, ResolutionStrategy)> {
    match &conflict.resolution {
        ConflictResolution::Resolved {
            winner_rule_set_id,
            applied_strategy,
            ..
        } => Some((*winner_rule_set_id, *applied_strategy)),
        ConflictResolution::Unresolved { .. } => None,
    }
}

#[test]
fn local_prevails_by_default() {
    let engine = build_engine(answer_reference(21, 20));
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();

    assert_eq!(projection.conflicts.len(), 1);
    let conflict = &projection.conflicts[0];
    assert_eq!(conflict.origin, ConflictOrigin::Detected);
    assert_eq!(conflict.id, None);
    assert_eq!(conflict.conflict_type, ConflictType::DayOffset);
    assert_eq!(conflict.deadline_name.as_deref(), Some("Answer Due"));
    assert_eq!(conflict.candidates.len(), 2);
    assert_eq!(
        winner(conflict),
        Some((FL_RCP, ResolutionStrategy::LocalPrevails))
    );

    assert_eq!(projection.deadlines.len(), 1);
    let answer = projection.deadline("Answer Due").unwrap();
    assert_eq!(answer.rule_set_id, FL_RCP);
    assert_eq!(answer.deadline_date, date(2025, 3, 25));
    assert!(answer.conflict_note.as_deref().unwrap().contains("local_prevails"));
}

#[test]
fn candidates_carry_projected_dates() {
    let engine = build_engine(answer_reference(21, 20));
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    let conflict = &projection.conflicts[0];
    // Most specific jurisdiction first
    assert_eq!(conflict.candidates[0].rule_set_id, FL_RCP);
    assert_eq!(conflict.candidates[0].jurisdiction_depth, 1);
    assert_eq!(conflict.candidates[0].projected_date, Some(date(2025, 3, 25)));
    assert_eq!(conflict.candidates[1].rule_set_id, FRCP);
    assert_eq!(conflict.candidates[1].projected_date, Some(date(2025, 3, 26)));
    assert!(conflict.description.contains("FL-RCP"));
    assert!(conflict.description.contains("FRCP"));
}

#[test]
fn federal_prevails_picks_root() {
    let engine = build_engine_with(
        answer_reference(21, 20),
        strategy(ResolutionStrategy::FederalPrevails),
    );
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    assert_eq!(
        winner(&projection.conflicts[0]),
        Some((FRCP, ResolutionStrategy::FederalPrevails))
    );
    assert_eq!(
        projection.deadline("Answer Due").unwrap().deadline_date,
        date(2025, 3, 26)
    );
}

#[test]
fn strictest_picks_earliest_date() {
    // DADE-LOCAL gives 30 days, FL-RCP 20
    let reference = with_dade_answer(answer_reference(21, 20), 30);
    let local = build_engine(reference.clone());
    let strict = build_engine_with(reference, strategy(ResolutionStrategy::Strictest));

    let local_projection = local.project(&request(vec![DADE_LOCAL])).unwrap();
    let strict_projection = strict.project(&request(vec![DADE_LOCAL])).unwrap();

    assert_eq!(
        local_projection.deadline("Answer Due").unwrap().deadline_date,
        date(2025, 4, 4)
    );
    assert_eq!(
        winner(&strict_projection.conflicts[0]),
        Some((FL_RCP, ResolutionStrategy::Strictest))
    );
    assert_eq!(
        strict_projection.deadline("Answer Due").unwrap().deadline_date,
        date(2025, 3, 25)
    );
}

#[test]
fn strictest_tie_falls_back_to_local() {
    // Mon Mar 3 + 20 = Sun Mar 23 -> Mar 24; Mar 3 + 21 = Mar 24
    let engine = build_engine_with(
        answer_reference(21, 20),
        strategy(ResolutionStrategy::Strictest),
    );
    let mut req = request(vec![FRCP, FL_RCP]);
    req.trigger_date = date(2025, 3, 3);
    let projection = engine.project(&req).unwrap();
    assert_eq!(
        winner(&projection.conflicts[0]),
        Some((FL_RCP, ResolutionStrategy::LocalPrevails))
    );
}

#[test]
fn strictest_tie_broken_by_dependency_priority() {
    // FL-RCP is reached from DADE-LOCAL through a priority-10 edge
    let mut reference = answer_reference(21, 20);
    reference
        .dependencies
        .push(dependency(DADE_LOCAL, FRCP, DependencyKind::Concurrent, 1));
    let engine = build_engine_with(reference, strategy(ResolutionStrategy::Strictest));
    let mut req = request(vec![DADE_LOCAL]);
    req.trigger_date = date(2025, 3, 3);
    let projection = engine.project(&req).unwrap();
    assert_eq!(
        winner(&projection.conflicts[0]),
        Some((FL_RCP, ResolutionStrategy::Strictest))
    );
}

#[test]
fn same_depth_ambiguity_falls_through_to_strictest() {
    let fl_alt = id(0x310);
    let mut reference = answer_reference(21, 20);
    reference
        .rule_sets
        .push(rule_set(fl_alt, "FL-ALT", FL, "circuit"));
    reference
        .templates
        .push(template(id(0x1010), fl_alt, TriggerType::ComplaintServed, "Answer"));
    reference
        .template_deadlines
        .push(answer(id(0x2010), id(0x1010), 14));
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FL_RCP, fl_alt])).unwrap();
    assert_eq!(
        winner(&projection.conflicts[0]),
        Some((fl_alt, ResolutionStrategy::Strictest))
    );
    assert_eq!(
        projection.deadline("Answer Due").unwrap().deadline_date,
        date(2025, 3, 19)
    );
}

#[test]
fn user_choice_leaves_conflict_open() {
    let engine = build_engine_with(
        answer_reference(21, 20),
        strategy(ResolutionStrategy::UserChoice),
    );
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    let conflict = &projection.conflicts[0];
    assert!(!conflict.is_resolved());
    assert!(!conflict.auto_resolve);
    assert!(projection.deadline("Answer Due").is_none());
    assert!(projection.has_unresolved_conflicts());
    assert!(projection.warnings.iter().any(|w| w.contains("unresolved")));
}

#[test]
fn declared_manual_conflict_blocks_deadline() {
    let mut reference = answer_reference(21, 20);
    reference.conflicts.push(RuleConflict {
        id: Some(id(0xC1)),
        origin: ConflictOrigin::Declared,
        rule_set_a: FRCP,
        rule_set_b: FL_RCP,
        trigger_type: Some(TriggerType::ComplaintServed),
        deadline_name: Some("answer due".to_string()),
        conflict_type: ConflictType::Declared,
        description: "Removal cases follow FRCP 81(c)".to_string(),
        strategy: ResolutionStrategy::Manual,
        auto_resolve: false,
        manual_notes: Some("Ask the clerk".to_string()),
        candidates: vec![],
        resolution: ConflictResolution::default(),
    });
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();

    assert_eq!(projection.conflicts.len(), 1);
    let conflict = &projection.conflicts[0];
    assert_eq!(conflict.id, Some(id(0xC1)));
    assert_eq!(conflict.origin, ConflictOrigin::Detected);
    assert_eq!(conflict.candidates.len(), 2);
    assert_eq!(conflict.manual_notes.as_deref(), Some("Ask the clerk"));
    assert!(conflict.description.contains("FRCP 81(c)"));
    assert!(!conflict.is_resolved());
    assert!(projection.deadlines.is_empty());
}

fn answer_declaration(name: &str, strategy: ResolutionStrategy, auto_resolve: bool) -> RuleConflict {
    RuleConflict {
        id: Some(id(0xC3)),
        origin: ConflictOrigin::Declared,
        rule_set_a: FRCP,
        rule_set_b: FL_RCP,
        trigger_type: Some(TriggerType::ComplaintServed),
        deadline_name: Some(name.to_string()),
        conflict_type: ConflictType::Declared,
        description: "Clerk review required".to_string(),
        strategy,
        auto_resolve,
        manual_notes: None,
        candidates: vec![],
        resolution: ConflictResolution::default(),
    }
}

#[test]
fn declared_manual_conflict_holds_identical_definitions() {
    let mut reference = answer_reference(21, 21);
    reference
        .conflicts
        .push(answer_declaration("Answer Due", ResolutionStrategy::Manual, false));
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();

    assert!(projection.deadlines.is_empty());
    assert_eq!(projection.conflicts.len(), 1);
    let conflict = &projection.conflicts[0];
    assert_eq!(conflict.id, Some(id(0xC3)));
    assert_eq!(conflict.conflict_type, ConflictType::Declared);
    assert_eq!(conflict.candidates.len(), 2);
    assert!(conflict.description.contains("identically"));
    assert!(!conflict.is_resolved());
    assert!(projection.warnings.iter().any(|w| w.contains("1 unresolved")));
}

#[test]
fn declared_auto_conflict_on_identical_definitions_merges() {
    let mut reference = answer_reference(21, 21);
    reference.conflicts.push(answer_declaration(
        "Answer Due",
        ResolutionStrategy::FederalPrevails,
        true,
    ));
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    assert!(projection.conflicts.is_empty());
    assert!(projection.deadline("Answer Due").is_some());
    assert!(!projection.has_unresolved_conflicts());
}

#[test]
fn unmatched_declarations_pass_through_only_when_manual() {
    let mut reference = answer_reference(21, 20);
    reference.conflicts.push(answer_declaration(
        "Reply Due",
        ResolutionStrategy::Strictest,
        true,
    ));
    let engine = build_engine(reference.clone());
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    // Only the detected Answer Due conflict, resolved for the local rule set
    assert_eq!(projection.conflicts.len(), 1);
    assert!(projection.conflicts[0].is_resolved());
    assert!(!projection.warnings.iter().any(|w| w.contains("unresolved")));

    reference.conflicts[0].auto_resolve = false;
    reference.conflicts[0].strategy = ResolutionStrategy::Manual;
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    assert_eq!(projection.conflicts.len(), 2);
    let pending = projection
        .conflicts
        .iter()
        .find(|c| c.origin == ConflictOrigin::Declared)
        .unwrap();
    assert_eq!(pending.deadline_name.as_deref(), Some("Reply Due"));
    assert!(!pending.is_resolved());
    assert!(projection.deadline("Answer Due").is_some());
}

#[test]
fn declared_auto_resolving_conflict_uses_its_strategy() {
    let mut reference = answer_reference(21, 20);
    reference.conflicts.push(RuleConflict {
        id: Some(id(0xC2)),
        origin: ConflictOrigin::Declared,
        rule_set_a: FL_RCP,
        rule_set_b: FRCP,
        trigger_type: None,
        deadline_name: None,
        conflict_type: ConflictType::Declared,
        description: "Federal court sits in Florida".to_string(),
        strategy: ResolutionStrategy::FederalPrevails,
        auto_resolve: true,
        manual_notes: None,
        candidates: vec![],
        resolution: ConflictResolution::default(),
    });
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    assert_eq!(
        winner(&projection.conflicts[0]),
        Some((FRCP, ResolutionStrategy::FederalPrevails))
    );
    assert_eq!(projection.conflicts[0].id, Some(id(0xC2)));
}

#[test]
fn overrides_edge_beats_strategy() {
    let mut reference = answer_reference(21, 20);
    reference
        .dependencies
        .push(dependency(FL_RCP, FRCP, DependencyKind::Overrides, 0));
    let engine = build_engine_with(reference, strategy(ResolutionStrategy::FederalPrevails));
    let projection = engine.project(&request(vec![FL_RCP])).unwrap();
    let conflict = &projection.conflicts[0];
    assert_eq!(winner(conflict).map(|w| w.0), Some(FL_RCP));
    match &conflict.resolution {
        ConflictResolution::Resolved { reason, .. } => assert!(reason.contains("overrides")),
        other => panic!("expected resolved, got {:?}", other),
    }
}

#[test]
fn identical_definitions_merge_without_conflict() {
    let engine = build_engine(answer_reference(21, 21));
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    assert!(projection.conflicts.is_empty());
    assert_eq!(projection.deadlines.len(), 1);
    let answer = &projection.deadlines[0];
    assert_eq!(answer.rule_set_id, FL_RCP);
    assert!(answer.conflict_note.as_deref().unwrap().contains("FRCP"));
}

#[test]
fn names_match_ignoring_case_and_whitespace() {
    let mut reference = answer_reference(21, 20);
    reference.template_deadlines[1].name = "  ANSWER due ".to_string();
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    assert_eq!(projection.conflicts.len(), 1);
    assert_eq!(projection.deadlines.len(), 1);
}

#[test]
fn different_names_do_not_conflict() {
    let mut reference = answer_reference(21, 20);
    reference.template_deadlines[1].name = "Responsive Pleading Due".to_string();
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    assert!(projection.conflicts.is_empty());
    assert_eq!(projection.deadlines.len(), 2);
}

#[test]
fn classification_by_differing_field() {
    for expected in [
        ConflictType::Priority,
        ConflictType::CountingMethod,
        ConflictType::Multiple,
    ] {
        let mut reference = answer_reference(21, 21);
        let fl = &mut reference.template_deadlines[1];
        match expected {
            ConflictType::Priority => fl.priority = DeadlinePriority::Fatal,
            ConflictType::CountingMethod => fl.counting_method = CountingMethod::CourtDays,
            _ => {
                fl.day_offset = 30;
                fl.priority = DeadlinePriority::Fatal;
            }
        }
        let engine = build_engine(reference);
        let projection = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
        assert_eq!(projection.conflicts[0].conflict_type, expected);
    }
}

#[test]
fn same_rule_set_duplicates_are_not_conflicts() {
    let mut reference = answer_reference(21, 20);
    reference
        .template_deadlines
        .push(answer(id(0x2099), FL_TEMPLATE, 10));
    let engine = build_engine(reference);
    let projection = engine.project(&request(vec![FL_RCP])).unwrap();
    assert!(projection.conflicts.is_empty());
    assert_eq!(projection.deadlines.len(), 2);
}

#[test]
fn conflicts_are_recomputed_per_selection() {
    let engine = build_engine(answer_reference(21, 20));
    let both = engine.project(&request(vec![FRCP, FL_RCP])).unwrap();
    let one = engine.project(&request(vec![FL_RCP])).unwrap();
    assert_eq!(both.conflicts.len(), 1);
    assert!(one.conflicts.is_empty());
    assert_eq!(one.deadlines.len(), 1);
}

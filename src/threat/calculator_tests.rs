use std::sync::Arc;

use crate::actor::ActorRef;
use crate::config::{prepare_threat_config, AuraModifier, FormulaResult, PreparedConfig, ThreatConfig};
use crate::event::{EventKind, LogEvent};
use crate::fight::FightState;
use crate::game_data::school;
use crate::testutil::{
    buff, damage, std_actors, std_config, std_enemies, std_friendly, BOSS, DEFENSIVE_STANCE,
    FIXATE_SPELL, INVULN_SPELL, PRIEST, TANK, WARRIOR,
};
use crate::threat::{
    calculate_threat, Interceptor, InterceptorAction, InterceptorCtx, InterceptorTracker,
    MarkerKind, StateKind, StatePhase, ThreatEffect,
};

fn prepared() -> Arc<PreparedConfig> {
    prepare_threat_config(&std_config())
}

fn make_state() -> FightState {
    FightState::new(std_actors(), std_friendly(), std_enemies(), hashbrown::HashMap::new())
}

fn calc(
    event: &LogEvent,
    state: &mut FightState,
    config: &PreparedConfig,
    interceptors: &mut InterceptorTracker,
) -> crate::threat::CalculationOutcome {
    calculate_threat(event, state, config, interceptors, Vec::new(), None)
}

#[test]
fn damage_applies_class_and_stance_multipliers() {
    let config = prepared();
    let mut state = make_state();
    state.set_aura(WARRIOR, DEFENSIVE_STANCE, &config);
    let mut interceptors = InterceptorTracker::new();

    let event = damage(1000, WARRIOR, BOSS, 11567, 1000);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);

    let calc = &outcome.calculation;
    assert_eq!(calc.formula, "2 * damage");
    assert_eq!(calc.amount, 1000.0);
    assert_eq!(calc.base_threat, 2000.0);
    assert!((calc.modified_threat - 3380.0).abs() < 1e-9);
    let labels: Vec<&str> = calc.modifiers.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, vec!["Warrior", "Defensive Stance"]);
    assert_eq!(outcome.recipient, WARRIOR);
}

#[test]
fn boss_melee_marker_short_circuits() {
    let config = prepared();
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();

    let event = damage(1000, BOSS, WARRIOR, 1, 500);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);

    assert_eq!(outcome.calculation.formula, "0 (boss melee marker)");
    assert_eq!(outcome.calculation.modified_threat, 0.0);
    assert!(outcome
        .calculation
        .effects
        .iter()
        .any(|e| matches!(e, ThreatEffect::EventMarker { marker: MarkerKind::BossMelee })));
}

#[test]
fn melee_between_friendlies_is_not_a_marker() {
    let config = prepared();
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();

    // Friendly source swinging at the boss goes through the base formula
    let event = damage(1000, WARRIOR, BOSS, 1, 100);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);
    assert_eq!(outcome.calculation.formula, "2 * damage");
}

#[test]
fn skip_interceptor_suppresses_the_event() {
    let config = prepared();
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();
    interceptors.install(
        Interceptor::new(|_: &LogEvent, _: &mut InterceptorCtx<'_>| InterceptorAction::Skip),
        0,
    );

    let event = damage(1000, WARRIOR, BOSS, 11567, 1000);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);
    assert_eq!(outcome.calculation.formula, "0 (suppressed by effect)");
    assert_eq!(outcome.calculation.modified_threat, 0.0);
}

#[test]
fn augment_overrides_the_recipient() {
    let config = prepared();
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();
    interceptors.install(
        Interceptor::new(|_: &LogEvent, _: &mut InterceptorCtx<'_>| InterceptorAction::Augment {
            threat_recipient_override: Some(TANK),
            effects: Vec::new(),
        }),
        0,
    );

    let event = damage(1000, WARRIOR, BOSS, 11567, 1000);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);
    assert_eq!(outcome.recipient, TANK);
}

#[test]
fn resource_events_skip_player_multipliers_by_default() {
    let config = prepared();
    let mut state = make_state();
    state.set_aura(WARRIOR, DEFENSIVE_STANCE, &config);
    let mut interceptors = InterceptorTracker::new();

    let event = LogEvent {
        kind: EventKind::Energize,
        timestamp: 1000,
        source_id: WARRIOR,
        target_id: WARRIOR,
        ability_game_id: Some(29131),
        resource_change: Some(20),
        waste: Some(5),
        ..Default::default()
    };
    let outcome = calc(&event, &mut state, &config, &mut interceptors);

    assert_eq!(outcome.calculation.amount, 15.0);
    assert_eq!(outcome.calculation.base_threat, 7.5);
    assert_eq!(outcome.calculation.modified_threat, 7.5);
    assert!(outcome.calculation.modifiers.is_empty());
    assert!(outcome.calculation.is_split);
}

#[test]
fn ability_formula_none_means_no_threat_and_no_fallback() {
    let config = Arc::new(
        ThreatConfig::new(crate::config::BaseFormulas {
            damage: crate::config::scaled("2 * damage", 2.0),
            ..Default::default()
        })
        .with_ability(11567, Arc::new(|_ctx| None)),
    );
    let prepared = prepare_threat_config(&config);
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();

    let event = damage(1000, WARRIOR, BOSS, 11567, 1000);
    let outcome = calculate_threat(&event, &mut state, &prepared, &mut interceptors, Vec::new(), None);
    assert_eq!(outcome.calculation.formula, "0 (no threat)");
    assert_eq!(outcome.calculation.modified_threat, 0.0);
}

#[test]
fn aura_modifier_scoping_by_spell_and_school() {
    let mut config = ThreatConfig::new(crate::config::BaseFormulas {
        damage: crate::config::scaled("damage", 1.0),
        ..Default::default()
    });
    config
        .aura_modifiers
        .insert(100, AuraModifier::new("Scoped to 11567", 2.0).for_spells(vec![11567]));
    config
        .aura_modifiers
        .insert(101, AuraModifier::new("Fire only", 3.0).for_schools(school::FIRE));
    let config = Arc::new(config);
    let prepared = prepare_threat_config(&config);

    let mut state = FightState::new(
        std_actors(),
        std_friendly(),
        std_enemies(),
        [(11567u32, school::PHYSICAL), (20423u32, school::FIRE)].into_iter().collect(),
    );
    state.set_aura(PRIEST, 100, &prepared);
    state.set_aura(PRIEST, 101, &prepared);
    let mut interceptors = InterceptorTracker::new();

    // Physical ability: only the spell-scoped modifier applies
    let outcome = calculate_threat(
        &damage(1000, PRIEST, BOSS, 11567, 100),
        &mut state,
        &prepared,
        &mut interceptors,
        Vec::new(),
        None,
    );
    let labels: Vec<&str> =
        outcome.calculation.modifiers.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, vec!["Scoped to 11567"]);
    assert_eq!(outcome.calculation.modified_threat, 200.0);

    // Fire ability: only the school-scoped modifier applies
    let outcome = calculate_threat(
        &damage(2000, PRIEST, BOSS, 20423, 100),
        &mut state,
        &prepared,
        &mut interceptors,
        Vec::new(),
        None,
    );
    let labels: Vec<&str> =
        outcome.calculation.modifiers.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, vec!["Fire only"]);
    assert_eq!(outcome.calculation.modified_threat, 300.0);
}

#[test]
fn formula_spell_modifier_applies_without_player_multipliers() {
    let config = Arc::new(ThreatConfig::default().with_ability(
        18562,
        Arc::new(|ctx| {
            Some(
                FormulaResult::new("heal", ctx.amount)
                    .with_player_multipliers(false)
                    .with_spell_modifier("Tranquility", 0.5),
            )
        }),
    ));
    let prepared = prepare_threat_config(&config);
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();

    let event = crate::testutil::heal(1000, PRIEST, WARRIOR, 18562, 400, 0);
    let outcome = calculate_threat(&event, &mut state, &prepared, &mut interceptors, Vec::new(), None);
    assert_eq!(outcome.calculation.modified_threat, 200.0);
    assert_eq!(outcome.calculation.modifiers.len(), 1);
}

#[test]
fn fixate_debuff_on_enemy_attributes_to_the_caster() {
    let config = prepared();
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();

    let event = buff(EventKind::ApplyDebuff, 1000, TANK, BOSS, FIXATE_SPELL);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);
    let state_effect = outcome
        .calculation
        .effects
        .iter()
        .find_map(|e| match e {
            ThreatEffect::State { kind, phase, actor_id, target_id, .. } => {
                Some((*kind, *phase, *actor_id, *target_id))
            }
            _ => None,
        })
        .expect("fixate state emitted");
    assert_eq!(state_effect, (StateKind::Fixate, StatePhase::Start, TANK, Some(BOSS)));
}

#[test]
fn invulnerability_buff_on_friendly_attributes_to_the_target() {
    let config = prepared();
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();

    let apply = buff(EventKind::ApplyBuff, 1000, PRIEST, PRIEST, INVULN_SPELL);
    let outcome = calc(&apply, &mut state, &config, &mut interceptors);
    assert!(outcome.calculation.effects.iter().any(|e| matches!(
        e,
        ThreatEffect::State {
            kind: StateKind::Invulnerable,
            phase: StatePhase::Start,
            actor_id: PRIEST,
            ..
        }
    )));

    let remove = buff(EventKind::RemoveBuff, 5000, PRIEST, PRIEST, INVULN_SPELL);
    let outcome = calc(&remove, &mut state, &config, &mut interceptors);
    assert!(outcome.calculation.effects.iter().any(|e| matches!(
        e,
        ThreatEffect::State { phase: StatePhase::End, .. }
    )));
}

#[test]
fn interceptor_aura_edits_are_visible_same_event() {
    let config = prepared();
    let mut state = make_state();
    let mut interceptors = InterceptorTracker::new();
    interceptors.install(
        Interceptor::new(|_: &LogEvent, ctx: &mut InterceptorCtx<'_>| {
            ctx.set_aura(WARRIOR, DEFENSIVE_STANCE);
            ctx.uninstall();
            InterceptorAction::Passthrough
        }),
        0,
    );

    let event = damage(1000, WARRIOR, BOSS, 11567, 1000);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);
    // Stance applied by the interceptor multiplies this same event
    assert!((outcome.calculation.modified_threat - 3380.0).abs() < 1e-9);
    assert!(state.has_aura(WARRIOR, DEFENSIVE_STANCE));
}

#[test]
fn dead_source_still_gets_a_calculation() {
    let config = prepared();
    let mut state = make_state();
    state.process_event(&crate::testutil::death(500, WARRIOR, true), &config);
    let mut interceptors = InterceptorTracker::new();

    // The calculator is indifferent to liveness; the applier suppresses
    let event = damage(1000, WARRIOR, BOSS, 11567, 100);
    let outcome = calc(&event, &mut state, &config, &mut interceptors);
    assert_eq!(outcome.calculation.base_threat, 200.0);
    assert!(!state.is_actor_alive(ActorRef::new(WARRIOR, 0)));
}

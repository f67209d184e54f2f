use std::collections::BTreeMap;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::actor::ActorId;
use crate::config::{prepare_threat_config, ThreatConfig};
use crate::event::{EventKind, LogEvent};
use crate::fight::FightState;
use crate::game_data::{TRANQUIL_AIR_BUFF, TRANQUIL_AIR_TOTEM};
use crate::processors::namespace::Namespace;
use crate::processors::party::{PartyGroups, PARTY_GROUPS};
use crate::processors::{Processor, ProcessorContext};
use crate::testutil::{std_actors, std_friendly, HUNTER, PET, PRIEST, SHAMAN, WARRIOR};
use crate::threat::{AuraAction, ThreatEffect};

use super::TranquilAir;

fn make_processor() -> Box<dyn Processor> {
    let actors = std_actors();
    let friendly = std_friendly();
    let ctx = ProcessorContext {
        report: None,
        fight: None,
        infer_threat_reduction: true,
        tank_actor_ids: None,
        actors: &actors,
        friendly_actor_ids: &friendly,
    };
    TranquilAir::factory(&ctx).expect("infer flag is on")
}

fn ns_with_party(members: &[ActorId]) -> Namespace {
    let mut groups = PartyGroups::default();
    let mut list = Vec::new();
    for &member in members {
        groups.actor_group_by_id.insert(member, 0);
        list.push(member);
    }
    groups.members_by_group_id = BTreeMap::from([(0u32, list)]);
    let mut ns = Namespace::new();
    ns.insert(PARTY_GROUPS, groups);
    ns
}

fn state_with_positions(positions: &[(ActorId, f64, f64)]) -> FightState {
    let config = prepare_threat_config(&Arc::new(ThreatConfig::default()));
    let mut state = FightState::new(std_actors(), std_friendly(), Vec::new(), HashMap::new());
    for &(actor, x, y) in positions {
        let event = LogEvent {
            kind: EventKind::Cast,
            timestamp: 0,
            source_id: actor,
            target_id: actor,
            x: Some(x),
            y: Some(y),
            ..Default::default()
        };
        state.process_event(&event, &config);
    }
    state
}

fn totem_cast(ts: i64, shaman: ActorId, x: f64, y: f64) -> LogEvent {
    LogEvent {
        kind: EventKind::Cast,
        timestamp: ts,
        source_id: shaman,
        target_id: shaman,
        ability_game_id: Some(TRANQUIL_AIR_TOTEM),
        x: Some(x),
        y: Some(y),
        ..Default::default()
    }
}

fn totem_summon(ts: i64, shaman: ActorId) -> LogEvent {
    LogEvent {
        kind: EventKind::Summon,
        timestamp: ts,
        source_id: shaman,
        target_id: 900,
        ability_game_id: Some(TRANQUIL_AIR_TOTEM),
        ..Default::default()
    }
}

fn mutations(effects: &[ThreatEffect]) -> Vec<(AuraAction, Vec<ActorId>)> {
    effects
        .iter()
        .filter_map(|e| match e {
            ThreatEffect::AuraMutation { action, spell_id, actor_ids }
                if *spell_id == TRANQUIL_AIR_BUFF =>
            {
                Some((*action, actor_ids.clone()))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn members_in_range_receive_the_buff() {
    let mut processor = make_processor();
    let mut ns = ns_with_party(&[SHAMAN, WARRIOR, PRIEST]);
    // Warrior 10 yards out, priest 50 yards out
    let state = state_with_positions(&[
        (SHAMAN, 0.0, 0.0),
        (WARRIOR, 2000.0, 0.0),
        (PRIEST, 10000.0, 0.0),
    ]);

    let mut effects = Vec::new();
    processor.before_fight_state(&totem_cast(1000, SHAMAN, 0.0, 0.0), &state, &mut ns, &mut effects);
    assert!(effects.is_empty());

    processor.before_fight_state(&totem_summon(1500, SHAMAN), &state, &mut ns, &mut effects);
    assert_eq!(mutations(&effects), vec![(AuraAction::Apply, vec![WARRIOR, SHAMAN])]);
}

#[test]
fn stale_cast_position_falls_back_to_shaman() {
    let mut processor = make_processor();
    let mut ns = ns_with_party(&[SHAMAN, WARRIOR]);
    let state = state_with_positions(&[(SHAMAN, 10000.0, 0.0), (WARRIOR, 10000.0, 400.0)]);

    let mut effects = Vec::new();
    // Cast recorded far away, but 3 seconds before the summon
    processor.before_fight_state(&totem_cast(1000, SHAMAN, 0.0, 0.0), &state, &mut ns, &mut effects);
    processor.before_fight_state(&totem_summon(4000, SHAMAN), &state, &mut ns, &mut effects);

    // Resolved from the shaman's position, so the nearby warrior is in
    assert_eq!(mutations(&effects), vec![(AuraAction::Apply, vec![WARRIOR, SHAMAN])]);
}

#[test]
fn replanting_diffs_recipients() {
    let mut processor = make_processor();
    let mut ns = ns_with_party(&[SHAMAN, WARRIOR, PRIEST]);
    let state = state_with_positions(&[
        (SHAMAN, 0.0, 0.0),
        (WARRIOR, 2000.0, 0.0),
        (PRIEST, 40000.0, 0.0),
    ]);

    let mut effects = Vec::new();
    processor.before_fight_state(&totem_cast(1000, SHAMAN, 0.0, 0.0), &state, &mut ns, &mut effects);
    processor.before_fight_state(&totem_summon(1100, SHAMAN), &state, &mut ns, &mut effects);
    effects.clear();

    // Replant near the priest: warrior and shaman drop out, priest enters
    processor.before_fight_state(&totem_cast(9000, SHAMAN, 40000.0, 0.0), &state, &mut ns, &mut effects);
    processor.before_fight_state(&totem_summon(9100, SHAMAN), &state, &mut ns, &mut effects);

    assert_eq!(
        mutations(&effects),
        vec![
            (AuraAction::Remove, vec![WARRIOR, SHAMAN]),
            (AuraAction::Apply, vec![PRIEST]),
        ]
    );
}

#[test]
fn overlapping_totems_do_not_double_toggle() {
    let mut processor = make_processor();
    // Both shamans share a party with the warrior
    let mut ns = ns_with_party(&[SHAMAN, PRIEST, WARRIOR]);
    let state = state_with_positions(&[
        (SHAMAN, 0.0, 0.0),
        (PRIEST, 0.0, 100.0),
        (WARRIOR, 1000.0, 0.0),
    ]);

    let mut effects = Vec::new();
    processor.before_fight_state(&totem_cast(1000, SHAMAN, 0.0, 0.0), &state, &mut ns, &mut effects);
    processor.before_fight_state(&totem_summon(1100, SHAMAN), &state, &mut ns, &mut effects);
    effects.clear();

    // Second source drops a totem covering the same actors: no re-apply
    processor.before_fight_state(&totem_cast(2000, PRIEST, 0.0, 0.0), &state, &mut ns, &mut effects);
    processor.before_fight_state(&totem_summon(2100, PRIEST), &state, &mut ns, &mut effects);
    assert!(mutations(&effects).is_empty());

    // First totem replants away; the second still holds everyone
    processor.before_fight_state(&totem_cast(3000, SHAMAN, 90000.0, 0.0), &state, &mut ns, &mut effects);
    processor.before_fight_state(&totem_summon(3100, SHAMAN), &state, &mut ns, &mut effects);
    assert!(mutations(&effects).is_empty());
}

#[test]
fn pets_fall_back_to_owner_position() {
    let mut processor = make_processor();
    let mut ns = ns_with_party(&[SHAMAN, HUNTER, PET]);
    // The pet has no recorded coordinates; the hunter is in range
    let state = state_with_positions(&[(SHAMAN, 0.0, 0.0), (HUNTER, 3000.0, 0.0)]);

    let mut effects = Vec::new();
    processor.before_fight_state(&totem_cast(1000, SHAMAN, 0.0, 0.0), &state, &mut ns, &mut effects);
    processor.before_fight_state(&totem_summon(1100, SHAMAN), &state, &mut ns, &mut effects);

    assert_eq!(mutations(&effects), vec![(AuraAction::Apply, vec![HUNTER, PET, SHAMAN])]);
}

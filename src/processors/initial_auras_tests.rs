use crate::event::{CombatantAura, EventKind, LogEvent};
use crate::processors::namespace::{
    add_initial_aura, Namespace, EXPLICIT_INITIAL_AURAS, INITIAL_AURA_ADDITIONS,
};
use crate::processors::{Processor, ProcessorContext};
use crate::testutil::{buff, std_actors, std_friendly, HUNTER, PET, PRIEST, WARRIOR};

use super::InferInitialAuras;

fn run_prepass(events: &[LogEvent], ns: &mut Namespace) {
    let actors = std_actors();
    let friendly = std_friendly();
    let ctx = ProcessorContext {
        report: None,
        fight: None,
        infer_threat_reduction: false,
        tank_actor_ids: None,
        actors: &actors,
        friendly_actor_ids: &friendly,
    };
    let mut processor = InferInitialAuras::factory(&ctx).expect("always runs");
    processor.init(ns);
    for event in events {
        processor.visit_prepass(event, ns);
    }
    processor.finalize_prepass(ns);
}

fn additions_for(ns: &Namespace, actor: i64) -> Vec<u32> {
    ns.get(INITIAL_AURA_ADDITIONS)
        .and_then(|m| m.get(&actor))
        .map(|s| s.iter().copied().collect())
        .unwrap_or_default()
}

#[test]
fn first_removebuff_means_present_at_start() {
    let mut ns = Namespace::new();
    run_prepass(&[buff(EventKind::RemoveBuff, 1000, WARRIOR, WARRIOR, 1044)], &mut ns);
    assert_eq!(additions_for(&ns, WARRIOR), vec![1044]);
}

#[test]
fn first_refreshbuff_means_present_at_start() {
    let mut ns = Namespace::new();
    run_prepass(
        &[
            buff(EventKind::RefreshBuff, 1000, PRIEST, PRIEST, 21564),
            // A later removal must not double-register
            buff(EventKind::RemoveBuff, 5000, PRIEST, PRIEST, 21564),
        ],
        &mut ns,
    );
    assert_eq!(additions_for(&ns, PRIEST), vec![21564]);
}

#[test]
fn first_applybuff_means_gained_during_fight() {
    let mut ns = Namespace::new();
    run_prepass(
        &[
            buff(EventKind::ApplyBuff, 1000, WARRIOR, WARRIOR, 1044),
            buff(EventKind::RemoveBuff, 2000, WARRIOR, WARRIOR, 1044),
        ],
        &mut ns,
    );
    assert!(additions_for(&ns, WARRIOR).is_empty());
}

#[test]
fn combatantinfo_auras_are_reseeded() {
    let mut ns = Namespace::new();
    let info = LogEvent {
        kind: EventKind::CombatantInfo,
        timestamp: 0,
        source_id: WARRIOR,
        target_id: WARRIOR,
        auras: vec![
            CombatantAura { source: WARRIOR, ability: 71, stacks: None },
            CombatantAura { source: PRIEST, ability: 21564, stacks: None },
        ],
        ..Default::default()
    };
    run_prepass(&[info], &mut ns);
    assert_eq!(additions_for(&ns, WARRIOR), vec![71, 21564]);
}

#[test]
fn known_seeds_suppress_inference() {
    let mut ns = Namespace::new();
    let mut explicit = std::collections::BTreeMap::new();
    explicit.insert(WARRIOR, [1044u32].into_iter().collect());
    ns.insert(EXPLICIT_INITIAL_AURAS, explicit);

    run_prepass(&[buff(EventKind::RemoveBuff, 1000, WARRIOR, WARRIOR, 1044)], &mut ns);
    assert!(additions_for(&ns, WARRIOR).is_empty());
}

#[test]
fn hostile_actors_are_ignored() {
    let mut ns = Namespace::new();
    run_prepass(
        &[buff(EventKind::RemoveBuff, 1000, crate::testutil::BOSS, crate::testutil::BOSS, 17)],
        &mut ns,
    );
    assert!(additions_for(&ns, crate::testutil::BOSS).is_empty());
}

#[test]
fn friendly_pets_participate() {
    let mut ns = Namespace::new();
    run_prepass(&[buff(EventKind::RemoveBuff, 1000, HUNTER, PET, 19574)], &mut ns);
    assert_eq!(additions_for(&ns, PET), vec![19574]);
}

#[test]
fn helper_additions_merge_with_inference() {
    let mut ns = Namespace::new();
    add_initial_aura(&mut ns, WARRIOR, 25895);
    run_prepass(&[buff(EventKind::RemoveBuff, 1000, WARRIOR, WARRIOR, 1044)], &mut ns);
    assert_eq!(additions_for(&ns, WARRIOR), vec![1044, 25895]);
}

//! Shared fixtures for unit and scenario tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::actor::{Actor, ActorId, Class, Enemy, SpellId};
use crate::config::{
    scaled, scaled_split, AuraModifier, BaseFormulas, ClassConfig, ThreatConfig,
};
use crate::engine::EngineInput;
use crate::event::{EventKind, LogEvent};

pub const WARRIOR: ActorId = 1;
pub const PRIEST: ActorId = 2;
pub const HUNTER: ActorId = 3;
pub const TANK: ActorId = 4;
pub const SHAMAN: ActorId = 6;
pub const PALADIN: ActorId = 7;
pub const PET: ActorId = 5;
pub const BOSS: ActorId = 20;
pub const ADD: ActorId = 21;

pub const DEFENSIVE_STANCE: SpellId = 71;
pub const FIXATE_SPELL: SpellId = 355;
pub const AGGRO_LOSS_SPELL: SpellId = 5384;
pub const INVULN_SPELL: SpellId = 11958;

pub fn damage(ts: i64, source: ActorId, target: ActorId, ability: SpellId, amount: i64) -> LogEvent {
    LogEvent {
        kind: EventKind::Damage,
        timestamp: ts,
        source_id: source,
        target_id: target,
        ability_game_id: Some(ability),
        amount: Some(amount),
        ..Default::default()
    }
}

pub fn heal(ts: i64, source: ActorId, target: ActorId, ability: SpellId, amount: i64, overheal: i64) -> LogEvent {
    LogEvent {
        kind: EventKind::Heal,
        timestamp: ts,
        source_id: source,
        target_id: target,
        ability_game_id: Some(ability),
        amount: Some(amount),
        overheal: Some(overheal),
        ..Default::default()
    }
}

pub fn cast(ts: i64, source: ActorId, target: ActorId, ability: SpellId) -> LogEvent {
    LogEvent {
        kind: EventKind::Cast,
        timestamp: ts,
        source_id: source,
        target_id: target,
        ability_game_id: Some(ability),
        ..Default::default()
    }
}

pub fn buff(kind: EventKind, ts: i64, source: ActorId, target: ActorId, spell: SpellId) -> LogEvent {
    LogEvent {
        kind,
        timestamp: ts,
        source_id: source,
        target_id: target,
        ability_game_id: Some(spell),
        ..Default::default()
    }
}

pub fn death(ts: i64, target: ActorId, friendly: bool) -> LogEvent {
    LogEvent {
        kind: EventKind::Death,
        timestamp: ts,
        source_id: BOSS,
        target_id: target,
        target_is_friendly: Some(friendly),
        ..Default::default()
    }
}

/// Standard test config: damage doubles, heals split at half rate,
/// resource gains split at half rate without player multipliers; warriors
/// carry the 1.3 class factor and a 1.3 Defensive Stance modifier.
pub fn std_config() -> Arc<ThreatConfig> {
    let base = BaseFormulas {
        damage: scaled("2 * damage", 2.0),
        absorbed: scaled("absorbed", 1.0),
        heal: scaled_split("heal / 2", 0.5),
        energize: scaled_split("resource / 2", 0.5),
    };

    let mut warrior = ClassConfig {
        base_threat_factor: 1.3,
        exclusive_auras: vec![vec![DEFENSIVE_STANCE, 2457, 2458]],
        ..Default::default()
    };
    warrior.aura_modifiers.insert(
        DEFENSIVE_STANCE,
        AuraModifier::new("Defensive Stance", 1.3),
    );

    let mut config = ThreatConfig::new(base).with_class(Class::Warrior, warrior);
    config.fixate_buffs.insert(FIXATE_SPELL);
    config.aggro_loss_buffs.insert(AGGRO_LOSS_SPELL);
    config.invulnerability_buffs.insert(INVULN_SPELL);
    Arc::new(config)
}

pub fn std_actors() -> HashMap<ActorId, Actor> {
    let mut actors = HashMap::new();
    actors.insert(WARRIOR, Actor::player(WARRIOR, "Thandrel", Class::Warrior));
    actors.insert(PRIEST, Actor::player(PRIEST, "Mendala", Class::Priest));
    actors.insert(HUNTER, Actor::player(HUNTER, "Veskar", Class::Hunter));
    actors.insert(TANK, Actor::player(TANK, "Boruk", Class::Warrior));
    actors.insert(SHAMAN, Actor::player(SHAMAN, "Ralka", Class::Shaman));
    actors.insert(PALADIN, Actor::player(PALADIN, "Aldric", Class::Paladin));
    actors.insert(PET, Actor::pet(PET, "Sharptooth", HUNTER));
    actors.insert(BOSS, Actor::npc(BOSS, "Golemagg", true));
    actors.insert(ADD, Actor::npc(ADD, "Core Rager", false));
    actors
}

pub fn std_friendly() -> HashSet<ActorId> {
    [WARRIOR, PRIEST, HUNTER, TANK, SHAMAN, PALADIN, PET].into_iter().collect()
}

pub fn std_enemies() -> Vec<Enemy> {
    vec![Enemy::new(BOSS, "Golemagg", 0), Enemy::new(ADD, "Core Rager", 0)]
}

pub fn make_input(events: Vec<LogEvent>) -> EngineInput {
    EngineInput {
        raw_events: events,
        actors: std_actors(),
        friendly_actor_ids: std_friendly(),
        ability_schools: HashMap::new(),
        enemies: std_enemies(),
        encounter_id: None,
        report: None,
        fight: None,
        infer_threat_reduction: false,
        tank_actor_ids: None,
        initial_auras_by_actor: BTreeMap::new(),
        config: std_config(),
    }
}

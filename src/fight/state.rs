//! Mutable per-fight state: auras, threat tables, liveness, positions,
//! and resolved actor identities.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::{HashMap, HashSet};

use crate::actor::{Actor, ActorId, ActorRef, Enemy, InstanceId, SpellId, ENVIRONMENT_ID};
use crate::config::PreparedConfig;
use crate::event::{EventKind, LogEvent};
use crate::threat::ChangeOp;

type EnemyKey = (ActorId, InstanceId);

pub struct FightState {
    actors: HashMap<ActorId, Actor>,
    friendly: HashSet<ActorId>,
    enemies: Vec<Enemy>,
    enemy_keys: HashSet<EnemyKey>,
    ability_schools: HashMap<SpellId, u8>,

    auras: HashMap<ActorId, HashSet<SpellId>>,
    threat: HashMap<(ActorId, ActorId, InstanceId), f64>,
    dead: HashSet<(ActorId, InstanceId)>,
    positions: HashMap<ActorId, (f64, f64)>,

    /// Record of every aura seeded for an actor, including `combatantinfo`
    /// absorptions and config-implied synthetic auras. Ordered so the
    /// merged seed output is deterministic.
    seeded: BTreeMap<ActorId, BTreeSet<SpellId>>,
}

impl FightState {
    pub fn new(
        actors: HashMap<ActorId, Actor>,
        friendly: HashSet<ActorId>,
        enemies: Vec<Enemy>,
        ability_schools: HashMap<SpellId, u8>,
    ) -> Self {
        let enemy_keys = enemies.iter().map(|e| (e.id, e.instance)).collect();
        Self {
            actors,
            friendly,
            enemies,
            enemy_keys,
            ability_schools,
            auras: HashMap::new(),
            threat: HashMap::new(),
            dead: HashSet::new(),
            positions: HashMap::new(),
            seeded: BTreeMap::new(),
        }
    }

    /// State with no actors or enemies; only useful as a fixture.
    pub fn empty() -> Self {
        Self::new(HashMap::new(), HashSet::new(), Vec::new(), HashMap::new())
    }

    // ─── Identities ─────────────────────────────────────────────────────────

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actors(&self) -> &HashMap<ActorId, Actor> {
        &self.actors
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn is_enemy_key(&self, key: ActorRef) -> bool {
        self.enemy_keys.contains(&(key.id, key.instance))
    }

    /// First declared enemy with this actor id, any instance.
    pub fn enemy_by_id(&self, id: ActorId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn ability_school(&self, spell_id: SpellId) -> u8 {
        self.ability_schools.get(&spell_id).copied().unwrap_or(1)
    }

    /// Resolve friendliness: the event flag is authoritative, then the
    /// friendly-id set, then "class-bearing actor ⇒ friendly".
    pub fn resolve_friendly(&self, id: ActorId, flag: Option<bool>) -> bool {
        if id == ENVIRONMENT_ID {
            return false;
        }
        flag.unwrap_or_else(|| {
            self.friendly.contains(&id)
                || self.actors.get(&id).is_some_and(|a| a.class().is_some())
        })
    }

    pub fn is_friendly_id(&self, id: ActorId) -> bool {
        self.resolve_friendly(id, None)
    }

    // ─── Auras ──────────────────────────────────────────────────────────────

    /// Seed an aura as present at fight start. Seeds are recorded for the
    /// merged-seed output in addition to becoming active.
    pub fn seed_aura(&mut self, actor_id: ActorId, spell_id: SpellId, config: &PreparedConfig) {
        self.seeded.entry(actor_id).or_default().insert(spell_id);
        self.set_aura(actor_id, spell_id, config);
    }

    /// Add an aura, removing any others in its exclusive group. Idempotent
    /// at the set level.
    pub fn set_aura(&mut self, actor_id: ActorId, spell_id: SpellId, config: &PreparedConfig) {
        if let Some(group) = config.exclusive_group_for(spell_id) {
            let others: Vec<SpellId> = group.iter().copied().filter(|s| *s != spell_id).collect();
            let auras = self.auras.entry(actor_id).or_default();
            for other in others {
                auras.remove(&other);
            }
        }
        self.auras.entry(actor_id).or_default().insert(spell_id);
    }

    pub fn remove_aura(&mut self, actor_id: ActorId, spell_id: SpellId) {
        if let Some(auras) = self.auras.get_mut(&actor_id) {
            auras.remove(&spell_id);
        }
    }

    pub fn auras_for(&self, actor_id: ActorId) -> Option<&HashSet<SpellId>> {
        self.auras.get(&actor_id)
    }

    pub fn has_aura(&self, actor_id: ActorId, spell_id: SpellId) -> bool {
        self.auras.get(&actor_id).is_some_and(|a| a.contains(&spell_id))
    }

    pub fn seeded_auras(&self) -> &BTreeMap<ActorId, BTreeSet<SpellId>> {
        &self.seeded
    }

    // ─── Threat table ───────────────────────────────────────────────────────

    pub fn threat(&self, source_id: ActorId, enemy: EnemyKey) -> f64 {
        self.threat.get(&(source_id, enemy.0, enemy.1)).copied().unwrap_or(0.0)
    }

    /// Add a delta, clamping the total at zero. Returns the effective
    /// (post-clamp) delta and the new total.
    pub fn add_threat(&mut self, source_id: ActorId, enemy: EnemyKey, delta: f64) -> (f64, f64) {
        let entry = self.threat.entry((source_id, enemy.0, enemy.1)).or_insert(0.0);
        let old = *entry;
        let new = (old + delta).max(0.0);
        *entry = new;
        (new - old, new)
    }

    /// Replace a total, clamping at zero. Returns the new total.
    pub fn set_threat(&mut self, source_id: ActorId, enemy: EnemyKey, value: f64) -> f64 {
        let clamped = value.max(0.0);
        self.threat.insert((source_id, enemy.0, enemy.1), clamped);
        clamped
    }

    /// Apply one change operator. Returns the effective amount (post-clamp
    /// delta for adds, absolute total for sets) and the new total.
    pub fn apply_change(
        &mut self,
        source_id: ActorId,
        enemy: EnemyKey,
        op: ChangeOp,
        amount: f64,
    ) -> (f64, f64) {
        match op {
            ChangeOp::Add => self.add_threat(source_id, enemy, amount),
            ChangeOp::Set => {
                let total = self.set_threat(source_id, enemy, amount);
                (total, total)
            }
        }
    }

    /// Zero every pair for the actor, returning the previously non-zero
    /// pairs in deterministic order: declared enemies first, then any
    /// remaining keys sorted.
    pub fn clear_all_threat_for_actor(&mut self, actor_id: ActorId) -> Vec<(EnemyKey, f64)> {
        let mut cleared = Vec::new();
        let mut seen: HashSet<EnemyKey> = HashSet::new();

        for enemy in &self.enemies {
            let key = (enemy.id, enemy.instance);
            if seen.insert(key)
                && let Some(value) = self.threat.get_mut(&(actor_id, key.0, key.1))
                && *value > 0.0
            {
                cleared.push((key, *value));
                *value = 0.0;
            }
        }

        let mut extra: Vec<(EnemyKey, f64)> = self
            .threat
            .iter()
            .filter(|((source, id, inst), value)| {
                *source == actor_id && **value > 0.0 && !seen.contains(&(*id, *inst))
            })
            .map(|((_, id, inst), value)| ((*id, *inst), *value))
            .collect();
        extra.sort_by_key(|(key, _)| *key);
        for (key, value) in &extra {
            self.threat.insert((actor_id, key.0, key.1), 0.0);
            cleared.push((*key, *value));
        }
        cleared
    }

    /// Every source with an entry against the enemy, sorted by actor id.
    pub fn all_actor_threat(&self, enemy: EnemyKey) -> Vec<(ActorId, f64)> {
        let mut entries: Vec<(ActorId, f64)> = self
            .threat
            .iter()
            .filter(|((_, id, inst), _)| (*id, *inst) == enemy)
            .map(|((source, _, _), value)| (*source, *value))
            .collect();
        entries.sort_by_key(|(source, _)| *source);
        entries
    }

    /// Every enemy pair for the actor, sorted by enemy key.
    pub fn all_enemy_threat_entries(&self, actor_id: ActorId) -> Vec<(EnemyKey, f64)> {
        let mut entries: Vec<(EnemyKey, f64)> = self
            .threat
            .iter()
            .filter(|((source, _, _), _)| *source == actor_id)
            .map(|((_, id, inst), value)| ((*id, *inst), *value))
            .collect();
        entries.sort_by_key(|(key, _)| *key);
        entries
    }

    // ─── Liveness ───────────────────────────────────────────────────────────

    pub fn is_actor_alive(&self, actor: ActorRef) -> bool {
        !self.dead.contains(&(actor.id, actor.instance))
    }

    /// Declared enemies that are alive, excluding the environment, in
    /// declaration order.
    pub fn alive_enemies(&self) -> Vec<&Enemy> {
        self.enemies
            .iter()
            .filter(|e| e.id != ENVIRONMENT_ID && !self.dead.contains(&(e.id, e.instance)))
            .collect()
    }

    // ─── Positions ──────────────────────────────────────────────────────────

    pub fn position(&self, actor_id: ActorId) -> Option<(f64, f64)> {
        self.positions.get(&actor_id).copied()
    }

    // ─── Event replay ───────────────────────────────────────────────────────

    /// Fold one event into the state: aura membership, liveness,
    /// positions, and `combatantinfo` absorption.
    pub fn process_event(&mut self, event: &LogEvent, config: &PreparedConfig) {
        if let Some(pos) = event.position() {
            self.positions.insert(event.source_id, pos);
        }

        match event.kind {
            kind if kind.is_aura_event() => {
                if let Some(spell_id) = event.ability_game_id {
                    if kind.is_aura_loss() {
                        self.remove_aura(event.target_id, spell_id);
                    } else {
                        // Gains, refreshes, and stack changes all mean the
                        // aura is active.
                        self.set_aura(event.target_id, spell_id, config);
                    }
                }
            }
            EventKind::Death => {
                let target = event.target_ref();
                self.dead.insert((target.id, target.instance));
            }
            EventKind::Cast | EventKind::BeginCast => {
                // A dead actor sourcing a cast has been resurrected.
                let source = event.source_id;
                self.dead.retain(|(id, _)| *id != source);
            }
            EventKind::CombatantInfo => {
                self.absorb_combatant_info(event, config);
            }
            _ => {}
        }
    }

    fn absorb_combatant_info(&mut self, event: &LogEvent, config: &PreparedConfig) {
        let actor_id = event.source_id;
        let mut seeds: Vec<SpellId> = event.auras.iter().map(|a| a.ability).collect();

        if let Some(class) = self.actors.get(&actor_id).and_then(|a| a.class())
            && let Some(class_config) = config.class(class)
        {
            for item in &event.gear {
                if let Some(&implied) = class_config.gear_implications.get(&item.id) {
                    seeds.push(implied);
                }
                if let Some(enchant) = item.permanent_enchant
                    && let Some(&implied) = class_config.gear_implications.get(&(enchant as i64))
                {
                    seeds.push(implied);
                }
            }
            for implication in &class_config.talent_implications {
                if event
                    .talents
                    .get(implication.tree)
                    .is_some_and(|t| t.points >= implication.min_points)
                {
                    seeds.push(implication.spell_id);
                }
            }
            let implied: Vec<SpellId> = seeds
                .iter()
                .filter_map(|s| class_config.aura_implications.get(s))
                .flatten()
                .copied()
                .collect();
            seeds.extend(implied);
        }

        for spell_id in seeds {
            self.seed_aura(actor_id, spell_id, config);
        }
    }
}

//! Party inference from party-scoped buff applications.
//!
//! Spells that only ever land on the caster's own party (prayers, auras,
//! shouts, party totems) are treated as clique observations; union-find
//! over those cliques recovers the party layout without ever growing a
//! group past the five-member limit.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};

use crate::actor::{ActorId, InstanceId, SpellId};
use crate::event::LogEvent;
use crate::game_data::{PARTY_SIGNAL_NAMES, PARTY_SIGNAL_SPELLS};

use super::namespace::{Namespace, NamespaceKey};
use super::{Processor, ProcessorContext};

pub const PARTY_MEMBER_LIMIT: usize = 5;

/// Inferred party layout, published to the namespace after the prepass.
#[derive(Debug, Clone, Default)]
pub struct PartyGroups {
    pub actor_group_by_id: HashMap<ActorId, u32>,
    pub members_by_group_id: BTreeMap<u32, Vec<ActorId>>,
}

impl PartyGroups {
    pub fn group_of(&self, actor_id: ActorId) -> Option<u32> {
        self.actor_group_by_id.get(&actor_id).copied()
    }

    pub fn members(&self, group_id: u32) -> &[ActorId] {
        self.members_by_group_id.get(&group_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub const PARTY_GROUPS: NamespaceKey<PartyGroups> = NamespaceKey::new("party_groups");

type ObservationKey = (ActorId, InstanceId, SpellId, i64);

pub struct PartyDetection {
    signal_spells: HashSet<SpellId>,
    friendly_players: Vec<ActorId>,
    pets: Vec<(ActorId, ActorId)>,
    observations: Vec<(ObservationKey, Vec<ActorId>)>,
    observation_index: HashMap<ObservationKey, usize>,
}

impl PartyDetection {
    pub fn factory(ctx: &ProcessorContext<'_>) -> Option<Box<dyn Processor>> {
        if !ctx.infer_threat_reduction {
            return None;
        }

        // Fallback ids plus every report ability whose name is on the
        // signal list, so unlisted ranks still match.
        let mut signal_spells: HashSet<SpellId> =
            PARTY_SIGNAL_SPELLS.iter().copied().collect();
        if let Some(report) = ctx.report {
            for ability in &report.abilities {
                if PARTY_SIGNAL_NAMES.contains(ability.name.as_str()) {
                    signal_spells.insert(ability.game_id);
                }
            }
        }

        let mut friendly_players: Vec<ActorId> = ctx
            .actors
            .values()
            .filter(|a| a.is_player() && (ctx.friendly_actor_ids.contains(&a.id) || a.class().is_some()))
            .map(|a| a.id)
            .collect();
        friendly_players.sort_unstable();

        let mut pets: Vec<(ActorId, ActorId)> = ctx
            .actors
            .values()
            .filter_map(|a| a.pet_owner().map(|owner| (a.id, owner)))
            .collect();
        pets.sort_unstable();

        Some(Box::new(Self {
            signal_spells,
            friendly_players,
            pets,
            observations: Vec::new(),
            observation_index: HashMap::new(),
        }))
    }
}

impl Processor for PartyDetection {
    fn id(&self) -> &'static str {
        "party-detection"
    }

    fn visit_prepass(&mut self, event: &LogEvent, _ns: &mut Namespace) {
        if !event.kind.is_aura_gain() {
            return;
        }
        let Some(spell_id) = event.ability_game_id else { return };
        if !self.signal_spells.contains(&spell_id) {
            return;
        }
        if !self.friendly_players.contains(&event.target_id) {
            return;
        }

        let key: ObservationKey = (
            event.source_id,
            event.source_instance.unwrap_or(0),
            spell_id,
            event.timestamp,
        );
        let idx = *self.observation_index.entry(key).or_insert_with(|| {
            self.observations.push((key, Vec::new()));
            self.observations.len() - 1
        });
        let members = &mut self.observations[idx].1;
        if !members.contains(&event.target_id) {
            members.push(event.target_id);
        }
    }

    fn finalize_prepass(&mut self, ns: &mut Namespace) {
        let mut uf = UnionFind::new(&self.friendly_players);

        for (_, members) in &self.observations {
            if members.len() < 2 {
                continue;
            }
            // Chain consecutive members; a refused union leaves the rest of
            // the clique free to form its own group.
            for pair in members.windows(2) {
                uf.union_capped(pair[0], pair[1], PARTY_MEMBER_LIMIT);
            }
        }

        let mut groups = PartyGroups::default();
        let mut group_by_root: HashMap<ActorId, u32> = HashMap::new();
        let mut next_group = 0u32;

        for &player in &self.friendly_players {
            let root = uf.find(player);
            let group_id = *group_by_root.entry(root).or_insert_with(|| {
                let id = next_group;
                next_group += 1;
                id
            });
            groups.actor_group_by_id.insert(player, group_id);
            groups.members_by_group_id.entry(group_id).or_default().push(player);
        }

        for &(pet, owner) in &self.pets {
            if let Some(group_id) = groups.group_of(owner) {
                groups.actor_group_by_id.insert(pet, group_id);
                groups.members_by_group_id.entry(group_id).or_default().push(pet);
            }
        }

        tracing::debug!(groups = groups.members_by_group_id.len(), "party detection finished");
        ns.insert(PARTY_GROUPS, groups);
    }
}

/// Union-find over actor ids with a hard size cap on unions.
struct UnionFind {
    parent: HashMap<ActorId, ActorId>,
    size: HashMap<ActorId, usize>,
}

impl UnionFind {
    fn new(members: &[ActorId]) -> Self {
        let parent = members.iter().map(|&m| (m, m)).collect();
        let size = members.iter().map(|&m| (m, 1)).collect();
        Self { parent, size }
    }

    fn find(&mut self, actor: ActorId) -> ActorId {
        let Some(&parent) = self.parent.get(&actor) else { return actor };
        if parent == actor {
            return actor;
        }
        let root = self.find(parent);
        self.parent.insert(actor, root);
        root
    }

    /// Merge two sets unless the result would exceed `cap` members.
    /// Returns whether the merge happened.
    fn union_capped(&mut self, a: ActorId, b: ActorId, cap: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return true;
        }
        let size_a = self.size.get(&root_a).copied().unwrap_or(1);
        let size_b = self.size.get(&root_b).copied().unwrap_or(1);
        if size_a + size_b > cap {
            return false;
        }
        // Attach the smaller tree under the larger; ties keep the lower id
        // as root for determinism.
        let (root, child) = if size_a > size_b || (size_a == size_b && root_a < root_b) {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent.insert(child, root);
        self.size.insert(root, size_a + size_b);
        true
    }
}

//! Infer auras that were active at fight start.
//!
//! If the first lifecycle event a friendly actor shows for a buff is a
//! removal or a refresh, the buff must have been present before the log
//! began. `combatantinfo` snapshots are reseeded wholesale.

use hashbrown::{HashMap, HashSet};

use crate::actor::{ActorId, SpellId};
use crate::event::{EventKind, LogEvent};

use super::namespace::{add_initial_aura, is_aura_seeded, Namespace};
use super::{Processor, ProcessorContext};

pub struct InferInitialAuras {
    friendly: HashSet<ActorId>,
    first_seen: HashMap<(ActorId, SpellId), EventKind>,
    combatant_auras: Vec<(ActorId, SpellId)>,
}

impl InferInitialAuras {
    pub fn factory(ctx: &ProcessorContext<'_>) -> Option<Box<dyn Processor>> {
        // Players plus declared friendly pets
        let friendly = ctx
            .actors
            .values()
            .filter(|a| {
                let declared = ctx.friendly_actor_ids.contains(&a.id);
                (a.is_player() && (declared || a.class().is_some())) || (a.is_pet() && declared)
            })
            .map(|a| a.id)
            .collect();
        Some(Box::new(Self {
            friendly,
            first_seen: HashMap::new(),
            combatant_auras: Vec::new(),
        }))
    }
}

impl Processor for InferInitialAuras {
    fn id(&self) -> &'static str {
        "infer-initial-auras"
    }

    fn visit_prepass(&mut self, event: &LogEvent, _ns: &mut Namespace) {
        match event.kind {
            kind if kind.is_buff_lifecycle() => {
                if let Some(spell_id) = event.ability_game_id
                    && self.friendly.contains(&event.target_id)
                {
                    self.first_seen.entry((event.target_id, spell_id)).or_insert(kind);
                }
            }
            EventKind::CombatantInfo => {
                if self.friendly.contains(&event.source_id) {
                    for aura in &event.auras {
                        self.combatant_auras.push((event.source_id, aura.ability));
                    }
                }
            }
            _ => {}
        }
    }

    fn finalize_prepass(&mut self, ns: &mut Namespace) {
        for (actor_id, spell_id) in self.combatant_auras.drain(..) {
            add_initial_aura(ns, actor_id, spell_id);
        }

        let mut observed: Vec<(&(ActorId, SpellId), &EventKind)> = self.first_seen.iter().collect();
        observed.sort_by_key(|(key, _)| **key);

        for ((actor_id, spell_id), first) in observed {
            let present_at_start =
                matches!(first, EventKind::RemoveBuff | EventKind::RefreshBuff);
            if present_at_start && !is_aura_seeded(ns, *actor_id, *spell_id) {
                add_initial_aura(ns, *actor_id, *spell_id);
            }
        }
    }
}

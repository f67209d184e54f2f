//! Best-case salvation seeding.
//!
//! When threat-reduction inference is on and the fight has paladins, any
//! non-tank player with a free blessing slot and no salvation seeded is
//! assumed to have been given Greater Blessing of Salvation.

use crate::actor::{ActorId, Class};
use crate::game_data::{
    BLESSING_OF_SALVATION, GREATER_BLESSING_OF_SALVATION, LONG_TERM_BLESSINGS,
};

use super::namespace::{add_initial_aura, is_aura_seeded, seeded_auras_for, Namespace};
use super::{Processor, ProcessorContext};

pub struct MinmaxSalvation {
    candidates: Vec<ActorId>,
    paladin_count: usize,
}

impl MinmaxSalvation {
    pub fn factory(ctx: &ProcessorContext<'_>) -> Option<Box<dyn Processor>> {
        if !ctx.infer_threat_reduction {
            return None;
        }

        let paladin_count = ctx
            .actors
            .values()
            .filter(|a| a.class() == Some(Class::Paladin))
            .count();
        if paladin_count == 0 {
            return None;
        }

        let tanks = resolve_tanks(ctx);
        let mut candidates: Vec<ActorId> = ctx
            .actors
            .values()
            .filter(|a| {
                a.is_player()
                    && (ctx.friendly_actor_ids.contains(&a.id) || a.class().is_some())
                    && !tanks.contains(&a.id)
            })
            .map(|a| a.id)
            .collect();
        candidates.sort_unstable();

        Some(Box::new(Self { candidates, paladin_count }))
    }
}

/// Tank set: explicit ids from the request, else the report's rankings
/// matched by id and, failing that, by trimmed case-insensitive name.
fn resolve_tanks(ctx: &ProcessorContext<'_>) -> Vec<ActorId> {
    if let Some(ids) = ctx.tank_actor_ids {
        return ids.to_vec();
    }
    let Some(report) = ctx.report else { return Vec::new() };

    let mut tanks = Vec::new();
    for ranking in report.rankings.iter().filter(|r| r.tank) {
        if let Some(id) = ranking.actor_id {
            if ctx.actors.contains_key(&id) {
                tanks.push(id);
                continue;
            }
        }
        let wanted = ranking.name.trim();
        if let Some(actor) = ctx
            .actors
            .values()
            .find(|a| a.is_player() && a.name.trim().eq_ignore_ascii_case(wanted))
        {
            tanks.push(actor.id);
        }
    }
    tanks
}

impl Processor for MinmaxSalvation {
    fn id(&self) -> &'static str {
        "minmax-salvation"
    }

    fn finalize_prepass(&mut self, ns: &mut Namespace) {
        for &actor_id in &self.candidates {
            if is_aura_seeded(ns, actor_id, BLESSING_OF_SALVATION)
                || is_aura_seeded(ns, actor_id, GREATER_BLESSING_OF_SALVATION)
            {
                continue;
            }
            let blessing_count = seeded_auras_for(ns, actor_id)
                .iter()
                .filter(|s| LONG_TERM_BLESSINGS.contains(s))
                .count();
            if blessing_count < self.paladin_count {
                tracing::debug!(actor_id, "assuming greater blessing of salvation");
                add_initial_aura(ns, actor_id, GREATER_BLESSING_OF_SALVATION);
            }
        }
    }
}

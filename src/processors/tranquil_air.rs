//! Tranquil Air Totem emulation.
//!
//! The log records the totem summon but not who the aura reaches, so the
//! buff is emulated: the drop position comes from the paired cast (with a
//! short TTL) or the shaman's last known position, and party members
//! within totem range become recipients. Per-actor hold counts keep
//! overlapping totems from multiple shamans from double-toggling the buff.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::actor::ActorId;
use crate::event::{EventKind, LogEvent};
use crate::fight::FightState;
use crate::game_data::{TRANQUIL_AIR_BUFF, TRANQUIL_AIR_RANGE_UNITS, TRANQUIL_AIR_TOTEM};
use crate::threat::{AuraAction, ThreatEffect};

use super::namespace::Namespace;
use super::party::PARTY_GROUPS;
use super::{Processor, ProcessorContext};

/// How long a recorded cast position stays usable for the paired summon.
const CAST_POSITION_TTL_MS: i64 = 2000;

pub struct TranquilAir {
    cast_positions: HashMap<ActorId, ((f64, f64), i64)>,
    recipients_by_shaman: HashMap<ActorId, BTreeSet<ActorId>>,
    hold_counts: HashMap<ActorId, u32>,
}

impl TranquilAir {
    pub fn factory(ctx: &ProcessorContext<'_>) -> Option<Box<dyn Processor>> {
        if !ctx.infer_threat_reduction {
            return None;
        }
        Some(Box::new(Self {
            cast_positions: HashMap::new(),
            recipients_by_shaman: HashMap::new(),
            hold_counts: HashMap::new(),
        }))
    }

    fn handle_summon(
        &mut self,
        event: &LogEvent,
        state: &FightState,
        ns: &Namespace,
        effects: &mut Vec<ThreatEffect>,
    ) {
        let shaman = event.source_id;

        let summon_position = match self.cast_positions.get(&shaman) {
            Some((position, cast_at))
                if event.timestamp - cast_at <= CAST_POSITION_TTL_MS =>
            {
                Some(*position)
            }
            _ => state.position(shaman),
        };

        let mut recipients: BTreeSet<ActorId> = BTreeSet::new();
        if let Some(origin) = summon_position {
            for member in self.party_members(shaman, ns) {
                let position = state.position(member).or_else(|| {
                    // Pets without coordinates stand in for their owner.
                    state
                        .actor(member)
                        .and_then(|a| a.pet_owner())
                        .and_then(|owner| state.position(owner))
                });
                let Some((x, y)) = position else { continue };
                let distance = ((x - origin.0).powi(2) + (y - origin.1).powi(2)).sqrt();
                if distance <= TRANQUIL_AIR_RANGE_UNITS {
                    recipients.insert(member);
                }
            }
        }

        let previous = self.recipients_by_shaman.remove(&shaman).unwrap_or_default();

        let mut removed: Vec<ActorId> = Vec::new();
        for &actor in previous.difference(&recipients) {
            let count = self.hold_counts.entry(actor).or_insert(0);
            *count = count.saturating_sub(1);
            if *count == 0 {
                removed.push(actor);
            }
        }

        let mut applied: Vec<ActorId> = Vec::new();
        for &actor in recipients.difference(&previous) {
            let count = self.hold_counts.entry(actor).or_insert(0);
            *count += 1;
            if *count == 1 {
                applied.push(actor);
            }
        }

        if !removed.is_empty() {
            effects.push(ThreatEffect::AuraMutation {
                action: AuraAction::Remove,
                spell_id: TRANQUIL_AIR_BUFF,
                actor_ids: removed,
            });
        }
        if !applied.is_empty() {
            tracing::debug!(shaman, recipients = applied.len(), "tranquil air recipients");
            effects.push(ThreatEffect::AuraMutation {
                action: AuraAction::Apply,
                spell_id: TRANQUIL_AIR_BUFF,
                actor_ids: applied,
            });
        }

        self.recipients_by_shaman.insert(shaman, recipients);
    }

    fn party_members(&self, shaman: ActorId, ns: &Namespace) -> Vec<ActorId> {
        ns.get(PARTY_GROUPS)
            .and_then(|groups| groups.group_of(shaman).map(|g| groups.members(g).to_vec()))
            .unwrap_or_else(|| vec![shaman])
    }
}

impl Processor for TranquilAir {
    fn id(&self) -> &'static str {
        "tranquil-air"
    }

    fn before_fight_state(
        &mut self,
        event: &LogEvent,
        state: &FightState,
        ns: &mut Namespace,
        effects: &mut Vec<ThreatEffect>,
    ) {
        if event.ability_game_id != Some(TRANQUIL_AIR_TOTEM) {
            return;
        }
        match event.kind {
            EventKind::Cast => {
                let position = event.position().or_else(|| state.position(event.source_id));
                if let Some(position) = position {
                    self.cast_positions.insert(event.source_id, (position, event.timestamp));
                }
            }
            EventKind::Summon => {
                self.handle_summon(event, state, ns, effects);
            }
            _ => {}
        }
    }
}

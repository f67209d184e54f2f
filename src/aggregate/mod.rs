//! Aggregation over augmented events: chart series, overlay windows,
//! per-ability tables, summaries, and report rankings.

mod overlay;
mod rankings;
mod series;
mod summary;
mod targets;


pub use overlay::{ActorOverlay, StateSegment, StateWindow};
pub use rankings::{report_rankings, RankingRow};
pub use series::{ChartPoint, Series};
pub use summary::{AbilityRow, ModifierCount, PlayerSummary};
pub use targets::TargetOption;

use hashbrown::HashMap;

use crate::actor::{Actor, ActorId, Enemy, InstanceId, SpellId};
use crate::event::AugmentedEvent;
use crate::game_data::{school_name, MELEE};
use crate::input::AbilityInfo;

/// Read-only query surface over one fight's augmented output.
pub struct FightQuery<'a> {
    events: &'a [AugmentedEvent],
    actors: &'a HashMap<ActorId, Actor>,
    abilities: &'a [AbilityInfo],
    enemies: &'a [Enemy],
    fight_start: i64,
    fight_end: i64,
}

impl<'a> FightQuery<'a> {
    pub fn new(
        events: &'a [AugmentedEvent],
        actors: &'a HashMap<ActorId, Actor>,
        abilities: &'a [AbilityInfo],
        enemies: &'a [Enemy],
        fight_start: i64,
        fight_end: i64,
    ) -> Self {
        Self { events, actors, abilities, enemies, fight_start, fight_end }
    }

    /// Milliseconds from fight start; pre-fight events clamp to zero.
    pub(crate) fn time_ms(&self, timestamp: i64) -> i64 {
        (timestamp - self.fight_start).max(0)
    }

    pub(crate) fn fight_end_ms(&self) -> i64 {
        (self.fight_end - self.fight_start).max(0)
    }

    pub(crate) fn ability_name(&self, ability_id: Option<SpellId>) -> String {
        match ability_id {
            None => "Unknown".to_string(),
            Some(MELEE) => "Melee".to_string(),
            Some(id) => self
                .abilities
                .iter()
                .find(|a| a.game_id == id)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| format!("Unknown (#{id})")),
        }
    }

    pub(crate) fn school_of(&self, ability_id: Option<SpellId>) -> &'static str {
        let mask = ability_id
            .and_then(|id| self.abilities.iter().find(|a| a.game_id == id))
            .and_then(|a| a.school_mask)
            .unwrap_or(1);
        school_name(mask)
    }

    /// Friendly players and pets get chart series; everything else does
    /// not.
    pub(crate) fn is_series_actor(&self, actor_id: ActorId) -> bool {
        self.actors.get(&actor_id).is_some_and(|a| a.is_player() || a.is_pet())
    }

    pub(crate) fn actor_name(&self, actor_id: ActorId) -> String {
        self.actors
            .get(&actor_id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| format!("Unknown (#{actor_id})"))
    }

    pub(crate) fn enemy_name(&self, id: ActorId) -> String {
        self.enemies
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("Unknown (#{id})"))
    }

    pub(crate) fn is_enemy_id(&self, id: ActorId) -> bool {
        self.enemies.iter().any(|e| e.id == id)
    }

    pub(crate) fn events(&self) -> &'a [AugmentedEvent] {
        self.events
    }
}

pub(crate) type TargetKey = (ActorId, InstanceId);

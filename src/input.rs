//! External interface: building engine input from log-service metadata.
//!
//! The log-service client, authentication, and the HTTP layer live
//! elsewhere; this module is the seam they hand their parsed report data
//! across.

use std::collections::BTreeMap;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor::{Actor, ActorId, Enemy, SpellId, ENVIRONMENT_ID};
use crate::config::ThreatConfig;
use crate::engine::EngineInput;
use crate::event::LogEvent;

/// One row of the report's ability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityInfo {
    #[serde(rename = "gameID")]
    pub game_id: SpellId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_mask: Option<u8>,
}

/// One entry of the report's rankings table, used for tank resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRanking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
    pub name: String,
    #[serde(default)]
    pub tank: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportMeta {
    pub rankings: Vec<ReportRanking>,
    pub abilities: Vec<AbilityInfo>,
}

impl ReportMeta {
    pub fn ability_name(&self, game_id: SpellId) -> Option<&str> {
        self.abilities.iter().find(|a| a.game_id == game_id).map(|a| a.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FightMeta {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<i64>,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("fight bounds are inverted: start {start} > end {end}")]
    InvalidFightBounds { start: i64, end: i64 },
    #[error("enemy {id} is not present in the actor map")]
    UnknownEnemyActor { id: ActorId },
}

/// Engine flags beyond the raw report data.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub encounter_id: Option<i64>,
    pub infer_threat_reduction: bool,
    pub tank_actor_ids: Option<Vec<ActorId>>,
    /// Explicit aura seeds, e.g. the merged seeds of a previous run.
    pub initial_auras_by_actor: BTreeMap<ActorId, Vec<SpellId>>,
}

/// Assemble and validate one encounter's engine input.
///
/// Pets of friendly owners are folded into the friendly set, and the
/// ability school map is derived from the report's ability table.
#[allow(clippy::too_many_arguments)]
pub fn build_engine_input(
    report: Option<ReportMeta>,
    fight: Option<FightMeta>,
    raw_events: Vec<LogEvent>,
    actors: HashMap<ActorId, Actor>,
    friendly_actor_ids: HashSet<ActorId>,
    enemies: Vec<Enemy>,
    config: Arc<ThreatConfig>,
    options: EngineOptions,
) -> Result<EngineInput, InputError> {
    if let Some(fight) = &fight
        && fight.start_time > fight.end_time
    {
        return Err(InputError::InvalidFightBounds {
            start: fight.start_time,
            end: fight.end_time,
        });
    }

    for enemy in &enemies {
        if enemy.id != ENVIRONMENT_ID && !actors.contains_key(&enemy.id) {
            return Err(InputError::UnknownEnemyActor { id: enemy.id });
        }
    }

    let mut friendly = friendly_actor_ids;
    for actor in actors.values() {
        if let Some(owner) = actor.pet_owner()
            && friendly.contains(&owner)
        {
            friendly.insert(actor.id);
        }
    }

    let ability_schools: HashMap<SpellId, u8> = report
        .as_ref()
        .map(|r| {
            r.abilities
                .iter()
                .filter_map(|a| a.school_mask.map(|mask| (a.game_id, mask)))
                .collect()
        })
        .unwrap_or_default();

    let encounter_id = options.encounter_id.or(fight.as_ref().and_then(|f| f.encounter_id));

    Ok(EngineInput {
        raw_events,
        actors,
        friendly_actor_ids: friendly,
        ability_schools,
        enemies,
        encounter_id,
        report,
        fight,
        infer_threat_reduction: options.infer_threat_reduction,
        tank_actor_ids: options.tank_actor_ids,
        initial_auras_by_actor: options.initial_auras_by_actor,
        config,
    })
}

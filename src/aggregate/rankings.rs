//! Report-level threat rankings across fights.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::actor::{Actor, ActorId, Class};
use crate::engine::EngineOutput;
use crate::threat::ChangeOp;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub actor_id: ActorId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<Class>,
    pub total: f64,
}

/// Sum threat deltas per owning player across every fight of a report.
/// Pet threat is credited to the owner; fights are independent and folded
/// in parallel.
pub fn report_rankings(
    fights: &[EngineOutput],
    actors: &HashMap<ActorId, Actor>,
) -> Vec<RankingRow> {
    let totals: BTreeMap<ActorId, f64> = fights
        .par_iter()
        .map(|fight| {
            let mut per_fight: BTreeMap<ActorId, f64> = BTreeMap::new();
            for augmented in &fight.augmented_events {
                for change in &augmented.threat.changes {
                    if change.operator != ChangeOp::Add {
                        continue;
                    }
                    let Some(actor) = actors.get(&change.source_id) else { continue };
                    let owner = match actor.pet_owner() {
                        Some(owner) if actors.get(&owner).is_some_and(|a| a.is_player()) => owner,
                        Some(_) => continue,
                        None if actor.is_player() => actor.id,
                        None => continue,
                    };
                    *per_fight.entry(owner).or_insert(0.0) += change.amount;
                }
            }
            per_fight
        })
        .reduce(BTreeMap::new, |mut acc, per_fight| {
            for (actor_id, total) in per_fight {
                *acc.entry(actor_id).or_insert(0.0) += total;
            }
            acc
        });

    let mut rows: Vec<RankingRow> = totals
        .into_iter()
        .map(|(actor_id, total)| {
            let actor = actors.get(&actor_id);
            RankingRow {
                actor_id,
                name: actor.map(|a| a.name.clone()).unwrap_or_else(|| format!("#{actor_id}")),
                class: actor.and_then(|a| a.class()),
                total,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

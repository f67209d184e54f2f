//! Selectable threat targets and the default selection.

use hashbrown::{HashMap, HashSet};
use serde::Serialize;

use crate::actor::{ActorId, InstanceId, ENVIRONMENT_ID};
use crate::threat::ChangeOp;

use super::{FightQuery, TargetKey};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOption {
    pub id: ActorId,
    pub instance: InstanceId,
    pub name: String,
    pub boss: bool,
}

impl FightQuery<'_> {
    /// One option per enemy instance observed as source, target, or
    /// change-target. Bosses sort first, then by name, then instance.
    pub fn selectable_targets(&self) -> Vec<TargetOption> {
        let mut seen: HashSet<TargetKey> = HashSet::new();
        let mut keys: Vec<TargetKey> = Vec::new();
        let mut observe = |key: TargetKey| {
            if key.0 != ENVIRONMENT_ID && seen.insert(key) {
                keys.push(key);
            }
        };

        for augmented in self.events() {
            let event = &augmented.event;
            if self.is_enemy_id(event.source_id) {
                observe((event.source_id, event.source_instance.unwrap_or(0)));
            }
            if self.is_enemy_id(event.target_id) {
                observe((event.target_id, event.target_instance.unwrap_or(0)));
            }
            for change in &augmented.threat.changes {
                if self.is_enemy_id(change.target_id) {
                    observe((change.target_id, change.target_instance));
                }
            }
        }

        let mut options: Vec<TargetOption> = keys
            .into_iter()
            .map(|(id, instance)| TargetOption {
                id,
                instance,
                name: self.enemy_name(id),
                boss: self.actors.get(&id).is_some_and(|a| a.is_boss()),
            })
            .collect();
        options.sort_by(|a, b| {
            b.boss
                .cmp(&a.boss)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.instance.cmp(&b.instance))
        });
        options
    }

    /// The `(id, instance)` with the greatest summed positive delta across
    /// all changes. Ties break by first observation; with no changes the
    /// first selectable target wins.
    pub fn default_target(&self) -> Option<TargetKey> {
        let mut sums: HashMap<TargetKey, f64> = HashMap::new();
        let mut order: Vec<TargetKey> = Vec::new();

        for augmented in self.events() {
            for change in &augmented.threat.changes {
                if change.operator != ChangeOp::Add || change.amount <= 0.0 {
                    continue;
                }
                let key = (change.target_id, change.target_instance);
                if key.0 == ENVIRONMENT_ID {
                    continue;
                }
                if !sums.contains_key(&key) {
                    order.push(key);
                }
                *sums.entry(key).or_insert(0.0) += change.amount;
            }
        }

        order
            .iter()
            .copied()
            .max_by(|a, b| {
                sums[a]
                    .partial_cmp(&sums[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // Stable max: on ties prefer the earlier-observed key.
                    .then_with(|| {
                        let pos_a = order.iter().position(|k| k == a);
                        let pos_b = order.iter().position(|k| k == b);
                        pos_b.cmp(&pos_a)
                    })
            })
            .or_else(|| {
                self.selectable_targets().first().map(|option| (option.id, option.instance))
            })
    }
}

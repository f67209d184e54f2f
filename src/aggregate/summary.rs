//! Focused-player summary and per-ability rows.

use hashbrown::HashMap;
use serde::Serialize;

use crate::actor::{ActorId, SpellId};
use crate::event::EventKind;
use crate::threat::{StateKind, ThreatEffect};

use super::{FightQuery, TargetKey};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierCount {
    pub label: String,
    pub value: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub threat: f64,
    pub damage: i64,
    pub healing: i64,
    pub modifiers: Vec<ModifierCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityRow {
    /// `abilityId`, or `abilityId:eventSuffix` for resource events so
    /// resource gains stay distinct from damage on the same ability.
    pub key: String,
    pub ability_id: SpellId,
    pub name: String,
    pub amount: i64,
    pub threat: f64,
    /// Threat per second over the window; fixate rows carry no rate.
    pub tps: Option<f64>,
    pub is_heal: bool,
    pub is_fixate: bool,
    /// Dominant modifier variant (highest cumulative threat) and its
    /// product.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier_label: Option<String>,
    pub modifier_product: f64,
}

impl FightQuery<'_> {
    /// Totals for the focused player's own events inside the window. Pets
    /// are separate series and are not folded in.
    pub fn player_summary(
        &self,
        actor_id: ActorId,
        target: TargetKey,
        window: (i64, i64),
    ) -> PlayerSummary {
        let mut summary = PlayerSummary::default();
        let mut histogram: Vec<ModifierCount> = Vec::new();

        for augmented in self.events() {
            let event = &augmented.event;
            let time_ms = self.time_ms(event.timestamp);
            if event.source_id != actor_id || time_ms < window.0 || time_ms > window.1 {
                continue;
            }

            match event.kind {
                EventKind::Damage => summary.damage += event.amount.unwrap_or(0),
                EventKind::Heal => {
                    let effective = event.amount.unwrap_or(0) - event.overheal.unwrap_or(0);
                    summary.healing += effective.max(0);
                }
                _ => {}
            }

            for change in &augmented.threat.changes {
                if change.source_id == actor_id
                    && (change.target_id, change.target_instance) == target
                {
                    summary.threat += change.amount;
                }
            }

            for modifier in &augmented.threat.calculation.modifiers {
                match histogram
                    .iter_mut()
                    .find(|m| m.label == modifier.label && m.value == modifier.value)
                {
                    Some(existing) => existing.count += 1,
                    None => histogram.push(ModifierCount {
                        label: modifier.label.clone(),
                        value: modifier.value,
                        count: 1,
                    }),
                }
            }
        }

        histogram.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| {
                    let da = (a.value - 1.0).abs();
                    let db = (b.value - 1.0).abs();
                    db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.label.cmp(&b.label))
        });
        summary.modifiers = histogram;
        summary
    }

    /// Per-ability breakdown of the focused player's events in the window.
    pub fn ability_rows(
        &self,
        actor_id: ActorId,
        target: TargetKey,
        window: (i64, i64),
    ) -> Vec<AbilityRow> {
        struct RowAccumulator {
            row: AbilityRow,
            variants: HashMap<String, (f64, f64)>, // label -> (threat, product)
        }

        let mut rows: Vec<RowAccumulator> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        let window_secs = ((window.1 - window.0) as f64 / 1000.0).max(0.001);

        for augmented in self.events() {
            let event = &augmented.event;
            let time_ms = self.time_ms(event.timestamp);
            if event.source_id != actor_id || time_ms < window.0 || time_ms > window.1 {
                continue;
            }
            let Some(ability_id) = event.ability_game_id else { continue };

            let key = if event.kind.is_resource() {
                format!("{}:{}", ability_id, event.kind.wire_name())
            } else {
                ability_id.to_string()
            };

            let event_threat: f64 = augmented
                .threat
                .changes
                .iter()
                .filter(|c| {
                    c.source_id == actor_id && (c.target_id, c.target_instance) == target
                })
                .map(|c| c.amount)
                .sum();

            let amount = match event.kind {
                EventKind::Damage | EventKind::Absorbed => event.amount.unwrap_or(0),
                EventKind::Heal => {
                    (event.amount.unwrap_or(0) - event.overheal.unwrap_or(0)).max(0)
                }
                _ => 0,
            };

            let is_fixate = augmented.threat.calculation.effects.iter().any(|e| {
                matches!(e, ThreatEffect::State { kind: StateKind::Fixate, .. })
            });

            let idx = *index.entry(key.clone()).or_insert_with(|| {
                rows.push(RowAccumulator {
                    row: AbilityRow {
                        key: key.clone(),
                        ability_id,
                        name: self.ability_name(Some(ability_id)),
                        amount: 0,
                        threat: 0.0,
                        tps: None,
                        is_heal: false,
                        is_fixate: false,
                        modifier_label: None,
                        modifier_product: 1.0,
                    },
                    variants: HashMap::new(),
                });
                rows.len() - 1
            });

            let accumulator = &mut rows[idx];
            accumulator.row.amount += amount;
            accumulator.row.threat += event_threat;
            accumulator.row.is_heal |= event.kind == EventKind::Heal;
            accumulator.row.is_fixate |= is_fixate;

            let modifiers = &augmented.threat.calculation.modifiers;
            if !modifiers.is_empty() {
                let label = modifiers
                    .iter()
                    .map(|m| m.label.as_str())
                    .collect::<Vec<_>>()
                    .join(" × ");
                let product: f64 = modifiers.iter().map(|m| m.value).product();
                let entry = accumulator.variants.entry(label).or_insert((0.0, product));
                entry.0 += event_threat;
            }
        }

        let mut result: Vec<AbilityRow> = rows
            .into_iter()
            .map(|mut accumulator| {
                let mut variants: Vec<(String, (f64, f64))> =
                    accumulator.variants.into_iter().collect();
                variants.sort_by(|a, b| {
                    b.1 .0
                        .partial_cmp(&a.1 .0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.0.cmp(&b.0))
                });
                if let Some((label, (_, product))) = variants.into_iter().next() {
                    accumulator.row.modifier_label = Some(label);
                    accumulator.row.modifier_product = product;
                }
                if !accumulator.row.is_fixate {
                    accumulator.row.tps = Some(accumulator.row.threat / window_secs);
                }
                accumulator.row
            })
            .collect();

        result.sort_by(|a, b| {
            b.threat
                .abs()
                .partial_cmp(&a.threat.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.amount.cmp(&a.amount))
                .then_with(|| a.name.cmp(&b.name))
        });
        result
    }
}

//! Per-actor chart series of threat points against the selected target.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::actor::ActorId;
use crate::threat::{AppliedModifier, MarkerKind, StateKind, StatePhase, ThreatEffect};

use super::{FightQuery, TargetKey};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: i64,
    pub time_ms: i64,
    pub total_threat: f64,
    pub threat_delta: f64,
    pub formula: String,
    pub ability: String,
    pub school: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<AppliedModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerKind>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub actor_id: ActorId,
    pub name: String,
    pub pet: bool,
    pub points: Vec<ChartPoint>,
}

impl FightQuery<'_> {
    /// Ordered points per friendly player or pet. Markers and
    /// invulnerability starts produce zero-delta points so the chart has a
    /// vertex even without a threat change.
    pub fn chart_series(&self, target: TargetKey) -> Vec<Series> {
        let mut series: BTreeMap<ActorId, Series> = BTreeMap::new();

        for augmented in self.events() {
            let event = &augmented.event;
            let calculation = &augmented.threat.calculation;
            let timestamp = event.timestamp;
            let time_ms = self.time_ms(timestamp);

            for change in &augmented.threat.changes {
                if (change.target_id, change.target_instance) != target
                    || !self.is_series_actor(change.source_id)
                {
                    continue;
                }
                let point = ChartPoint {
                    timestamp,
                    time_ms,
                    total_threat: change.total,
                    threat_delta: change.amount,
                    formula: calculation.formula.clone(),
                    ability: self.ability_name(event.ability_game_id),
                    school: self.school_of(event.ability_game_id),
                    modifiers: calculation.modifiers.clone(),
                    marker: None,
                };
                self.push_point(&mut series, change.source_id, point);
            }

            for effect in &calculation.effects {
                match effect {
                    ThreatEffect::EventMarker { marker } => {
                        // Boss melee attaches to the struck actor, death to
                        // the dying one; both are the event target.
                        let actor_id = event.target_id;
                        if !self.is_series_actor(actor_id) {
                            continue;
                        }
                        let total = last_total(&series, actor_id);
                        let point = ChartPoint {
                            timestamp,
                            time_ms,
                            total_threat: total,
                            threat_delta: 0.0,
                            formula: calculation.formula.clone(),
                            ability: self.ability_name(event.ability_game_id),
                            school: self.school_of(event.ability_game_id),
                            modifiers: Vec::new(),
                            marker: Some(*marker),
                        };
                        self.push_point(&mut series, actor_id, point);
                    }
                    ThreatEffect::State {
                        kind: StateKind::Invulnerable,
                        phase: StatePhase::Start,
                        actor_id,
                        spell_id,
                        ..
                    } => {
                        if !self.is_series_actor(*actor_id) {
                            continue;
                        }
                        let total = last_total(&series, *actor_id);
                        let point = ChartPoint {
                            timestamp,
                            time_ms,
                            total_threat: total,
                            threat_delta: 0.0,
                            formula: "0".to_string(),
                            ability: self.ability_name(Some(*spell_id)),
                            school: self.school_of(Some(*spell_id)),
                            modifiers: Vec::new(),
                            marker: None,
                        };
                        self.push_point(&mut series, *actor_id, point);
                    }
                    _ => {}
                }
            }
        }

        series.into_values().collect()
    }

    fn push_point(&self, series: &mut BTreeMap<ActorId, Series>, actor_id: ActorId, point: ChartPoint) {
        let entry = series.entry(actor_id).or_insert_with(|| Series {
            actor_id,
            name: self.actor_name(actor_id),
            pet: self.actors.get(&actor_id).is_some_and(|a| a.is_pet()),
            points: Vec::new(),
        });
        if entry.points.is_empty() {
            // Every series opens with a synthetic encounter-start point.
            entry.points.push(ChartPoint {
                timestamp: self.fight_start,
                time_ms: 0,
                total_threat: 0.0,
                threat_delta: 0.0,
                formula: "0".to_string(),
                ability: "Encounter Start".to_string(),
                school: "Physical",
                modifiers: Vec::new(),
                marker: None,
            });
        }
        entry.points.push(point);
    }
}

fn last_total(series: &BTreeMap<ActorId, Series>, actor_id: ActorId) -> f64 {
    series
        .get(&actor_id)
        .and_then(|s| s.points.last())
        .map(|p| p.total_threat)
        .unwrap_or(0.0)
}

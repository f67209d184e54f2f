//! Translate a calculation and its effects into per-(source, enemy)
//! threat deltas.

use crate::actor::{ActorId, ActorRef, InstanceId, ENVIRONMENT_ID};
use crate::event::{EventKind, LogEvent};
use crate::fight::FightState;

use super::{ChangeOp, ModifyScope, ThreatCalculation, ThreatChange, ThreatEffect};

type EnemyKey = (ActorId, InstanceId);

/// Apply one event's calculation to the threat table. Returns the emitted
/// changes in application order.
pub fn apply_threat(
    event: &LogEvent,
    calculation: &ThreatCalculation,
    recipient: ActorId,
    state: &mut FightState,
) -> Vec<ThreatChange> {
    let mut changes: Vec<ThreatChange> = Vec::new();

    if event.kind == EventKind::Death {
        let target_friendly = state.resolve_friendly(event.target_id, event.target_is_friendly);
        if target_friendly {
            // Death wipes the actor's entire table; one set change per
            // previously non-zero pair.
            for ((enemy_id, enemy_instance), _previous) in
                state.clear_all_threat_for_actor(event.target_id)
            {
                if enemy_id == ENVIRONMENT_ID {
                    continue;
                }
                changes.push(ThreatChange {
                    source_id: event.target_id,
                    target_id: enemy_id,
                    target_instance: enemy_instance,
                    operator: ChangeOp::Set,
                    amount: 0.0,
                    total: 0.0,
                });
            }
        }
        // Enemy deaths change no threat; liveness was updated in state.
        return changes;
    }

    if !state.is_actor_alive(event.source_ref()) {
        return changes;
    }

    let source_friendly = state.resolve_friendly(event.source_id, event.source_is_friendly);

    for effect in &calculation.effects {
        match effect {
            ThreatEffect::CustomThreat { changes: custom } => {
                for change in custom {
                    if change.source_id == ENVIRONMENT_ID || change.target_id == ENVIRONMENT_ID {
                        continue;
                    }
                    let (applied, total) = state.apply_change(
                        change.source_id,
                        (change.target_id, change.target_instance),
                        change.operator,
                        change.amount,
                    );
                    if change.operator == ChangeOp::Add && applied == 0.0 {
                        continue;
                    }
                    changes.push(ThreatChange {
                        source_id: change.source_id,
                        target_id: change.target_id,
                        target_instance: change.target_instance,
                        operator: change.operator,
                        amount: applied,
                        total,
                    });
                }
            }
            ThreatEffect::ModifyThreat { multiplier, target: ModifyScope::Target } => {
                if source_friendly || event.source_id == ENVIRONMENT_ID {
                    continue;
                }
                let enemy = (event.source_id, event.source_instance.unwrap_or(0));
                let old = state.threat(recipient, enemy);
                if old == 0.0 || recipient == ENVIRONMENT_ID {
                    continue;
                }
                let total = state.set_threat(recipient, enemy, old * multiplier);
                changes.push(ThreatChange {
                    source_id: recipient,
                    target_id: enemy.0,
                    target_instance: enemy.1,
                    operator: ChangeOp::Set,
                    amount: total,
                    total,
                });
            }
            ThreatEffect::ModifyThreat { multiplier, target: ModifyScope::All } => {
                if source_friendly {
                    // The actor's own threat shrinks against every enemy.
                    for (enemy, old) in actor_pairs(state, event.source_id) {
                        if enemy.0 == ENVIRONMENT_ID || old == 0.0 {
                            continue;
                        }
                        let total = state.set_threat(event.source_id, enemy, old * multiplier);
                        changes.push(ThreatChange {
                            source_id: event.source_id,
                            target_id: enemy.0,
                            target_instance: enemy.1,
                            operator: ChangeOp::Set,
                            amount: total,
                            total,
                        });
                    }
                } else {
                    // Every actor's threat against this enemy changes.
                    let enemy = (event.source_id, event.source_instance.unwrap_or(0));
                    if enemy.0 == ENVIRONMENT_ID {
                        continue;
                    }
                    for (actor_id, old) in state.all_actor_threat(enemy) {
                        if old == 0.0 || actor_id == ENVIRONMENT_ID {
                            continue;
                        }
                        let total = state.set_threat(actor_id, enemy, old * multiplier);
                        changes.push(ThreatChange {
                            source_id: actor_id,
                            target_id: enemy.0,
                            target_instance: enemy.1,
                            operator: ChangeOp::Set,
                            amount: total,
                            total,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    apply_base_threat(event, calculation, recipient, state, &mut changes);
    changes
}

fn apply_base_threat(
    event: &LogEvent,
    calculation: &ThreatCalculation,
    recipient: ActorId,
    state: &mut FightState,
    changes: &mut Vec<ThreatChange>,
) {
    let modified = calculation.modified_threat;
    if modified == 0.0 || recipient == ENVIRONMENT_ID {
        return;
    }

    if calculation.is_split {
        let keys: Vec<EnemyKey> =
            state.alive_enemies().iter().map(|e| (e.id, e.instance)).collect();
        if keys.is_empty() {
            return;
        }
        let share = modified / keys.len() as f64;
        for key in keys {
            let (applied, total) = state.add_threat(recipient, key, share);
            if applied == 0.0 {
                continue;
            }
            changes.push(ThreatChange {
                source_id: recipient,
                target_id: key.0,
                target_instance: key.1,
                operator: ChangeOp::Add,
                amount: applied,
                total,
            });
        }
        return;
    }

    // Single-target application: absorbed events prefer a known attacker,
    // everything else resolves against the event target.
    let key: EnemyKey = if event.kind == EventKind::Absorbed
        && let Some(attacker_id) = event.attacker_id
        && let Some(enemy) = state.enemy_by_id(attacker_id)
    {
        (enemy.id, enemy.instance)
    } else {
        let target = event.target_ref();
        (target.id, target.instance)
    };

    if key.0 == ENVIRONMENT_ID || !state.is_enemy_key(ActorRef::new(key.0, key.1)) {
        return;
    }
    let (applied, total) = state.add_threat(recipient, key, modified);
    if applied != 0.0 {
        changes.push(ThreatChange {
            source_id: recipient,
            target_id: key.0,
            target_instance: key.1,
            operator: ChangeOp::Add,
            amount: applied,
            total,
        });
    }
}

/// The actor's threat pairs in deterministic order: declared enemies
/// first, then any extra keys sorted.
fn actor_pairs(state: &FightState, actor_id: ActorId) -> Vec<(EnemyKey, f64)> {
    let mut pairs: Vec<(EnemyKey, f64)> = Vec::new();
    let mut seen: Vec<EnemyKey> = Vec::new();
    for enemy in state.enemies() {
        let key = (enemy.id, enemy.instance);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        pairs.push((key, state.threat(actor_id, key)));
    }
    for (key, value) in state.all_enemy_threat_entries(actor_id) {
        if !seen.contains(&key) {
            pairs.push((key, value));
        }
    }
    pairs
}

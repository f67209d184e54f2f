//! State overlay windows: fixate, aggro-loss, and invulnerability.

use serde::Serialize;

use crate::actor::{ActorId, SpellId};
use crate::threat::{StateKind, StatePhase, ThreatEffect};

use super::FightQuery;

/// A non-overlapping visual segment labelled by the most recently started
/// active state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSegment {
    pub start_ms: i64,
    pub end_ms: i64,
    pub kind: StateKind,
    pub spell_id: SpellId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorOverlay {
    pub segments: Vec<StateSegment>,
    pub fixate_windows: Vec<StateWindow>,
    pub invulnerable_windows: Vec<StateWindow>,
}

struct StateEntry {
    time_ms: i64,
    seq: u64,
    kind: StateKind,
    spell_id: SpellId,
    phase: StatePhase,
}

struct ActiveState {
    kind: StateKind,
    spell_id: SpellId,
    started_ms: i64,
    seq: u64,
}

impl FightQuery<'_> {
    /// Overlay windows for one actor. Unterminated states close at fight
    /// end.
    pub fn state_overlay(&self, actor_id: ActorId) -> ActorOverlay {
        let mut entries: Vec<StateEntry> = Vec::new();
        let mut seq = 0u64;

        for augmented in self.events() {
            let time_ms = self.time_ms(augmented.event.timestamp);
            for effect in &augmented.threat.calculation.effects {
                if let ThreatEffect::State { kind, phase, spell_id, actor_id: actor, .. } = effect
                {
                    seq += 1;
                    if *actor == actor_id {
                        entries.push(StateEntry {
                            time_ms,
                            seq,
                            kind: *kind,
                            spell_id: *spell_id,
                            phase: *phase,
                        });
                    }
                }
            }
        }
        entries.sort_by_key(|e| (e.time_ms, e.seq));

        let mut overlay = ActorOverlay::default();
        let mut active: Vec<ActiveState> = Vec::new();
        let mut cursor = 0i64;

        let mut fixate_open: Option<i64> = None;
        let mut invulnerable_open: Option<i64> = None;

        for entry in entries {
            if entry.time_ms > cursor
                && let Some(top) = top_state(&active)
            {
                overlay.segments.push(StateSegment {
                    start_ms: cursor,
                    end_ms: entry.time_ms,
                    kind: top.kind,
                    spell_id: top.spell_id,
                });
            }
            cursor = cursor.max(entry.time_ms);

            match entry.phase {
                StatePhase::Start => {
                    // Re-applying the same state restarts it.
                    active.retain(|s| (s.kind, s.spell_id) != (entry.kind, entry.spell_id));
                    active.push(ActiveState {
                        kind: entry.kind,
                        spell_id: entry.spell_id,
                        started_ms: entry.time_ms,
                        seq: entry.seq,
                    });
                }
                StatePhase::End => {
                    active.retain(|s| (s.kind, s.spell_id) != (entry.kind, entry.spell_id));
                }
            }

            update_window(&mut fixate_open, &mut overlay.fixate_windows, &active, StateKind::Fixate, entry.time_ms);
            update_window(
                &mut invulnerable_open,
                &mut overlay.invulnerable_windows,
                &active,
                StateKind::Invulnerable,
                entry.time_ms,
            );
        }

        let end_ms = self.fight_end_ms().max(cursor);
        if let Some(top) = top_state(&active)
            && end_ms > cursor
        {
            overlay.segments.push(StateSegment {
                start_ms: cursor,
                end_ms,
                kind: top.kind,
                spell_id: top.spell_id,
            });
        }
        if let Some(start_ms) = fixate_open {
            overlay.fixate_windows.push(StateWindow { start_ms, end_ms });
        }
        if let Some(start_ms) = invulnerable_open {
            overlay.invulnerable_windows.push(StateWindow { start_ms, end_ms });
        }

        overlay
    }
}

/// Most recently started active state; ties break by sequence number,
/// latest wins.
fn top_state(active: &[ActiveState]) -> Option<&ActiveState> {
    active.iter().max_by_key(|s| (s.started_ms, s.seq))
}

fn update_window(
    open: &mut Option<i64>,
    windows: &mut Vec<StateWindow>,
    active: &[ActiveState],
    kind: StateKind,
    time_ms: i64,
) {
    let any_active = active.iter().any(|s| s.kind == kind);
    match (any_active, open.as_ref()) {
        (true, None) => *open = Some(time_ms),
        (false, Some(&start_ms)) => {
            if time_ms > start_ms {
                windows.push(StateWindow { start_ms, end_ms: time_ms });
            }
            *open = None;
        }
        _ => {}
    }
}

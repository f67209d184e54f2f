//! The two-pass event pipeline for one encounter.
//!
//! Pass one (prepass) lets processors observe the raw sorted stream and
//! infer starting state. Pass two replays every event through the
//! `FightState`, the interceptor tracker, the threat calculator, and the
//! applier, producing one augmented event per input event.
//!
//! A run is strictly single-threaded and deterministic: the same input
//! yields byte-identical output. Fights of one report are independent and
//! may be fanned out with [`run_fights`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use serde::Serialize;

use crate::actor::{Actor, ActorId, Enemy, SpellId};
use crate::config::{prepare_threat_config, PreparedConfig, ThreatConfig};
use crate::event::{AugmentedEvent, EventKind, LogEvent};
use crate::fight::FightState;
use crate::input::{FightMeta, ReportMeta};
use crate::processors::{
    builtin_processors, Namespace, ProcessorContext, EXPLICIT_INITIAL_AURAS,
    INITIAL_AURA_ADDITIONS,
};
use crate::threat::{
    apply_threat, calculate_threat, AuraAction, CalculationOutcome, InterceptorTracker,
    ThreatAnnotation, ThreatEffect,
};

/// Everything the engine needs for one encounter.
pub struct EngineInput {
    pub raw_events: Vec<LogEvent>,
    pub actors: HashMap<ActorId, Actor>,
    pub friendly_actor_ids: HashSet<ActorId>,
    pub ability_schools: HashMap<SpellId, u8>,
    pub enemies: Vec<Enemy>,
    pub encounter_id: Option<i64>,
    pub report: Option<ReportMeta>,
    pub fight: Option<FightMeta>,
    pub infer_threat_reduction: bool,
    pub tank_actor_ids: Option<Vec<ActorId>>,
    pub initial_auras_by_actor: BTreeMap<ActorId, Vec<SpellId>>,
    pub config: Arc<ThreatConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOutput {
    pub augmented_events: Vec<AugmentedEvent>,
    /// Visible events per type tag; `combatantinfo` is excluded.
    pub event_counts: BTreeMap<&'static str, u64>,
    /// Merged seeds: explicit seeds, `combatantinfo` auras, and processor
    /// additions, deduplicated and sorted.
    pub initial_auras_by_actor: BTreeMap<ActorId, Vec<SpellId>>,
}

/// Replay one encounter.
pub fn run_fight(input: EngineInput) -> EngineOutput {
    let prepared = prepare_threat_config(&input.config);
    let EngineInput {
        mut raw_events,
        actors,
        friendly_actor_ids,
        ability_schools,
        enemies,
        encounter_id,
        report,
        fight,
        infer_threat_reduction,
        tank_actor_ids,
        initial_auras_by_actor,
        config: _,
    } = input;

    if raw_events.windows(2).any(|pair| pair[0].timestamp > pair[1].timestamp) {
        tracing::warn!("event stream out of timestamp order; re-sorting");
    }
    // Stable sort: ties keep input order.
    raw_events.sort_by_key(|e| e.timestamp);

    let mut processors = {
        let ctx = ProcessorContext {
            report: report.as_ref(),
            fight: fight.as_ref(),
            infer_threat_reduction,
            tank_actor_ids: tank_actor_ids.as_deref(),
            actors: &actors,
            friendly_actor_ids: &friendly_actor_ids,
        };
        builtin_processors(&ctx)
    };

    let explicit_seeds: BTreeMap<ActorId, BTreeSet<SpellId>> = initial_auras_by_actor
        .into_iter()
        .map(|(actor, spells)| (actor, spells.into_iter().collect()))
        .collect();

    let mut ns = Namespace::new();
    ns.insert(EXPLICIT_INITIAL_AURAS, explicit_seeds.clone());

    // Prepass: processors observe the raw stream; no fight state exists.
    for processor in &mut processors {
        processor.init(&mut ns);
    }
    for event in &raw_events {
        for processor in &mut processors {
            processor.visit_prepass(event, &mut ns);
        }
    }
    for processor in &mut processors {
        processor.finalize_prepass(&mut ns);
    }

    let mut merged_seeds = explicit_seeds;
    if let Some(additions) = ns.get(INITIAL_AURA_ADDITIONS) {
        for (actor, spells) in additions {
            merged_seeds.entry(*actor).or_default().extend(spells.iter().copied());
        }
    }

    let mut state = FightState::new(actors, friendly_actor_ids, enemies, ability_schools);
    for (actor, spells) in &merged_seeds {
        for spell in spells {
            state.seed_aura(*actor, *spell, &prepared);
        }
    }

    let mut interceptors = InterceptorTracker::new();
    let mut augmented_events = Vec::with_capacity(raw_events.len());
    let mut event_counts: BTreeMap<&'static str, u64> = BTreeMap::new();

    for event in raw_events {
        let mut effects: Vec<ThreatEffect> = Vec::new();
        for processor in &mut processors {
            processor.before_fight_state(&event, &state, &mut ns, &mut effects);
        }
        // Aura edits must be visible to the calculator for this event.
        apply_aura_mutations(&mut state, &effects, &prepared);

        state.process_event(&event, &prepared);

        let CalculationOutcome { mut calculation, recipient } = calculate_threat(
            &event,
            &mut state,
            &prepared,
            &mut interceptors,
            effects,
            encounter_id,
        );

        for effect in calculation
            .effects
            .extract_if(.., |e| matches!(e, ThreatEffect::InstallInterceptor { .. }))
        {
            if let ThreatEffect::InstallInterceptor { interceptor } = effect {
                interceptors.install(interceptor, event.timestamp);
            }
        }

        let changes = apply_threat(&event, &calculation, recipient, &mut state);

        for processor in &mut processors {
            let mut after_effects = Vec::new();
            processor.after_fight_state(&event, &state, &mut ns, &mut after_effects);
            apply_aura_mutations(&mut state, &after_effects, &prepared);
            calculation.effects.extend(after_effects);
        }

        if event.kind != EventKind::CombatantInfo {
            *event_counts.entry(event.kind.wire_name()).or_insert(0) += 1;
        }

        augmented_events.push(AugmentedEvent {
            event,
            threat: ThreatAnnotation { calculation, changes },
        });
    }

    // The state absorbed combatantinfo and implication seeds during the
    // pass; fold them into the merged output.
    for (actor, spells) in state.seeded_auras() {
        merged_seeds.entry(*actor).or_default().extend(spells.iter().copied());
    }

    EngineOutput {
        augmented_events,
        event_counts,
        initial_auras_by_actor: merged_seeds
            .into_iter()
            .map(|(actor, spells)| (actor, spells.into_iter().collect()))
            .collect(),
    }
}

/// Run independent fights of one report in parallel. Each run owns its
/// state; outputs come back in input order.
pub fn run_fights(inputs: Vec<EngineInput>) -> Vec<EngineOutput> {
    inputs.into_par_iter().map(run_fight).collect()
}

fn apply_aura_mutations(
    state: &mut FightState,
    effects: &[ThreatEffect],
    config: &PreparedConfig,
) {
    for effect in effects {
        if let ThreatEffect::AuraMutation { action, spell_id, actor_ids } = effect {
            for &actor_id in actor_ids {
                match action {
                    AuraAction::Apply => state.set_aura(actor_id, *spell_id, config),
                    AuraAction::Remove => state.remove_aura(actor_id, *spell_id),
                }
            }
        }
    }
}

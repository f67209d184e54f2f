//! Per-event threat calculation: interceptors, formula dispatch, and
//! multiplier accumulation.

use crate::actor::ActorId;
use crate::config::{FormulaResult, PreparedConfig};
use crate::event::{EventKind, LogEvent};
use crate::fight::FightState;
use crate::game_data::{school, MELEE};

use super::interceptor::InterceptorTracker;
use super::{
    extract_amount, AppliedModifier, AuraAction, MarkerKind, StatePhase, ThreatCalculation,
    ThreatContext, ThreatEffect,
};

/// Result of the calculation stage for one event.
pub struct CalculationOutcome {
    pub calculation: ThreatCalculation,
    /// Actor the threat is attributed to; differs from the event source
    /// when an interceptor redirected it.
    pub recipient: ActorId,
}

enum Dispatch {
    /// A formula produced a result.
    Result(FormulaResult),
    /// A formula existed but returned `None`: no threat for this phase,
    /// and no base-formula fallback.
    Declined,
    /// The event type carries no formula at all.
    NoFormula,
}

/// Run steps 1-9 of the calculation for one event. The state is only
/// mutated by interceptor-requested aura edits, which must be visible to
/// the formulas for the same event.
pub fn calculate_threat(
    event: &LogEvent,
    state: &mut FightState,
    config: &PreparedConfig,
    interceptors: &mut InterceptorTracker,
    processor_effects: Vec<ThreatEffect>,
    encounter_id: Option<i64>,
) -> CalculationOutcome {
    let source_friendly = state.resolve_friendly(event.source_id, event.source_is_friendly);
    let target_friendly = state.resolve_friendly(event.target_id, event.target_is_friendly);
    let amount = extract_amount(event);

    // Boss melee marker: melee damage from a hostile source onto a
    // friendly actor is annotated for the chart, never calculated.
    if event.kind == EventKind::Damage
        && event.ability_game_id == Some(MELEE)
        && !source_friendly
        && target_friendly
    {
        let mut calculation = ThreatCalculation::zero("0 (boss melee marker)", amount);
        calculation.effects.push(ThreatEffect::EventMarker { marker: MarkerKind::BossMelee });
        calculation.effects.extend(processor_effects);
        return CalculationOutcome { calculation, recipient: event.source_id };
    }

    let outcome = interceptors.run(event, state);
    for (action, actor_id, spell_id) in &outcome.aura_ops {
        match action {
            AuraAction::Apply => state.set_aura(*actor_id, *spell_id, config),
            AuraAction::Remove => state.remove_aura(*actor_id, *spell_id),
        }
    }

    if outcome.skip {
        let mut calculation = ThreatCalculation::zero("0 (suppressed by effect)", amount);
        calculation.effects.extend(processor_effects);
        return CalculationOutcome { calculation, recipient: event.source_id };
    }

    let recipient = outcome.recipient_override.unwrap_or(event.source_id);

    let school_mask = event
        .ability_game_id
        .map(|s| state.ability_school(s))
        .unwrap_or(school::PHYSICAL);

    let dispatch = {
        let ctx = ThreatContext {
            event,
            amount,
            school_mask,
            source_auras: state.auras_for(event.source_id),
            target_auras: state.auras_for(event.target_id),
            source: state.actor(event.source_id),
            target: state.actor(event.target_id),
            encounter_id,
            state,
        };

        let ability_formula =
            event.ability_game_id.and_then(|spell_id| config.abilities.get(&spell_id));
        if let Some(formula) = ability_formula {
            match formula(&ctx) {
                Some(result) => Dispatch::Result(result),
                None => Dispatch::Declined,
            }
        } else {
            let base = match event.kind {
                EventKind::Damage => Some(&config.base_threat.damage),
                EventKind::Absorbed => Some(&config.base_threat.absorbed),
                EventKind::Heal => Some(&config.base_threat.heal),
                EventKind::Energize | EventKind::ResourceChange => {
                    Some(&config.base_threat.energize)
                }
                _ => None,
            };
            match base {
                Some(formula) => match formula(&ctx) {
                    Some(result) => Dispatch::Result(result),
                    None => Dispatch::Declined,
                },
                None => Dispatch::NoFormula,
            }
        }
    };

    let mut calculation = match dispatch {
        Dispatch::Result(result) => {
            build_calculation(event, state, config, result, amount, school_mask)
        }
        Dispatch::Declined => ThreatCalculation::zero("0 (no threat)", amount),
        Dispatch::NoFormula => ThreatCalculation::zero("0", amount),
    };

    calculation.effects.extend(outcome.effects);
    calculation.effects.extend(processor_effects);

    if let Some(id) = encounter_id
        && let Some(encounter) = config.encounters.get(&id)
        && let Some(preprocessor) = &encounter.preprocessor
    {
        calculation.effects.extend(preprocessor(event, state));
    }

    append_state_effects(event, config, target_friendly, &mut calculation.effects);

    if event.kind == EventKind::Death && target_friendly {
        calculation.effects.push(ThreatEffect::EventMarker { marker: MarkerKind::Death });
    }

    CalculationOutcome { calculation, recipient }
}

fn build_calculation(
    event: &LogEvent,
    state: &FightState,
    config: &PreparedConfig,
    result: FormulaResult,
    amount: f64,
    school_mask: u8,
) -> ThreatCalculation {
    let apply_multipliers =
        result.apply_player_multipliers.unwrap_or(!event.kind.is_resource());

    let mut modifiers: Vec<AppliedModifier> = Vec::new();
    let mut product = 1.0;

    if apply_multipliers {
        if let Some(class) = state.actor(event.source_id).and_then(|a| a.class()) {
            let factor = config.base_threat_factor(class);
            if factor != 1.0 {
                modifiers.push(AppliedModifier { label: class.name().to_string(), value: factor });
                product *= factor;
            }
        }

        if let Some(auras) = state.auras_for(event.source_id) {
            // Sorted so the modifier list and the product are stable
            // across runs.
            let mut active: Vec<u32> = auras.iter().copied().collect();
            active.sort_unstable();
            for spell_id in active {
                if let Some(modifier) = config.aura_modifiers.get(&spell_id)
                    && modifier.matches(event.ability_game_id, school_mask)
                {
                    modifiers.push(AppliedModifier {
                        label: modifier.label.clone(),
                        value: modifier.multiplier,
                    });
                    product *= modifier.multiplier;
                }
            }
        }
    }

    if let Some(spell_modifier) = result.spell_modifier {
        product *= spell_modifier.value;
        modifiers.push(spell_modifier);
    }

    ThreatCalculation {
        formula: result.label,
        amount,
        base_threat: result.value,
        modified_threat: result.value * product,
        is_split: result.split_among_enemies,
        modifiers,
        effects: result.effects,
        note: result.note,
    }
}

/// Emit overlay state transitions for buff events matching the config's
/// fixate/aggro-loss/invulnerability sets. Stack removals leave the aura
/// active and produce no transition.
fn append_state_effects(
    event: &LogEvent,
    config: &PreparedConfig,
    target_friendly: bool,
    effects: &mut Vec<ThreatEffect>,
) {
    if !event.kind.is_aura_event() || event.kind.is_stack_loss() {
        return;
    }
    let Some(spell_id) = event.ability_game_id else { return };
    let Some(kind) = config.state_kind_for(spell_id) else { return };

    let phase = if event.kind.is_aura_loss() { StatePhase::End } else { StatePhase::Start };

    // A state debuff on an enemy (a taunt) belongs to the caster's
    // overlay, carrying the enemy as the bound target.
    let (actor_id, target_id, target_instance) = if target_friendly {
        (event.target_id, None, None)
    } else {
        (event.source_id, Some(event.target_id), Some(event.target_instance.unwrap_or(0)))
    };

    effects.push(ThreatEffect::State {
        kind,
        phase,
        spell_id,
        actor_id,
        target_id,
        target_instance,
    });
}

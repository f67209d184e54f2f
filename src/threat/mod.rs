//! Threat calculation output types and the per-event pipeline stages.

pub mod applier;
pub mod calculator;
pub mod interceptor;

#[cfg(test)]
mod calculator_tests;

pub use applier::apply_threat;
pub use calculator::{calculate_threat, CalculationOutcome};
pub use interceptor::{
    Interceptor, InterceptorAction, InterceptorCtx, InterceptorHandler, InterceptorTracker,
};

use serde::{Deserialize, Serialize};
use serde::ser::SerializeSeq;

use hashbrown::HashSet;

use crate::actor::{Actor, ActorId, InstanceId, SpellId};
use crate::event::LogEvent;
use crate::fight::FightState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOp {
    Add,
    Set,
}

/// One applied delta to a `(source, enemy)` threat pair. `total` is the
/// post-change running total from the threat table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatChange {
    pub source_id: ActorId,
    pub target_id: ActorId,
    pub target_instance: InstanceId,
    pub operator: ChangeOp,
    pub amount: f64,
    pub total: f64,
}

impl ThreatChange {
    pub fn add(source_id: ActorId, target_id: ActorId, target_instance: InstanceId, amount: f64) -> Self {
        Self { source_id, target_id, target_instance, operator: ChangeOp::Add, amount, total: 0.0 }
    }

    pub fn set(source_id: ActorId, target_id: ActorId, target_instance: InstanceId, amount: f64) -> Self {
        Self { source_id, target_id, target_instance, operator: ChangeOp::Set, amount, total: 0.0 }
    }
}

/// One multiplier row in a calculation, e.g. a stance or the class factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedModifier {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKind {
    Fixate,
    AggroLoss,
    Invulnerable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatePhase {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    BossMelee,
    Death,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuraAction {
    Apply,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifyScope {
    /// The recipient's threat against the event source.
    Target,
    /// Every affected pair (see the applier for the friendly/hostile
    /// split).
    All,
}

/// Side effects attached to a calculation. Formulas, processors,
/// interceptors, and encounter preprocessors all emit into the same list;
/// the applier pattern-matches once.
///
/// `InstallInterceptor` is consumed when the handler is registered and is
/// never stored on an augmented event, so serialized effect lists carry
/// only wire-level facts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum ThreatEffect {
    CustomThreat {
        changes: Vec<ThreatChange>,
    },
    ModifyThreat {
        multiplier: f64,
        target: ModifyScope,
    },
    InstallInterceptor {
        #[serde(skip)]
        interceptor: Interceptor,
    },
    AuraMutation {
        action: AuraAction,
        spell_id: SpellId,
        actor_ids: Vec<ActorId>,
    },
    State {
        #[serde(rename = "stateKind")]
        kind: StateKind,
        phase: StatePhase,
        spell_id: SpellId,
        actor_id: ActorId,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<ActorId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_instance: Option<InstanceId>,
    },
    EventMarker {
        marker: MarkerKind,
    },
}

impl ThreatEffect {
    /// Whether the effect edits threat totals when applied.
    pub fn edits_threat(&self) -> bool {
        matches!(self, ThreatEffect::CustomThreat { .. } | ThreatEffect::ModifyThreat { .. })
    }
}

fn serialize_wire_effects<S>(effects: &[ThreatEffect], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let wire: Vec<&ThreatEffect> = effects
        .iter()
        .filter(|e| !matches!(e, ThreatEffect::InstallInterceptor { .. }))
        .collect();
    let mut seq = serializer.serialize_seq(Some(wire.len()))?;
    for effect in wire {
        seq.serialize_element(effect)?;
    }
    seq.end()
}

/// How the threat for one event was computed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatCalculation {
    pub formula: String,
    pub amount: f64,
    pub base_threat: f64,
    pub modified_threat: f64,
    pub is_split: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<AppliedModifier>,
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "serialize_wire_effects")]
    pub effects: Vec<ThreatEffect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ThreatCalculation {
    /// A zero-threat calculation with just a formula label.
    pub fn zero(formula: impl Into<String>, amount: f64) -> Self {
        Self {
            formula: formula.into(),
            amount,
            base_threat: 0.0,
            modified_threat: 0.0,
            is_split: false,
            modifiers: Vec::new(),
            effects: Vec::new(),
            note: None,
        }
    }
}

/// The threat block attached to every augmented event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAnnotation {
    pub calculation: ThreatCalculation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<ThreatChange>,
}

/// Everything a formula may inspect for one event.
pub struct ThreatContext<'a> {
    pub event: &'a LogEvent,
    /// Extracted amount per event type (heal minus overheal, resource gain
    /// minus waste, ...).
    pub amount: f64,
    pub school_mask: u8,
    pub source_auras: Option<&'a HashSet<SpellId>>,
    pub target_auras: Option<&'a HashSet<SpellId>>,
    pub source: Option<&'a Actor>,
    pub target: Option<&'a Actor>,
    pub encounter_id: Option<i64>,
    pub state: &'a FightState,
}

impl ThreatContext<'_> {
    pub fn source_has_aura(&self, spell_id: SpellId) -> bool {
        self.source_auras.is_some_and(|auras| auras.contains(&spell_id))
    }

    pub fn target_has_aura(&self, spell_id: SpellId) -> bool {
        self.target_auras.is_some_and(|auras| auras.contains(&spell_id))
    }
}

/// Extract the threat-relevant amount for an event.
pub fn extract_amount(event: &LogEvent) -> f64 {
    use crate::event::EventKind;
    match event.kind {
        EventKind::Damage | EventKind::Absorbed => event.amount.unwrap_or(0) as f64,
        EventKind::Heal => {
            let amount = event.amount.unwrap_or(0) - event.overheal.unwrap_or(0);
            amount.max(0) as f64
        }
        EventKind::Energize | EventKind::ResourceChange => {
            let amount = event.resource_change.unwrap_or(0) - event.waste.unwrap_or(0);
            amount.max(0) as f64
        }
        _ => 0.0,
    }
}

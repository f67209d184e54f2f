//! Two-pass processor framework.
//!
//! Processors infer starting state the log does not record. The prepass
//! observes the raw sorted stream with no `FightState`; the main pass runs
//! around each event's state update and may enqueue effects, with aura
//! mutations applied inline so the threat calculator sees them for the
//! same event.

pub mod namespace;

mod initial_auras;
mod party;
mod salvation;
mod tranquil_air;

#[cfg(test)]
mod initial_auras_tests;
#[cfg(test)]
mod tranquil_air_tests;

pub use initial_auras::InferInitialAuras;
pub use namespace::{
    add_initial_aura, is_aura_seeded, Namespace, NamespaceKey, EXPLICIT_INITIAL_AURAS,
    INITIAL_AURA_ADDITIONS,
};
pub use party::{PartyDetection, PartyGroups, PARTY_GROUPS};
pub use salvation::MinmaxSalvation;
pub use tranquil_air::TranquilAir;

use hashbrown::{HashMap, HashSet};

use crate::actor::{Actor, ActorId};
use crate::event::LogEvent;
use crate::fight::FightState;
use crate::input::{FightMeta, ReportMeta};
use crate::threat::ThreatEffect;

/// Request-scoped context handed to processor factories.
pub struct ProcessorContext<'a> {
    pub report: Option<&'a ReportMeta>,
    pub fight: Option<&'a FightMeta>,
    pub infer_threat_reduction: bool,
    pub tank_actor_ids: Option<&'a [ActorId]>,
    pub actors: &'a HashMap<ActorId, Actor>,
    pub friendly_actor_ids: &'a HashSet<ActorId>,
}

pub trait Processor {
    /// Stable identity for diagnostics.
    fn id(&self) -> &'static str;

    fn init(&mut self, _ns: &mut Namespace) {}

    fn visit_prepass(&mut self, _event: &LogEvent, _ns: &mut Namespace) {}

    fn finalize_prepass(&mut self, _ns: &mut Namespace) {}

    fn before_fight_state(
        &mut self,
        _event: &LogEvent,
        _state: &FightState,
        _ns: &mut Namespace,
        _effects: &mut Vec<ThreatEffect>,
    ) {
    }

    fn after_fight_state(
        &mut self,
        _event: &LogEvent,
        _state: &FightState,
        _ns: &mut Namespace,
        _effects: &mut Vec<ThreatEffect>,
    ) {
    }
}

pub type ProcessorFactory = fn(&ProcessorContext<'_>) -> Option<Box<dyn Processor>>;

/// The built-in processor set in registration order. Factories opt out by
/// returning `None`; only infer-initial-auras runs unconditionally.
pub fn builtin_processors(ctx: &ProcessorContext<'_>) -> Vec<Box<dyn Processor>> {
    let factories: [ProcessorFactory; 4] = [
        InferInitialAuras::factory,
        MinmaxSalvation::factory,
        PartyDetection::factory,
        TranquilAir::factory,
    ];
    factories.iter().filter_map(|factory| factory(ctx)).collect()
}

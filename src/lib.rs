pub mod actor;
pub mod aggregate;
pub mod config;
pub mod engine;
pub mod event;
pub mod fight;
pub mod game_data;
pub mod input;
pub mod processors;
pub mod threat;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use actor::{Actor, ActorId, ActorKind, ActorRef, Class, Enemy, InstanceId, SpellId, ENVIRONMENT_ID};
pub use aggregate::{
    AbilityRow, ActorOverlay, ChartPoint, FightQuery, ModifierCount, PlayerSummary, RankingRow,
    Series, StateSegment, StateWindow, TargetOption, report_rankings,
};
pub use config::{
    AuraModifier, BaseFormulas, ClassConfig, EncounterConfig, FormulaFn, FormulaResult,
    PreparedConfig, TalentImplication, ThreatConfig, prepare_threat_config,
};
pub use engine::{EngineInput, EngineOutput, run_fight, run_fights};
pub use event::{AugmentedEvent, CombatantAura, EventKind, GearItem, LogEvent, Talent};
pub use fight::FightState;
pub use input::{
    AbilityInfo, EngineOptions, FightMeta, InputError, ReportMeta, ReportRanking,
    build_engine_input,
};
pub use processors::{Namespace, NamespaceKey, Processor, ProcessorContext};
pub use threat::{
    AppliedModifier, AuraAction, ChangeOp, Interceptor, InterceptorAction, InterceptorCtx,
    InterceptorTracker, MarkerKind, ModifyScope, StateKind, StatePhase, ThreatAnnotation,
    ThreatCalculation, ThreatChange, ThreatContext, ThreatEffect,
};

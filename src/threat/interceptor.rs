//! Transient per-event handlers installed by abilities like misdirection.
//!
//! Handlers live until they uninstall themselves; charge-limited and
//! time-windowed behaviours are expressed by the handler counting or
//! comparing against `installed_at` itself.

use std::fmt;

use crate::actor::{ActorId, SpellId};
use crate::event::LogEvent;
use crate::fight::FightState;

use super::{AuraAction, ThreatEffect};

/// What a handler decided for one event.
pub enum InterceptorAction {
    /// No effect on this event.
    Passthrough,
    /// Record the event with zero threat and no changes.
    Skip,
    /// Redirect attribution and/or contribute extra effects.
    Augment {
        threat_recipient_override: Option<ActorId>,
        effects: Vec<ThreatEffect>,
    },
}

/// Context handed to a handler per event.
pub struct InterceptorCtx<'a> {
    pub timestamp: i64,
    pub installed_at: i64,
    pub actors: &'a FightState,
    uninstall: bool,
    aura_ops: Vec<(AuraAction, ActorId, SpellId)>,
}

impl InterceptorCtx<'_> {
    /// Remove this handler after the current event.
    pub fn uninstall(&mut self) {
        self.uninstall = true;
    }

    pub fn set_aura(&mut self, actor_id: ActorId, spell_id: SpellId) {
        self.aura_ops.push((AuraAction::Apply, actor_id, spell_id));
    }

    pub fn remove_aura(&mut self, actor_id: ActorId, spell_id: SpellId) {
        self.aura_ops.push((AuraAction::Remove, actor_id, spell_id));
    }
}

pub trait InterceptorHandler: Send + Sync {
    fn on_event(&mut self, event: &LogEvent, ctx: &mut InterceptorCtx<'_>) -> InterceptorAction;
}

impl<F> InterceptorHandler for F
where
    F: FnMut(&LogEvent, &mut InterceptorCtx<'_>) -> InterceptorAction + Send + Sync,
{
    fn on_event(&mut self, event: &LogEvent, ctx: &mut InterceptorCtx<'_>) -> InterceptorAction {
        self(event, ctx)
    }
}

pub struct Interceptor {
    handler: Box<dyn InterceptorHandler>,
}

impl Interceptor {
    pub fn new(handler: impl InterceptorHandler + 'static) -> Self {
        Self { handler: Box::new(handler) }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor").finish_non_exhaustive()
    }
}

struct InstalledInterceptor {
    id: u64,
    installed_at: i64,
    interceptor: Interceptor,
}

/// Merged result of running every live handler for one event.
#[derive(Default)]
pub struct InterceptorOutcome {
    pub skip: bool,
    /// Last augment override wins when several handlers redirect.
    pub recipient_override: Option<ActorId>,
    pub effects: Vec<ThreatEffect>,
    /// Aura edits requested via the context, applied by the caller before
    /// formula dispatch.
    pub aura_ops: Vec<(AuraAction, ActorId, SpellId)>,
}

#[derive(Default)]
pub struct InterceptorTracker {
    next_id: u64,
    entries: Vec<InstalledInterceptor>,
}

impl InterceptorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; returns its monotonic id.
    pub fn install(&mut self, interceptor: Interceptor, timestamp: i64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(InstalledInterceptor { id, installed_at: timestamp, interceptor });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke every live handler for the event and merge their actions.
    /// All handlers run even when one skips; uninstalls take effect after
    /// the event.
    pub fn run(&mut self, event: &LogEvent, state: &FightState) -> InterceptorOutcome {
        let mut outcome = InterceptorOutcome::default();
        let mut uninstalled: Vec<u64> = Vec::new();

        for entry in &mut self.entries {
            let mut ctx = InterceptorCtx {
                timestamp: event.timestamp,
                installed_at: entry.installed_at,
                actors: state,
                uninstall: false,
                aura_ops: Vec::new(),
            };
            let action = entry.interceptor.handler.on_event(event, &mut ctx);
            if ctx.uninstall {
                uninstalled.push(entry.id);
            }
            outcome.aura_ops.extend(ctx.aura_ops);

            match action {
                InterceptorAction::Passthrough => {}
                InterceptorAction::Skip => outcome.skip = true,
                InterceptorAction::Augment { threat_recipient_override, effects } => {
                    if let Some(recipient) = threat_recipient_override {
                        outcome.recipient_override = Some(recipient);
                    }
                    outcome.effects.extend(effects);
                }
            }
        }

        if !uninstalled.is_empty() {
            self.entries.retain(|entry| !uninstalled.contains(&entry.id));
        }
        outcome
    }
}

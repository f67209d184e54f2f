//! Threat-config surface consumed by the engine.
//!
//! A [`ThreatConfig`] is authored per game version: base formulas by event
//! type, per-ability formulas, aura modifiers, class tables, state-spell
//! sets, and encounter preprocessors. The engine never interprets game
//! rules itself; everything version-specific lives here.

mod prepared;

pub use prepared::{prepare_threat_config, refresh_prepared_configs, PreparedConfig};

use std::fmt;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::actor::{Class, SpellId};
use crate::event::LogEvent;
use crate::fight::FightState;
use crate::threat::{AppliedModifier, ThreatContext, ThreatEffect};

/// A threat formula. Returning `None` means "no threat for this phase of
/// the ability" and suppresses the base-formula fallback.
pub type FormulaFn = Arc<dyn Fn(&ThreatContext<'_>) -> Option<FormulaResult> + Send + Sync>;

/// Per-encounter hook run on every event, e.g. cast-gap threat wipes.
pub type EncounterPreprocessorFn =
    Arc<dyn Fn(&LogEvent, &FightState) -> Vec<ThreatEffect> + Send + Sync>;

/// What a formula produced for one event.
pub struct FormulaResult {
    /// Human-readable formula label, e.g. `"2 * damage"`.
    pub label: String,
    pub value: f64,
    /// Distribute the result equally across all alive enemies.
    pub split_among_enemies: bool,
    /// Override the player-multiplier default (on except for resource
    /// events).
    pub apply_player_multipliers: Option<bool>,
    pub effects: Vec<ThreatEffect>,
    pub note: Option<String>,
    /// Extra multiplier supplied by the formula itself, applied regardless
    /// of the player-multiplier decision.
    pub spell_modifier: Option<AppliedModifier>,
}

impl FormulaResult {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            split_among_enemies: false,
            apply_player_multipliers: None,
            effects: Vec::new(),
            note: None,
            spell_modifier: None,
        }
    }

    pub fn split(mut self) -> Self {
        self.split_among_enemies = true;
        self
    }

    pub fn with_player_multipliers(mut self, apply: bool) -> Self {
        self.apply_player_multipliers = Some(apply);
        self
    }

    pub fn with_effect(mut self, effect: ThreatEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_spell_modifier(mut self, label: impl Into<String>, value: f64) -> Self {
        self.spell_modifier = Some(AppliedModifier { label: label.into(), value });
        self
    }
}

/// Formula that scales the extracted event amount by a constant factor.
pub fn scaled(label: impl Into<String>, factor: f64) -> FormulaFn {
    let label = label.into();
    Arc::new(move |ctx| Some(FormulaResult::new(label.clone(), ctx.amount * factor)))
}

/// Formula that scales the amount and splits it across alive enemies.
pub fn scaled_split(label: impl Into<String>, factor: f64) -> FormulaFn {
    let label = label.into();
    Arc::new(move |ctx| Some(FormulaResult::new(label.clone(), ctx.amount * factor).split()))
}

/// Formula with a fixed value independent of the event amount.
pub fn flat(label: impl Into<String>, value: f64) -> FormulaFn {
    let label = label.into();
    Arc::new(move |_ctx| Some(FormulaResult::new(label.clone(), value)))
}

/// Formula that generates no threat but keeps the event labelled.
pub fn zero() -> FormulaFn {
    Arc::new(|_ctx| Some(FormulaResult::new("0", 0.0)))
}

/// A threat multiplier granted by an active aura. Scoping fields restrict
/// the modifier to specific abilities or spell schools.
#[derive(Clone)]
pub struct AuraModifier {
    pub label: String,
    pub multiplier: f64,
    /// Only applies to these ability ids when set.
    pub spell_ids: Option<Vec<SpellId>>,
    /// Only applies to abilities in these schools when set.
    pub school_mask: Option<u8>,
}

impl AuraModifier {
    pub fn new(label: impl Into<String>, multiplier: f64) -> Self {
        Self { label: label.into(), multiplier, spell_ids: None, school_mask: None }
    }

    pub fn for_spells(mut self, spell_ids: Vec<SpellId>) -> Self {
        self.spell_ids = Some(spell_ids);
        self
    }

    pub fn for_schools(mut self, mask: u8) -> Self {
        self.school_mask = Some(mask);
        self
    }

    /// Whether the modifier applies to an event with the given ability and
    /// school.
    pub fn matches(&self, ability: Option<SpellId>, school: u8) -> bool {
        if let Some(ref ids) = self.spell_ids {
            match ability {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }
        if let Some(mask) = self.school_mask
            && mask & school == 0
        {
            return false;
        }
        true
    }
}

impl fmt::Debug for AuraModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuraModifier")
            .field("label", &self.label)
            .field("multiplier", &self.multiplier)
            .field("spell_ids", &self.spell_ids)
            .field("school_mask", &self.school_mask)
            .finish()
    }
}

/// Synthetic aura implied by talent points: `min_points` or more in tree
/// `tree` means the actor has `spell_id` (used for passive threat talents
/// the log never shows as buffs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TalentImplication {
    pub tree: usize,
    pub min_points: u32,
    pub spell_id: SpellId,
}

/// Base formulas by event type. `energize` also covers `resourcechange`.
#[derive(Clone)]
pub struct BaseFormulas {
    pub damage: FormulaFn,
    pub absorbed: FormulaFn,
    pub heal: FormulaFn,
    pub energize: FormulaFn,
}

impl Default for BaseFormulas {
    fn default() -> Self {
        Self { damage: zero(), absorbed: zero(), heal: zero(), energize: zero() }
    }
}

/// Per-class threat rules, merged over the globals with class entries
/// taking precedence.
#[derive(Clone)]
pub struct ClassConfig {
    /// Always-on class multiplier; 1.0 means no class modifier row.
    pub base_threat_factor: f64,
    pub abilities: HashMap<SpellId, FormulaFn>,
    pub aura_modifiers: HashMap<SpellId, AuraModifier>,
    /// Mutually-exclusive aura groups (stances, forms). Adding one removes
    /// the others in its group.
    pub exclusive_auras: Vec<Vec<SpellId>>,
    /// Seeding one aura implies others the log does not record.
    pub aura_implications: HashMap<SpellId, Vec<SpellId>>,
    /// Equipped item id (or permanent enchant id) implies a synthetic aura.
    pub gear_implications: HashMap<i64, SpellId>,
    pub talent_implications: Vec<TalentImplication>,
    pub fixate_buffs: HashSet<SpellId>,
    pub aggro_loss_buffs: HashSet<SpellId>,
    pub invulnerability_buffs: HashSet<SpellId>,
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            base_threat_factor: 1.0,
            abilities: HashMap::new(),
            aura_modifiers: HashMap::new(),
            exclusive_auras: Vec::new(),
            aura_implications: HashMap::new(),
            gear_implications: HashMap::new(),
            talent_implications: Vec::new(),
            fixate_buffs: HashSet::new(),
            aggro_loss_buffs: HashSet::new(),
            invulnerability_buffs: HashSet::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct EncounterConfig {
    pub preprocessor: Option<EncounterPreprocessorFn>,
}

/// The full per-game-version threat configuration.
#[derive(Clone, Default)]
pub struct ThreatConfig {
    pub base_threat: BaseFormulas,
    pub abilities: HashMap<SpellId, FormulaFn>,
    pub aura_modifiers: HashMap<SpellId, AuraModifier>,
    pub classes: HashMap<Class, ClassConfig>,
    pub encounters: HashMap<i64, EncounterConfig>,
    pub fixate_buffs: HashSet<SpellId>,
    pub aggro_loss_buffs: HashSet<SpellId>,
    pub invulnerability_buffs: HashSet<SpellId>,
}

impl ThreatConfig {
    pub fn new(base_threat: BaseFormulas) -> Self {
        Self { base_threat, ..Default::default() }
    }

    pub fn with_ability(mut self, spell_id: SpellId, formula: FormulaFn) -> Self {
        self.abilities.insert(spell_id, formula);
        self
    }

    pub fn with_aura_modifier(mut self, spell_id: SpellId, modifier: AuraModifier) -> Self {
        self.aura_modifiers.insert(spell_id, modifier);
        self
    }

    pub fn with_class(mut self, class: Class, config: ClassConfig) -> Self {
        self.classes.insert(class, config);
        self
    }

    pub fn with_encounter(mut self, encounter_id: i64, config: EncounterConfig) -> Self {
        self.encounters.insert(encounter_id, config);
        self
    }
}

impl fmt::Debug for ThreatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreatConfig")
            .field("abilities", &self.abilities.len())
            .field("aura_modifiers", &self.aura_modifiers.len())
            .field("classes", &self.classes.len())
            .field("encounters", &self.encounters.len())
            .finish_non_exhaustive()
    }
}

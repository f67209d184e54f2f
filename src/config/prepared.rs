//! Merged, engine-facing view of a [`ThreatConfig`].
//!
//! Class tables are overlaid onto the globals once per config instance and
//! the result is cached process-wide, keyed by config identity, so parallel
//! fight runs over the same config share one prepared view.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use hashbrown::{HashMap, HashSet};

use crate::actor::{Class, SpellId};
use crate::threat::StateKind;

use super::{AuraModifier, BaseFormulas, ClassConfig, EncounterConfig, FormulaFn, ThreatConfig};

pub struct PreparedConfig {
    pub base_threat: BaseFormulas,
    /// Global abilities overlaid by every class's abilities.
    pub abilities: HashMap<SpellId, FormulaFn>,
    /// Global aura modifiers overlaid by every class's modifiers.
    pub aura_modifiers: HashMap<SpellId, AuraModifier>,
    /// Union of all exclusive-aura groups across classes.
    pub exclusive_aura_groups: Vec<Vec<SpellId>>,
    pub fixate_buffs: HashSet<SpellId>,
    pub aggro_loss_buffs: HashSet<SpellId>,
    pub invulnerability_buffs: HashSet<SpellId>,
    pub encounters: HashMap<i64, EncounterConfig>,
    classes: HashMap<Class, ClassConfig>,
}

impl PreparedConfig {
    fn build(config: &ThreatConfig) -> Self {
        let mut abilities = config.abilities.clone();
        let mut aura_modifiers = config.aura_modifiers.clone();
        let mut exclusive_aura_groups = Vec::new();
        let mut fixate_buffs = config.fixate_buffs.clone();
        let mut aggro_loss_buffs = config.aggro_loss_buffs.clone();
        let mut invulnerability_buffs = config.invulnerability_buffs.clone();

        // Deterministic overlay order so conflicting class entries resolve
        // the same way every run.
        let mut classes: Vec<_> = config.classes.iter().collect();
        classes.sort_by_key(|(class, _)| class.name());

        for (_, class_config) in classes {
            for (id, formula) in &class_config.abilities {
                abilities.insert(*id, Arc::clone(formula));
            }
            for (id, modifier) in &class_config.aura_modifiers {
                aura_modifiers.insert(*id, modifier.clone());
            }
            exclusive_aura_groups.extend(class_config.exclusive_auras.iter().cloned());
            fixate_buffs.extend(class_config.fixate_buffs.iter().copied());
            aggro_loss_buffs.extend(class_config.aggro_loss_buffs.iter().copied());
            invulnerability_buffs.extend(class_config.invulnerability_buffs.iter().copied());
        }

        Self {
            base_threat: config.base_threat.clone(),
            abilities,
            aura_modifiers,
            exclusive_aura_groups,
            fixate_buffs,
            aggro_loss_buffs,
            invulnerability_buffs,
            encounters: config.encounters.clone(),
            classes: config.classes.clone(),
        }
    }

    pub fn class(&self, class: Class) -> Option<&ClassConfig> {
        self.classes.get(&class)
    }

    pub fn base_threat_factor(&self, class: Class) -> f64 {
        self.classes.get(&class).map_or(1.0, |c| c.base_threat_factor)
    }

    /// Which overlay state a spell drives, if any. Fixate wins over the
    /// others when a config lists a spell in several sets.
    pub fn state_kind_for(&self, spell_id: SpellId) -> Option<StateKind> {
        if self.fixate_buffs.contains(&spell_id) {
            Some(StateKind::Fixate)
        } else if self.aggro_loss_buffs.contains(&spell_id) {
            Some(StateKind::AggroLoss)
        } else if self.invulnerability_buffs.contains(&spell_id) {
            Some(StateKind::Invulnerable)
        } else {
            None
        }
    }

    /// The exclusive group a spell belongs to, if any.
    pub fn exclusive_group_for(&self, spell_id: SpellId) -> Option<&[SpellId]> {
        self.exclusive_aura_groups
            .iter()
            .find(|group| group.contains(&spell_id))
            .map(|group| group.as_slice())
    }
}

type CacheEntry = (Weak<ThreatConfig>, Arc<PreparedConfig>);

fn cache() -> &'static Mutex<HashMap<usize, CacheEntry>> {
    static CACHE: OnceLock<Mutex<HashMap<usize, CacheEntry>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Merge and cache the engine-facing view of a config. Subsequent calls
/// with the same `Arc` return the cached view; entries whose config has
/// been dropped are evicted opportunistically.
pub fn prepare_threat_config(config: &Arc<ThreatConfig>) -> Arc<PreparedConfig> {
    let key = Arc::as_ptr(config) as usize;
    let mut cache = cache().lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    cache.retain(|_, (weak, _)| weak.strong_count() > 0);

    if let Some((weak, prepared)) = cache.get(&key)
        && weak.ptr_eq(&Arc::downgrade(config))
    {
        return Arc::clone(prepared);
    }

    let prepared = Arc::new(PreparedConfig::build(config));
    cache.insert(key, (Arc::downgrade(config), Arc::clone(&prepared)));
    prepared
}

/// Drop every cached prepared view; the next `prepare_threat_config` call
/// rebuilds from scratch.
pub fn refresh_prepared_configs() {
    cache().lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
}

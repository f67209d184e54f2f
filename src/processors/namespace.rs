//! Typed key/value store shared between processors.
//!
//! Keys carry their value type at compile time; a lookup through the wrong
//! key type simply misses. Each processor declares its keys in one place to
//! avoid id collisions.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use hashbrown::HashMap;

use crate::actor::{ActorId, SpellId};

pub struct NamespaceKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> NamespaceKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }
}

impl<T> Clone for NamespaceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NamespaceKey<T> {}

#[derive(Default)]
pub struct Namespace {
    values: HashMap<&'static str, Box<dyn Any + Send>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + 'static>(&mut self, key: NamespaceKey<T>, value: T) {
        self.values.insert(key.name, Box::new(value));
    }

    pub fn get<T: 'static>(&self, key: NamespaceKey<T>) -> Option<&T> {
        self.values.get(key.name).and_then(|v| v.downcast_ref())
    }

    pub fn get_mut<T: 'static>(&mut self, key: NamespaceKey<T>) -> Option<&mut T> {
        self.values.get_mut(key.name).and_then(|v| v.downcast_mut())
    }

    pub fn get_or_insert_with<T: Send + 'static>(
        &mut self,
        key: NamespaceKey<T>,
        default: impl FnOnce() -> T,
    ) -> &mut T {
        self.values
            .entry(key.name)
            .or_insert_with(|| Box::new(default()))
            .downcast_mut()
            .expect("namespace key used with conflicting types")
    }

    pub fn remove<T: 'static>(&mut self, key: NamespaceKey<T>) -> Option<T> {
        self.values.remove(key.name).and_then(|v| v.downcast().ok()).map(|b| *b)
    }
}

/// Aura seeds accumulated by processors during the prepass, merged with
/// the explicit seeds before the main pass.
pub const INITIAL_AURA_ADDITIONS: NamespaceKey<BTreeMap<ActorId, BTreeSet<SpellId>>> =
    NamespaceKey::new("initial_aura_additions");

/// Seeds the engine was handed explicitly, readable by processors that
/// condition on what is already known.
pub const EXPLICIT_INITIAL_AURAS: NamespaceKey<BTreeMap<ActorId, BTreeSet<SpellId>>> =
    NamespaceKey::new("explicit_initial_auras");

/// Record an inferred initial aura for an actor.
pub fn add_initial_aura(ns: &mut Namespace, actor_id: ActorId, spell_id: SpellId) {
    ns.get_or_insert_with(INITIAL_AURA_ADDITIONS, BTreeMap::new)
        .entry(actor_id)
        .or_default()
        .insert(spell_id);
}

/// Union of explicit and inferred seeds for an actor.
pub fn seeded_auras_for(ns: &Namespace, actor_id: ActorId) -> BTreeSet<SpellId> {
    let mut seeds = BTreeSet::new();
    for key in [EXPLICIT_INITIAL_AURAS, INITIAL_AURA_ADDITIONS] {
        if let Some(map) = ns.get(key)
            && let Some(actor_seeds) = map.get(&actor_id)
        {
            seeds.extend(actor_seeds.iter().copied());
        }
    }
    seeds
}

/// Whether an aura is already known as a seed, explicit or inferred.
pub fn is_aura_seeded(ns: &Namespace, actor_id: ActorId, spell_id: SpellId) -> bool {
    let in_map = |key: NamespaceKey<BTreeMap<ActorId, BTreeSet<SpellId>>>| {
        ns.get(key)
            .and_then(|m| m.get(&actor_id))
            .is_some_and(|s| s.contains(&spell_id))
    };
    in_map(EXPLICIT_INITIAL_AURAS) || in_map(INITIAL_AURA_ADDITIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: NamespaceKey<u32> = NamespaceKey::new("test_counter");
    const LABELS: NamespaceKey<Vec<String>> = NamespaceKey::new("test_labels");

    #[test]
    fn typed_round_trip() {
        let mut ns = Namespace::new();
        ns.insert(COUNTER, 3);
        *ns.get_mut(COUNTER).unwrap() += 1;
        assert_eq!(ns.get(COUNTER), Some(&4));

        ns.get_or_insert_with(LABELS, Vec::new).push("a".to_string());
        assert_eq!(ns.get(LABELS).map(|v| v.len()), Some(1));
    }

    #[test]
    fn wrong_type_misses() {
        const CONFLICT: NamespaceKey<String> = NamespaceKey::new("test_counter");
        let mut ns = Namespace::new();
        ns.insert(COUNTER, 7);
        assert_eq!(ns.get(CONFLICT), None);
    }

    #[test]
    fn seed_helpers_deduplicate() {
        let mut ns = Namespace::new();
        add_initial_aura(&mut ns, 1, 25895);
        add_initial_aura(&mut ns, 1, 25895);
        assert!(is_aura_seeded(&ns, 1, 25895));
        assert!(!is_aura_seeded(&ns, 2, 25895));
        assert_eq!(ns.get(INITIAL_AURA_ADDITIONS).unwrap()[&1].len(), 1);
    }
}

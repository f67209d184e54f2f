//! Actor identity model shared across the engine.

use serde::{Deserialize, Serialize};

/// Actor id as reported by the log service. `-1` is the environment.
pub type ActorId = i64;
/// Disambiguates multiple entities sharing an actor id (duplicate adds).
pub type InstanceId = i32;
/// Game ability / spell id.
pub type SpellId = u32;

/// The pseudo-actor the log service uses for unattributable effects.
/// Never a threat source or target.
pub const ENVIRONMENT_ID: ActorId = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    Warrior,
    Paladin,
    Hunter,
    Rogue,
    Priest,
    Shaman,
    Mage,
    Warlock,
    Druid,
}

impl Class {
    pub fn name(&self) -> &'static str {
        match self {
            Class::Warrior => "Warrior",
            Class::Paladin => "Paladin",
            Class::Hunter => "Hunter",
            Class::Rogue => "Rogue",
            Class::Priest => "Priest",
            Class::Shaman => "Shaman",
            Class::Mage => "Mage",
            Class::Warlock => "Warlock",
            Class::Druid => "Druid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ActorKind {
    Player {
        #[serde(skip_serializing_if = "Option::is_none")]
        class: Option<Class>,
    },
    Pet {
        owner: ActorId,
    },
    #[serde(rename_all = "camelCase")]
    Npc {
        friendly: bool,
        boss: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(flatten)]
    pub kind: ActorKind,
}

impl Actor {
    pub fn player(id: ActorId, name: impl Into<String>, class: Class) -> Self {
        Self { id, name: name.into(), kind: ActorKind::Player { class: Some(class) } }
    }

    pub fn pet(id: ActorId, name: impl Into<String>, owner: ActorId) -> Self {
        Self { id, name: name.into(), kind: ActorKind::Pet { owner } }
    }

    pub fn npc(id: ActorId, name: impl Into<String>, boss: bool) -> Self {
        Self { id, name: name.into(), kind: ActorKind::Npc { friendly: false, boss } }
    }

    pub fn class(&self) -> Option<Class> {
        match self.kind {
            ActorKind::Player { class } => class,
            _ => None,
        }
    }

    pub fn pet_owner(&self) -> Option<ActorId> {
        match self.kind {
            ActorKind::Pet { owner } => Some(owner),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, ActorKind::Player { .. })
    }

    pub fn is_pet(&self) -> bool {
        matches!(self.kind, ActorKind::Pet { .. })
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.kind, ActorKind::Npc { boss: true, .. })
    }
}

/// An actor occurrence in the event stream: id plus the instance
/// disambiguator. Instance 0 is the default spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRef {
    pub id: ActorId,
    #[serde(default)]
    pub instance: InstanceId,
}

impl ActorRef {
    pub fn new(id: ActorId, instance: InstanceId) -> Self {
        Self { id, instance }
    }

    pub fn is_environment(&self) -> bool {
        self.id == ENVIRONMENT_ID
    }
}

/// A hostile actor selected as a tracked threat target for the fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enemy {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub instance: InstanceId,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "gameID")]
    pub game_id: Option<i64>,
}

impl Enemy {
    pub fn new(id: ActorId, name: impl Into<String>, instance: InstanceId) -> Self {
        Self { id, name: name.into(), instance, game_id: None }
    }

    pub fn key(&self) -> ActorRef {
        ActorRef::new(self.id, self.instance)
    }
}

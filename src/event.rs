//! Event model for the log-service stream.
//!
//! Events arrive pre-parsed from the log service as camelCase JSON records.
//! Every field beyond the type tag and timestamp is optional; the engine is
//! total over any sequence the service emits, so unknown type tags map to
//! [`EventKind::Unknown`] instead of failing deserialization.

use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, ActorRef, InstanceId, SpellId};
use crate::threat::ThreatAnnotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Damage,
    Heal,
    Absorbed,
    Energize,
    ResourceChange,
    Cast,
    BeginCast,
    ApplyBuff,
    RefreshBuff,
    ApplyBuffStack,
    RemoveBuff,
    RemoveBuffStack,
    ApplyDebuff,
    RefreshDebuff,
    ApplyDebuffStack,
    RemoveDebuff,
    RemoveDebuffStack,
    CombatantInfo,
    Death,
    Summon,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Wire tag for the kind, used for user-visible event counts.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::Damage => "damage",
            EventKind::Heal => "heal",
            EventKind::Absorbed => "absorbed",
            EventKind::Energize => "energize",
            EventKind::ResourceChange => "resourcechange",
            EventKind::Cast => "cast",
            EventKind::BeginCast => "begincast",
            EventKind::ApplyBuff => "applybuff",
            EventKind::RefreshBuff => "refreshbuff",
            EventKind::ApplyBuffStack => "applybuffstack",
            EventKind::RemoveBuff => "removebuff",
            EventKind::RemoveBuffStack => "removebuffstack",
            EventKind::ApplyDebuff => "applydebuff",
            EventKind::RefreshDebuff => "refreshdebuff",
            EventKind::ApplyDebuffStack => "applydebuffstack",
            EventKind::RemoveDebuff => "removedebuff",
            EventKind::RemoveDebuffStack => "removedebuffstack",
            EventKind::CombatantInfo => "combatantinfo",
            EventKind::Death => "death",
            EventKind::Summon => "summon",
            EventKind::Unknown => "unknown",
        }
    }

    /// Any buff or debuff lifecycle event.
    pub fn is_aura_event(&self) -> bool {
        self.is_aura_gain() || self.is_aura_loss() || self.is_stack_loss()
    }

    /// Aura application, refresh, or stack gain. The aura is active after
    /// these.
    pub fn is_aura_gain(&self) -> bool {
        matches!(
            self,
            EventKind::ApplyBuff
                | EventKind::RefreshBuff
                | EventKind::ApplyBuffStack
                | EventKind::ApplyDebuff
                | EventKind::RefreshDebuff
                | EventKind::ApplyDebuffStack
        )
    }

    /// Full aura removal.
    pub fn is_aura_loss(&self) -> bool {
        matches!(self, EventKind::RemoveBuff | EventKind::RemoveDebuff)
    }

    /// Stack removal; the aura itself remains active.
    pub fn is_stack_loss(&self) -> bool {
        matches!(self, EventKind::RemoveBuffStack | EventKind::RemoveDebuffStack)
    }

    pub fn is_buff_lifecycle(&self) -> bool {
        matches!(
            self,
            EventKind::ApplyBuff
                | EventKind::RefreshBuff
                | EventKind::ApplyBuffStack
                | EventKind::RemoveBuff
                | EventKind::RemoveBuffStack
        )
    }

    /// Resource-gain events; the log service emits both tags depending on
    /// game version.
    pub fn is_resource(&self) -> bool {
        matches!(self, EventKind::Energize | EventKind::ResourceChange)
    }

    pub fn is_cast(&self) -> bool {
        matches!(self, EventKind::Cast | EventKind::BeginCast)
    }
}

/// One aura entry from a `combatantinfo` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatantAura {
    pub source: ActorId,
    pub ability: SpellId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacks: Option<u32>,
}

/// One talent-tree entry from `combatantinfo`; position in the array is the
/// tree index.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Talent {
    pub id: u32,
    pub points: u32,
}

/// One equipped item from `combatantinfo`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GearItem {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permanent_enchant: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: i64,
    #[serde(rename = "sourceID")]
    pub source_id: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_instance: Option<InstanceId>,
    #[serde(rename = "targetID")]
    pub target_id: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_instance: Option<InstanceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_is_friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_is_friendly: Option<bool>,
    #[serde(rename = "abilityGameID", skip_serializing_if = "Option::is_none")]
    pub ability_game_id: Option<SpellId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overheal: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_type: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_change: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waste: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_change_type: Option<i32>,
    #[serde(rename = "attackerID", skip_serializing_if = "Option::is_none")]
    pub attacker_id: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacks: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auras: Vec<CombatantAura>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub talents: Vec<Talent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gear: Vec<GearItem>,
}

impl LogEvent {
    pub fn source_ref(&self) -> ActorRef {
        ActorRef::new(self.source_id, self.source_instance.unwrap_or(0))
    }

    pub fn target_ref(&self) -> ActorRef {
        ActorRef::new(self.target_id, self.target_instance.unwrap_or(0))
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

/// The input event plus the threat annotation produced by the engine.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentedEvent {
    #[serde(flatten)]
    pub event: LogEvent,
    pub threat: ThreatAnnotation,
}

//! Spell-id tables for threat-relevant game data.

use phf::{phf_set, Set};

use crate::actor::SpellId;

/// Melee swings log as ability 1.
pub const MELEE: SpellId = 1;

pub const BLESSING_OF_SALVATION: SpellId = 1038;
pub const GREATER_BLESSING_OF_SALVATION: SpellId = 25895;

/// Summon spell on the totem cast; the buff itself is a separate id.
pub const TRANQUIL_AIR_TOTEM: SpellId = 25908;
pub const TRANQUIL_AIR_BUFF: SpellId = 25909;

/// Long-duration paladin blessings, all ranks. Used by the salvation
/// inference to count how many blessing slots an actor already has filled.
pub static LONG_TERM_BLESSINGS: Set<u32> = phf_set! {
    // Blessing of Might
    19740u32, 19834u32, 19835u32, 19836u32, 19837u32, 19838u32, 25291u32,
    // Greater Blessing of Might
    25782u32, 25916u32,
    // Blessing of Wisdom
    19742u32, 19850u32, 19852u32, 19853u32, 19854u32, 25290u32,
    // Greater Blessing of Wisdom
    25894u32, 25918u32,
    // Blessing of Salvation / Greater
    1038u32, 25895u32,
    // Blessing of Light
    19977u32, 19978u32, 19979u32,
    // Greater Blessing of Light
    25890u32,
    // Blessing of Kings / Greater
    20217u32, 25898u32,
    // Blessing of Sanctuary
    20911u32, 20912u32, 20913u32, 20914u32,
    // Greater Blessing of Sanctuary
    25899u32,
};

/// Fallback ids for spells that only ever land on the caster's own party.
/// The party-detection processor also matches by name against the report's
/// ability table, so this set does not need to carry every rank.
pub static PARTY_SIGNAL_SPELLS: Set<u32> = phf_set! {
    // Prayer of Healing
    596u32, 996u32, 10960u32, 10961u32, 25316u32,
    // Circle of Healing
    34861u32, 34863u32,
    // Paladin auras
    465u32, 643u32, 1032u32, 10290u32, 10291u32, 10292u32, 10293u32,
    7294u32, 10298u32, 10299u32, 10300u32, 10301u32,
    19746u32, 20218u32,
    19876u32, 19895u32, 19896u32,
    19888u32, 19897u32, 19898u32,
    19891u32, 19899u32, 19900u32,
    // Warrior shouts
    6673u32, 5242u32, 6192u32, 11549u32, 11550u32, 11551u32, 25289u32,
    // Hunter
    19506u32, 20905u32, 20906u32,
    13159u32,
    // Druid
    24907u32,
    // Shaman party totem buffs
    8076u32, 8162u32, 8163u32, 10441u32, 25362u32,
    8836u32, 10626u32, 25360u32,
    8515u32, 10609u32, 10610u32,
    5677u32, 10491u32, 10493u32, 10494u32,
    // Bloodlust / Heroism
    2825u32, 32182u32,
};

/// Name-level matches for party-scoped signals, checked against the
/// report's ability table so unlisted ranks are still recognized.
pub static PARTY_SIGNAL_NAMES: Set<&'static str> = phf_set! {
    "Prayer of Healing",
    "Circle of Healing",
    "Prayer of Fortitude",
    "Devotion Aura",
    "Retribution Aura",
    "Concentration Aura",
    "Sanctity Aura",
    "Shadow Resistance Aura",
    "Fire Resistance Aura",
    "Frost Resistance Aura",
    "Battle Shout",
    "Commanding Shout",
    "Trueshot Aura",
    "Aspect of the Pack",
    "Moonkin Aura",
    "Strength of Earth",
    "Grace of Air",
    "Windfury Totem",
    "Mana Spring",
    "Bloodlust",
    "Heroism",
};

/// Position units per yard; distances in events use these units.
pub const POSITION_UNITS_PER_YARD: f64 = 200.0;

/// Totem aura radius: 30 yards.
pub const TRANQUIL_AIR_RANGE_UNITS: f64 = 30.0 * POSITION_UNITS_PER_YARD;

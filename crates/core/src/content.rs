//! Static item and threat tables consulted by the decision cascade.
//! This module exists so equipment precedence and gear gating stay immutable data.
//! It does not own inventory state or any decision logic.

use crate::types::Status;

pub mod names {
    pub const BOSS: &str = "IT";
    pub const BOSS_COUNTER: &str = "it isn't";
}

/// Equipment precedence, worst first. Names are lower-case; index is the score.
pub const EQUIPMENT_ORDER: &[&str] = &[
    "it isn't",
    "potion of fortitude",
    "potion of strength",
    "small health potion",
    "dagger of vindication",
    "skull breastplate",
    "skull helmet",
    "skull legplates",
    "bronze breastplate",
    "bronze helmet",
    "bronze legplates",
    "iron breastplate",
    "iron helmet",
    "iron legplates",
    "steel breastplate",
    "steel helmet",
    "steel legplates",
    "gold breastplate",
    "gold helmet",
    "gold legplates",
    "diamond breastplate",
    // Server spelling.
    "diamon helmet",
    "diamond legplates",
    "broadsword of dooooooom",
    "blessed axe",
    "kingslayer",
    "bloodcursed slicer",
];

/// Score for items absent from `EQUIPMENT_ORDER`: unseen gear is probably better.
pub const UNRANKED_EQUIPMENT_SCORE: i32 = 1000;
/// Score for a boss counter while its boss is adjacent.
pub const COUNTER_IN_USE_SCORE: i32 = 100;

pub const WEAPON_KEYWORDS: &[&str] =
    &["sword", "dagger", "axe", "spear", "kingslayer", "bloodcursed slicer", "it isn't"];

/// Potion volume keywords, largest first.
pub const POTION_VOLUMES: &[(&str, u32)] = &[("large", 3), ("bib", 3), ("medium", 2), ("small", 1)];

/// Bosses that should only be engaged while carrying their counter item.
pub const BOSS_COUNTERS: &[(&str, &str)] = &[(names::BOSS, names::BOSS_COUNTER)];

/// From `min_level` (1-based) onward, every group must have at least one owned item.
pub struct GearGate {
    pub min_level: i32,
    pub any_of: &'static [&'static str],
}

pub const GEAR_GATES: &[GearGate] = &[
    GearGate { min_level: 3, any_of: &["it isn't"] },
    GearGate { min_level: 2, any_of: &["broadsword of dooooooom", "dagger of vindication"] },
    GearGate { min_level: 3, any_of: &["blessed axe"] },
    GearGate { min_level: 5, any_of: &["kingslayer"] },
    GearGate { min_level: 3, any_of: &["skull helmet"] },
    GearGate { min_level: 3, any_of: &["skull breastplate"] },
    GearGate { min_level: 3, any_of: &["skull legplates"] },
    GearGate { min_level: 4, any_of: &["bronze helmet"] },
    GearGate { min_level: 4, any_of: &["bronze breastplate"] },
    GearGate { min_level: 4, any_of: &["bronze legplates"] },
    GearGate { min_level: 6, any_of: &["iron helmet"] },
    GearGate { min_level: 6, any_of: &["iron breastplate"] },
    GearGate { min_level: 6, any_of: &["iron legplates"] },
    GearGate { min_level: 9, any_of: &["steel helmet"] },
    GearGate { min_level: 9, any_of: &["steel breastplate"] },
    GearGate { min_level: 9, any_of: &["steel legplates"] },
];

pub fn narration(status: Status) -> &'static [&'static str] {
    match status {
        Status::LookingForExit => &[
            "Hmmm... I wonder if there's a ladder somewhere here",
            "Where could the ladder be??",
            "Surely the ladder must be in this room",
        ],
        Status::FleeingFromBoss => &[
            "Aaaah! It's a scary thing!",
            "What the hell is that!?",
            "Oh no! It's an IT, I saw a movie about one of those once!",
        ],
        Status::Fleeing => &[
            "Aaaah! It's a scary monster!",
            "Got to get more gear before fighting those things!",
            "Scary! Better get far away from here!",
        ],
        Status::LookingForMonsters => &[
            "I'm a monster hunter and I'm OK! I kill all night and I kill all day!",
            "Come out where I can see you!",
            "Where aaaare you?",
            "This is a dungeon, one would think there aught to be some monsters here",
        ],
        Status::MovingToExit => {
            &["I know where the next level is!", "Let's see, I think I remember the way now"]
        }
        Status::AttackingMonster => &[
            "Chaaaarge!",
            "Die! You evil monster!",
            "A dead monster is a good monster!",
            "Have at you!",
            "Prepare to die!",
            "I found a monster! Let's kill it!",
        ],
        Status::Idle => &["I don't know what to do!?"],
    }
}

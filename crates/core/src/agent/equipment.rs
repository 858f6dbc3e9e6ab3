//! Item classification and the equip/potion choices built on it.

use std::collections::BTreeMap;

use slotmap::SlotMap;

use crate::content::{COUNTER_IN_USE_SCORE, EQUIPMENT_ORDER, POTION_VOLUMES, UNRANKED_EQUIPMENT_SCORE, WEAPON_KEYWORDS};
use crate::state::TrackedItem;
use crate::types::ItemId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EquipmentTag {
    Unknown,
    Weapon,
    Potion,
    Breastplate,
    Helmet,
    Legplates,
}

impl EquipmentTag {
    /// Whether items with this tag occupy an equipment slot.
    pub fn is_wearable(self) -> bool {
        !matches!(self, EquipmentTag::Unknown | EquipmentTag::Potion)
    }
}

/// Classifies an item by keywords in its (case-insensitive) name.
pub fn classify(name: &str) -> EquipmentTag {
    let name = name.to_lowercase();
    if name.contains("potion") {
        EquipmentTag::Potion
    } else if WEAPON_KEYWORDS.iter().any(|keyword| name.contains(keyword)) {
        EquipmentTag::Weapon
    } else if name.contains("breastplate") {
        EquipmentTag::Breastplate
    } else if name.contains("helmet") {
        EquipmentTag::Helmet
    } else if name.contains("legplates") {
        EquipmentTag::Legplates
    } else {
        EquipmentTag::Unknown
    }
}

/// Potion size from its name; zero when no volume keyword matches.
pub fn potion_score(name: &str) -> u32 {
    let name = name.to_lowercase();
    POTION_VOLUMES.iter().find(|(keyword, _)| name.contains(keyword)).map_or(0, |&(_, volume)| volume)
}

/// Precedence of a wearable; higher is better.
pub(super) fn equipment_score(name: &str, counter_in_use: impl Fn(&str) -> bool) -> i32 {
    let name = name.to_lowercase();
    if counter_in_use(&name) {
        return COUNTER_IN_USE_SCORE;
    }
    EQUIPMENT_ORDER
        .iter()
        .position(|known| *known == name)
        .map_or(UNRANKED_EQUIPMENT_SCORE, |idx| idx as i32)
}

/// Best item of every wearable slot that is not yet equipped.
///
/// Ties keep the item tracked first.
pub(super) fn equip_upgrades(
    items: &SlotMap<ItemId, TrackedItem>,
    counter_in_use: impl Fn(&str) -> bool,
) -> Vec<ItemId> {
    let mut best: BTreeMap<EquipmentTag, (i32, ItemId)> = BTreeMap::new();
    for (id, item) in items {
        let tag = classify(&item.name);
        if !tag.is_wearable() {
            continue;
        }
        let score = equipment_score(&item.name, &counter_in_use);
        let entry = best.entry(tag).or_insert((score, id));
        if score > entry.0 {
            *entry = (score, id);
        }
    }
    best.into_values().map(|(_, id)| id).filter(|id| !items[*id].equipped).collect()
}

/// Largest held potion, first tracked on ties.
pub(super) fn best_potion(items: &SlotMap<ItemId, TrackedItem>) -> Option<ItemId> {
    let mut best: Option<(u32, ItemId)> = None;
    for (id, item) in items {
        if classify(&item.name) != EquipmentTag::Potion {
            continue;
        }
        let score = potion_score(&item.name);
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, id));
        }
    }
    best.map(|(_, id)| id)
}

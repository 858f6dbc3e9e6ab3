//! Threat assessment around the agent from recent sightings.
//! This module exists to give search and the cascade one view of nearby danger.
//! It does not own tracking; sightings come from the active map's unit table.

use slotmap::SlotMap;

use crate::content::BOSS_COUNTERS;
use crate::map::{Map, SeenEntity};
use crate::state::TrackedItem;
use crate::types::{Direction, EntityId, ItemId, Pos};

/// Cost of a target the agent must not engage.
pub(super) const INF_COST: f32 = 10000.0;

/// Borrowed snapshot of everything threat checks need for one decision.
pub(super) struct Surroundings<'a> {
    pub(super) map: &'a Map,
    pub(super) items: &'a SlotMap<ItemId, TrackedItem>,
    pub(super) origin: Pos,
    pub(super) tick: u64,
    pub(super) self_id: EntityId,
    pub(super) self_health: f32,
    pub(super) recent_ticks: u64,
    pub(super) danger_ticks: u64,
}

impl Surroundings<'_> {
    pub(super) fn has_item(&self, name: &str) -> bool {
        self.items.values().any(|item| item.is_named(name))
    }

    /// Another entity sighted at `pos` within the recent window.
    pub(super) fn entity_at(&self, pos: Pos) -> Option<&SeenEntity> {
        self.map
            .unit_at(pos)
            .filter(|seen| seen.entity != self.self_id && seen.seen_within(self.tick, self.recent_ticks))
    }

    /// First recent entity within `radius` (square) of the agent, optionally by name.
    pub(super) fn nearby(&self, name: Option<&str>, radius: i32) -> Option<&SeenEntity> {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let pos = self.origin.translate(Pos { y: dy, x: dx });
                if let Some(seen) = self.entity_at(pos)
                    && name.is_none_or(|name| seen.name == name)
                {
                    return Some(seen);
                }
            }
        }
        None
    }

    /// Whether a stronger entity seen at `pos` recently enough makes it impassable.
    pub(super) fn blocks_search(&self, pos: Pos) -> bool {
        self.map
            .unit_at(pos)
            .is_some_and(|seen| seen.seen_within(self.tick, self.danger_ticks) && seen.health > self.self_health)
    }

    /// Hostile health adjacent to `pos`, with an entity on `pos` itself weighted triple.
    pub(super) fn enemy_health_around(&self, pos: Pos) -> f32 {
        let around: f32 = Direction::ALL
            .into_iter()
            .filter_map(|dir| self.entity_at(pos.step(dir)))
            .map(|seen| seen.health)
            .sum();
        around + self.entity_at(pos).map_or(0.0, |seen| 3.0 * seen.health)
    }

    /// Whether a boss whose counter is `counter` stands next to the agent.
    pub(super) fn counter_in_use(&self, counter: &str) -> bool {
        BOSS_COUNTERS
            .iter()
            .any(|&(boss, c)| c.eq_ignore_ascii_case(counter) && self.nearby(Some(boss), 1).is_some())
    }

    /// A boss next to the agent whose counter the agent does not carry.
    pub(super) fn uncountered_boss_adjacent(&self) -> bool {
        BOSS_COUNTERS
            .iter()
            .any(|&(boss, counter)| self.nearby(Some(boss), 1).is_some() && !self.has_item(counter))
    }

    fn boss_cost(&self, seen: &SeenEntity) -> Option<f32> {
        BOSS_COUNTERS
            .iter()
            .find(|(boss, _)| seen.name == *boss)
            .map(|(_, counter)| if self.has_item(counter) { 0.0 } else { INF_COST })
    }

    /// Engagement cost of the entity at `pos`; zero for an empty cell.
    pub(super) fn target_cost(&self, pos: Pos) -> f32 {
        let Some(seen) = self.entity_at(pos) else {
            return 0.0;
        };
        if let Some(cost) = self.boss_cost(seen) {
            return cost;
        }
        if seen.health > 2.0 * self.self_health {
            return INF_COST;
        }
        seen.health
    }

    /// Like `target_cost` without refusing much stronger entities.
    pub(super) fn target_cost_desperate(&self, pos: Pos) -> f32 {
        let Some(seen) = self.entity_at(pos) else {
            return 0.0;
        };
        self.boss_cost(seen).unwrap_or(seen.health)
    }
}

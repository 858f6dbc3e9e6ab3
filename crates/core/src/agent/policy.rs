//! Ordered decision cascade producing one move per tick.
//! This module exists to rank goals (survive, fight, descend, explore) in a fixed order.
//! It does not own search mechanics or threat scoring.

use tracing::debug;

use super::equipment::{EquipmentTag, best_potion, classify, equip_upgrades};
use super::search::{UNBOUNDED, bfs, dijkstra};
use super::threat::{INF_COST, Surroundings};
use super::{Agent, Decision};
use crate::content::GEAR_GATES;
use crate::types::{Direction, Knowledge, LogEvent, Occupancy, Pos, Status};

/// Flee searches look this many steps ahead.
const FLEE_DEPTH: u32 = 4;
const COMBAT_DEPTH: u32 = 4;
/// Combat search depth while the exit is gated on missing gear.
const GEARING_COMBAT_DEPTH: u32 = 8;
const DESPERATE_DEPTH: u32 = 1;
/// Below this share of its best health the agent drinks or runs.
const LOW_HEALTH_FRACTION: f32 = 0.5;

/// Whether the agent's inventory meets every gear gate for a 1-based level.
pub(super) fn exit_allowed(level: i32, has_item: impl Fn(&str) -> bool) -> bool {
    GEAR_GATES.iter().all(|gate| level < gate.min_level || gate.any_of.iter().any(|name| has_item(name)))
}

impl Agent {
    pub(super) fn surroundings(&self) -> Option<Surroundings<'_>> {
        let self_id = self.state.self_id?;
        let player = self.state.entities.get(self_id)?;
        Some(Surroundings {
            map: self.state.active_map(),
            items: &self.state.items,
            origin: self.state.player_pos,
            tick: self.state.tick,
            self_id,
            self_health: player.health,
            recent_ticks: self.config.recent_sighting_ticks,
            danger_ticks: self.config.danger_memory_ticks,
        })
    }

    /// Runs the cascade for this tick and records the resulting status.
    ///
    /// Without a resolved self entity the agent keeps its status and stays put.
    pub fn decide_next_move(&mut self) -> Decision {
        let Some((status, target, item_uses)) = self.evaluate_cascade() else {
            return Decision { status: self.status, step: None, item_uses: Vec::new() };
        };
        let step = target.and_then(|t| Direction::between(self.state.player_pos, t));
        for name in &item_uses {
            let item = name.clone();
            self.state.log.push(match classify(name) {
                EquipmentTag::Potion => LogEvent::PotionRequested { item },
                _ => LogEvent::EquipRequested { item },
            });
        }
        self.set_status(status, step);
        debug!(status = status.label(), ?step, "decided");
        Decision { status, step, item_uses }
    }

    fn evaluate_cascade(&self) -> Option<(Status, Option<Pos>, Vec<String>)> {
        let s = self.surroundings()?;
        let player = self.state.self_entity()?;
        let mut item_uses: Vec<String> = equip_upgrades(s.items, |name| s.counter_in_use(name))
            .into_iter()
            .map(|id| s.items[id].name.clone())
            .collect();

        let flee = || dijkstra(&s, FLEE_DEPTH, |p| s.enemy_health_around(p), None);

        if s.uncountered_boss_adjacent()
            && let Some(step) = flee()
        {
            return Some((Status::FleeingFromBoss, Some(step), item_uses));
        }

        if player.health < player.max_seen_health * LOW_HEALTH_FRACTION && s.nearby(None, 1).is_some() {
            if let Some(potion) = best_potion(s.items) {
                item_uses.push(s.items[potion].name.clone());
            } else if let Some(step) = flee() {
                return Some((Status::Fleeing, Some(step), item_uses));
            }
        }

        let level = s.map.level() + 1;
        let may_descend = exit_allowed(level, |name| s.has_item(name));
        let combat_depth = if may_descend { COMBAT_DEPTH } else { GEARING_COMBAT_DEPTH };

        let engageable = |p: Pos| s.entity_at(p).is_some() && s.target_cost(p) < INF_COST;
        if let Some(step) = dijkstra(&s, combat_depth, |p| s.target_cost(p) + 1.0, Some(&engageable)) {
            return Some((Status::AttackingMonster, Some(step), item_uses));
        }

        let exit_step = bfs(&s, |p| s.map.get(p).exit.value, UNBOUNDED);
        if may_descend && let Some(step) = exit_step {
            return Some((Status::MovingToExit, Some(step), item_uses));
        }

        if exit_step.is_none() {
            let unvisited = |p: Pos| {
                let cell = s.map.get(p);
                !cell.visited.value && cell.occupancy.value != Occupancy::Occupied
            };
            let unconfirmed = |p: Pos| {
                let cell = s.map.get(p);
                cell.visited.knowledge != Knowledge::Known && cell.occupancy.value != Occupancy::Occupied
            };
            if let Some(step) = bfs(&s, unvisited, UNBOUNDED).or_else(|| bfs(&s, unconfirmed, UNBOUNDED)) {
                return Some((Status::LookingForExit, Some(step), item_uses));
            }
        }

        let frontier = |p: Pos| {
            let cell = s.map.get(p);
            cell.occupancy.knowledge != Knowledge::Known && cell.occupancy.value != Occupancy::Occupied
        };
        if let Some(step) = bfs(&s, frontier, UNBOUNDED) {
            return Some((Status::LookingForMonsters, Some(step), item_uses));
        }

        let desperate_cost = |p: Pos| s.target_cost_desperate(p) + 1.0;
        let any_beatable = |p: Pos| s.entity_at(p).is_some() && s.target_cost_desperate(p) < INF_COST;
        if let Some(step) = dijkstra(&s, DESPERATE_DEPTH, desperate_cost, Some(&any_beatable)) {
            return Some((Status::AttackingMonster, Some(step), item_uses));
        }

        Some((Status::Idle, None, item_uses))
    }
}

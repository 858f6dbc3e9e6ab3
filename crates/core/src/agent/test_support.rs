//! Shared test fixtures for the `agent` submodule test suites.
//! This module exists to avoid repeating map, entity, and observation setup.
//! It does not own production decision logic.

use super::*;
use crate::cell::HistoricalValue;
use crate::map::SeenEntity;
use crate::observation::{Observation, ObservedEntity};
use crate::types::{EntityKind, Occupancy, Pos};

pub(super) const PLAYER_HEALTH: f32 = 10.0;
/// Fixture clock; leaves room to backdate sightings.
pub(super) const FIXTURE_TICK: u64 = 100;

/// Agent standing on `@` in a map painted from `rows`.
///
/// `#` is a known wall, `.` and `@` known visited floor, `>` a known exit,
/// and anything else is left unknown.
pub(super) fn room_agent(rows: &[&str]) -> Agent {
    let mut agent = Agent::with_pool(AgentConfig::default(), Vec::new());
    agent.state.tick = FIXTURE_TICK;
    let mut player = None;
    let map = agent.state.active_map_mut();
    for (y, row) in rows.iter().enumerate() {
        for (x, glyph) in row.chars().enumerate() {
            let pos = Pos::new(x as i32, y as i32);
            match glyph {
                '#' => map.update(pos, |c| c.occupancy = HistoricalValue::known(Occupancy::Occupied)),
                '.' | '@' | '>' => map.update(pos, |c| {
                    c.occupancy = HistoricalValue::known(Occupancy::Free);
                    c.visited = HistoricalValue::known(glyph != '>');
                    c.exit = HistoricalValue::known(glyph == '>');
                }),
                _ => {}
            }
            if glyph == '@' {
                player = Some(pos);
            }
        }
    }
    let player = player.expect("fixture needs an @");
    agent.state.player_pos = player;
    let name = agent.config.agent_name.clone();
    let id = track(&mut agent, &name, EntityKind::Player, player, PLAYER_HEALTH);
    agent.state.self_id = Some(id);
    agent
}

fn track(agent: &mut Agent, name: &str, kind: EntityKind, pos: Pos, health: f32) -> EntityId {
    let tick = agent.state.tick;
    let id = agent.state.entities.insert(TrackedEntity {
        name: name.to_string(),
        kind,
        pos,
        health,
        max_seen_health: health,
        last_seen_tick: tick,
    });
    agent
        .state
        .active_map_mut()
        .record_unit(pos, SeenEntity { entity: id, name: name.to_string(), kind, health, tick });
    id
}

/// A monster sighted this tick.
pub(super) fn add_entity(agent: &mut Agent, name: &str, pos: Pos, health: f32) -> EntityId {
    track(agent, name, EntityKind::Monster, pos, health)
}

pub(super) fn backdate_sighting(agent: &mut Agent, id: EntityId, ticks: u64) {
    let map = agent.state.active_map_mut();
    let (pos, mut seen) =
        map.units().find(|(_, seen)| seen.entity == id).map(|(pos, seen)| (pos, seen.clone())).expect("sighting");
    seen.tick -= ticks;
    map.record_unit(pos, seen);
}

pub(super) fn give_item(agent: &mut Agent, name: &str, equipped: bool) -> ItemId {
    agent.state.items.insert(TrackedItem { name: name.to_string(), equipped })
}

pub(super) fn set_self_health(agent: &mut Agent, health: f32) {
    let id = agent.state.self_id.expect("fixture self");
    agent.state.entities[id].health = health;
    let pos = agent.state.player_pos;
    let map = agent.state.active_map_mut();
    if let Some(mut seen) = map.unit_at(pos).cloned() {
        seen.health = health;
        map.record_unit(pos, seen);
    }
}

/// Observation of `rows` (a square of side `2r+1`) with the agent at the center.
pub(super) fn observation(rows: &[&str]) -> Observation {
    Observation {
        radius: (rows.len() as i32 - 1) / 2,
        grid: rows.iter().flat_map(|row| row.chars().map(Occupancy::from_glyph)).collect(),
        item_names: Vec::new(),
        equipped: Vec::new(),
        entities: vec![seen_entity("voxelbot", EntityKind::Player, Pos::ORIGIN, PLAYER_HEALTH)],
        events: Vec::new(),
        error: None,
        issued_move: None,
    }
}

pub(super) fn seen_entity(name: &str, kind: EntityKind, offset: Pos, health: f32) -> ObservedEntity {
    ObservedEntity { name: name.to_string(), kind, offset, health }
}

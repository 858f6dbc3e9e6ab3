//! Stable snapshot hashing for deterministic verification.
//! This module exists so replays can compare agent state without comparing logs.
//! It does not own persistence or the map byte format.

use std::hash::Hasher;

use xxhash_rust::xxh3::Xxh3;

use super::Agent;

impl Agent {
    pub fn snapshot_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        let state = &self.state;
        hasher.write_u64(state.tick);
        hasher.write_i32(state.player_pos.x);
        hasher.write_i32(state.player_pos.y);
        hasher.write_usize(state.current_map);
        hasher.write_usize(state.maps.len());

        let map = state.active_map();
        hasher.write_i32(map.level());
        let bounds = map.bounds();
        for edge in [bounds.xmin, bounds.ymin, bounds.xmax, bounds.ymax] {
            hasher.write_i32(edge);
        }
        hasher.write_u32(map.exploration_score());
        hasher.write_u8(self.status as u8);
        hasher.write_usize(state.entities.len());
        hasher.write_usize(state.items.len());
        hasher.write_usize(state.items.values().filter(|item| item.equipped).count());
        hasher.finish()
    }
}
